//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{constants, is_supported_profile};
use crate::translation::error::{TranslationError, TranslationResult};

/// 提取与翻译配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 语言配置
    pub primary_lang: String,
    pub secondary_lang: Option<String>,
    pub target_lang: String,
    pub validate_source_language: bool,

    // 提取配置
    pub document_encoding: String,
    pub parallel_segmentation: bool,
    pub output_dir: String,

    // 服务配置
    pub api_url: String,
    #[serde(skip_serializing)]
    pub auth_key: Option<String>,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,

    // 批次配置
    pub batch_size: usize,
    pub max_batch_chars: usize,

    // 重试配置
    pub retry_enabled: bool,
    pub max_retry_attempts: usize,
    pub retry_base_delay_ms: u64,

    // 翻译记忆
    pub memory_enabled: bool,
    pub memory_dir: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            primary_lang: constants::DEFAULT_PRIMARY_LANG.to_string(),
            secondary_lang: None,
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            validate_source_language: true,

            document_encoding: "utf-8".to_string(),
            parallel_segmentation: true,
            output_dir: ".".to_string(),

            api_url: constants::DEFAULT_API_URL.to_string(),
            auth_key: None,
            max_concurrent_requests: constants::DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),

            batch_size: constants::DEFAULT_BATCH_SIZE,
            max_batch_chars: constants::DEFAULT_MAX_BATCH_CHARS,

            retry_enabled: true,
            max_retry_attempts: constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_base_delay_ms: constants::DEFAULT_RETRY_BASE_DELAY_MS,

            memory_enabled: true,
            memory_dir: constants::DEFAULT_MEMORY_DIR.to_string(),
        }
    }
}

impl TranslationConfig {
    /// 创建带指定语言的默认配置
    pub fn with_languages(primary_lang: &str, target_lang: &str) -> Self {
        Self {
            primary_lang: primary_lang.to_string(),
            target_lang: target_lang.to_string(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if !is_supported_profile(&self.primary_lang) {
            return Err(TranslationError::UnsupportedLanguage(format!(
                "主语言 '{}' 没有对应的分句配置，可选: {}",
                self.primary_lang,
                constants::SUPPORTED_PROFILES.join(", ")
            )));
        }

        if let Some(secondary) = &self.secondary_lang {
            if !is_supported_profile(secondary) {
                return Err(TranslationError::UnsupportedLanguage(format!(
                    "次语言 '{}' 没有对应的分句配置",
                    secondary
                )));
            }
            if secondary == &self.primary_lang {
                return Err(TranslationError::ConfigError("主语言与次语言不能相同".to_string()));
            }
        }

        if self.batch_size == 0 {
            return Err(TranslationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.max_batch_chars == 0 {
            return Err(TranslationError::ConfigError("批次字符上限不能为0".to_string()));
        }

        if self.max_concurrent_requests == 0 {
            return Err(TranslationError::ConfigError("最大并发数不能为0".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(TranslationError::ConfigError("请求超时必须大于0".to_string()));
        }

        if self.memory_enabled && self.memory_dir.trim().is_empty() {
            return Err(TranslationError::ConfigError("启用翻译记忆时目录不能为空".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖（仅覆盖显式设置的变量）
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{extraction, memory, translation, EnvVar};

        fn apply<T>(value: Option<crate::env::EnvResult<T>>, mut setter: impl FnMut(T)) {
            match value {
                Some(Ok(value)) => setter(value),
                Some(Err(e)) => tracing::warn!("忽略无效的环境变量: {}", e),
                None => {}
            }
        }

        apply(extraction::PrimaryLang::get_if_set(), |v| self.primary_lang = v);
        apply(extraction::SecondaryLang::get_if_set(), |v| self.secondary_lang = Some(v));
        apply(extraction::ParallelSegmentation::get_if_set(), |v| {
            self.parallel_segmentation = v
        });
        apply(extraction::OutputDir::get_if_set(), |v| self.output_dir = v);

        apply(translation::TargetLang::get_if_set(), |v| self.target_lang = v);
        apply(translation::ApiUrl::get_if_set(), |v| {
            tracing::info!("环境变量覆盖 API URL: {}", v);
            self.api_url = v;
        });
        apply(translation::AuthKey::get_if_set(), |v| self.auth_key = Some(v));
        apply(translation::MaxConcurrentRequests::get_if_set(), |v| {
            self.max_concurrent_requests = v
        });
        apply(translation::BatchSize::get_if_set(), |v| self.batch_size = v);
        apply(translation::RequestTimeout::get_if_set(), |v| {
            self.request_timeout_secs = v.as_secs()
        });

        apply(memory::Enabled::get_if_set(), |v| self.memory_enabled = v);
        apply(memory::Dir::get_if_set(), |v| self.memory_dir = v);
    }

    /// 转换为Duration类型
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// 翻译记忆文件路径：`<memory_dir>/translation_memory_<target>.json`
    pub fn memory_file(&self) -> PathBuf {
        let dir = shellexpand::tilde(&self.memory_dir).into_owned();
        Path::new(&dir).join(crate::translation::storage::memory_file_name(&self.target_lang))
    }

    /// 允许的源语言集合（主语言与次语言）
    pub fn allowed_source_languages(&self) -> Vec<String> {
        std::iter::once(self.primary_lang.clone())
            .chain(self.secondary_lang.clone())
            .map(|lang| lang.to_lowercase())
            .collect()
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(path: &str) -> TranslationResult<Self> {
        Self::load_dotenv();
        let expanded = shellexpand::tilde(path);
        let mut config = Self::load_from_file(&expanded)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    /// 取出配置（供命令行覆盖后再次验证）
    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    /// 从文件加载配置
    fn load_config() -> TranslationResult<TranslationConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        // 查找配置文件
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = TranslationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 330);
    }

    #[test]
    fn test_unsupported_primary_language() {
        let config = TranslationConfig::with_languages("tlh", "fr");
        assert!(matches!(
            config.validate(),
            Err(TranslationError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_secondary_must_differ() {
        let mut config = TranslationConfig::default();
        config.secondary_lang = Some("en".to_string());
        assert!(matches!(config.validate(), Err(TranslationError::ConfigError(_))));
    }

    #[test]
    fn test_memory_file_path() {
        let mut config = TranslationConfig::with_languages("en", "DE");
        config.memory_dir = "/tmp/tm".to_string();
        assert_eq!(
            config.memory_file(),
            PathBuf::from("/tmp/tm/translation_memory_de.json")
        );
    }

    #[test]
    fn test_allowed_source_languages() {
        let mut config = TranslationConfig::default();
        config.secondary_lang = Some("es".to_string());
        assert_eq!(config.allowed_source_languages(), vec!["en", "es"]);
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "primary_lang = \"zh\"\nbatch_size = 50").unwrap();

        let config = ConfigManager::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.primary_lang, "zh");
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.target_lang, constants::DEFAULT_TARGET_LANG);
    }

    #[test]
    fn test_auth_key_not_serialized() {
        let mut config = TranslationConfig::default();
        config.auth_key = Some("secret-key-1234".to_string());
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("secret-key-1234"));
    }
}
