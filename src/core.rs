use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use encoding_rs::Encoding;
use indexmap::IndexMap;
use serde::Serialize;

use crate::env::{core::NoColor, EnvVar};
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::core::{
    DeeplTranslator, ServiceConfig, ServiceStatsSnapshot, TranslationService, Translator,
};
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::pipeline::{
    apply_to_summary, dedupe, extract_document, remap_by_text, segment_export, CollectorConfig,
    Extraction,
};
use crate::translation::reassemble::{block_texts, reassemble, ReassemblyStats};
use crate::translation::record::FlatSummary;
use crate::translation::storage::TranslationMemory;

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// 提取步骤的产物路径
#[derive(Debug, Clone)]
pub struct ExtractionArtifacts {
    pub structured: PathBuf,
    pub flat: PathBuf,
    pub flat_sentences: PathBuf,
    pub placeholder: PathBuf,
}

impl ExtractionArtifacts {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            structured: dir.join(constants::STRUCTURED_ARTIFACT),
            flat: dir.join(constants::FLAT_ARTIFACT),
            flat_sentences: dir.join(constants::FLAT_SENTENCES_ARTIFACT),
            placeholder: dir.join(constants::PLACEHOLDER_ARTIFACT),
        }
    }
}

/// 翻译步骤的选项
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// 扁平摘要（`translatable_flat.json`）
    pub input: PathBuf,
    /// 译后摘要
    pub output: PathBuf,
    /// 仅分句的译文导出
    pub segments: Option<PathBuf>,
}

/// 翻译步骤的结果
#[derive(Debug, Clone)]
pub struct TranslateReport {
    pub summary: FlatSummary,
    pub total_segments: usize,
    pub unique_segments: usize,
    pub translated: usize,
    pub unchanged: usize,
    pub memory_entries: usize,
    pub service: ServiceStatsSnapshot,
}

/// 完整流程的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub extraction: ExtractionArtifacts,
    pub translation: TranslateReport,
    pub reassembly: ReassemblyStats,
    pub output: PathBuf,
}

/// 检查编码标签是否可识别
pub fn validate_encoding(label: &str) -> TranslationResult<()> {
    if Encoding::for_label_no_replacement(label.as_bytes()).is_none() {
        return Err(helpers::config_error(format!("unknown encoding \"{}\"", label)));
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> TranslationResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)
        .map_err(|e| TranslationError::IoError(format!("写入 {} 失败: {}", path.display(), e)))
}

fn read_input(path: &Path) -> TranslationResult<Vec<u8>> {
    fs::read(path)
        .map_err(|e| TranslationError::IoError(format!("读取 {} 失败: {}", path.display(), e)))
}

fn ensure_dir(dir: &Path) -> TranslationResult<()> {
    fs::create_dir_all(dir)
        .map_err(|e| TranslationError::IoError(format!("创建目录 {} 失败: {}", dir.display(), e)))
}

/// 提取 HTML 文件并把四个产物写入输出目录
pub fn extract_to_dir(
    input: &Path,
    out_dir: &Path,
    config: &TranslationConfig,
) -> TranslationResult<(Extraction, ExtractionArtifacts)> {
    validate_encoding(&config.document_encoding)?;
    let html = read_input(input)?;

    tracing::info!("开始提取: {}", input.display());
    let extraction = extract_document(&html, CollectorConfig::from(config))?;

    ensure_dir(out_dir)?;
    let artifacts = ExtractionArtifacts::in_dir(out_dir);
    write_json(&artifacts.structured, &extraction.record)?;
    write_json(&artifacts.flat, &extraction.record.flat_summary())?;
    write_json(&artifacts.flat_sentences, &extraction.record.flat_sentences())?;
    fs::write(&artifacts.placeholder, &extraction.placeholder_html).map_err(|e| {
        TranslationError::IoError(format!("写入 {} 失败: {}", artifacts.placeholder.display(), e))
    })?;

    tracing::info!(
        "提取完成: {} 个块，{} 个句子，产物位于 {}",
        extraction.stats.blocks,
        extraction.stats.sentences,
        out_dir.display()
    );
    Ok((extraction, artifacts))
}

/// 按配置打开翻译记忆；未启用时使用仅内存的记忆
pub fn open_memory(config: &TranslationConfig) -> TranslationResult<TranslationMemory> {
    if config.memory_enabled {
        TranslationMemory::load(config.memory_file())
    } else {
        Ok(TranslationMemory::in_memory())
    }
}

/// 用给定后端创建翻译服务
pub fn build_service_with(
    translator: Arc<dyn Translator>,
    config: &TranslationConfig,
) -> TranslationResult<TranslationService> {
    let memory = open_memory(config)?;
    Ok(TranslationService::new(translator, Arc::new(memory), ServiceConfig::from(config)))
}

/// 用 DeepL 后端创建翻译服务；缺少密钥是配置错误
pub fn build_service(config: &TranslationConfig) -> TranslationResult<TranslationService> {
    let translator = DeeplTranslator::from_config(config)?;
    build_service_with(Arc::new(translator), config)
}

/// 去重、翻译（先查记忆）、回填并写出译后摘要
///
/// `deduplicated.json` 与 `id_remap.json` 写在输出文件所在目录。
pub async fn translate_summary(
    options: &TranslateOptions,
    service: &TranslationService,
) -> TranslationResult<TranslateReport> {
    let content = fs::read_to_string(&options.input).map_err(|e| {
        TranslationError::IoError(format!("读取 {} 失败: {}", options.input.display(), e))
    })?;
    let summary: FlatSummary = serde_json::from_str(&content).map_err(|e| {
        helpers::parse_error(format!("{} 不是有效的扁平摘要: {}", options.input.display(), e))
    })?;

    let dedup = dedupe(&summary);
    tracing::info!(
        "去重: {} 个分句，{} 个不同文本",
        dedup.total_count(),
        dedup.unique_count()
    );

    let artifact_dir = options
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    ensure_dir(&artifact_dir)?;
    write_json(&artifact_dir.join(constants::DEDUP_ARTIFACT), &dedup.canonical_requests())?;
    write_json(&artifact_dir.join(constants::ID_REMAP_ARTIFACT), &dedup.sentence_to_ids)?;

    let outcomes = service.translate_texts(dedup.canonical.keys().cloned()).await;

    let mut translations: IndexMap<String, String> = IndexMap::new();
    let mut unchanged = 0;
    for (source, outcome) in outcomes {
        if outcome.is_translated() {
            translations.insert(source, outcome.text().to_string());
        } else {
            unchanged += 1;
        }
    }

    let id_map = remap_by_text(&translations, &dedup);
    let translated_summary = apply_to_summary(&summary, &id_map);

    write_json(&options.output, &translated_summary)?;
    if let Some(segments) = &options.segments {
        write_json(segments, &segment_export(&translated_summary))?;
        tracing::info!("分句译文已导出: {}", segments.display());
    }

    let memory_entries = match service.flush_memory() {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("写回翻译记忆失败: {}", e);
            service.memory().len()
        }
    };

    tracing::info!(
        "翻译完成: {} 个已翻译，{} 个保持原文",
        translations.len(),
        unchanged
    );

    Ok(TranslateReport {
        total_segments: dedup.total_count(),
        unique_segments: dedup.unique_count(),
        translated: translations.len(),
        unchanged,
        memory_entries,
        service: service.get_stats().snapshot(),
        summary: translated_summary,
    })
}

/// 提取、翻译并重组为 `translated.html`
pub async fn run_pipeline(
    input: &Path,
    out_dir: &Path,
    config: &TranslationConfig,
    service: &TranslationService,
) -> TranslationResult<RunReport> {
    let (extraction, artifacts) = extract_to_dir(input, out_dir, config)?;

    let options = TranslateOptions {
        input: artifacts.flat.clone(),
        output: out_dir.join(constants::TRANSLATED_FLAT_ARTIFACT),
        segments: None,
    };
    let translation = translate_summary(&options, service).await?;

    let blocks = block_texts(&translation.summary);
    let (html, reassembly) =
        reassemble(&extraction.placeholder_html, &config.document_encoding, &blocks)?;

    let output = out_dir.join(constants::TRANSLATED_HTML_ARTIFACT);
    fs::write(&output, html)
        .map_err(|e| TranslationError::IoError(format!("写入 {} 失败: {}", output.display(), e)))?;

    Ok(RunReport { extraction: artifacts, translation, reassembly, output })
}

/// Prints an error message to stderr
pub fn print_error_message(msg: &str) {
    if NoColor::get_or_default(false) {
        eprintln!("{msg}");
    } else {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    }
}

/// Prints an info message to stdout
pub fn print_info_message(msg: &str) {
    println!("{msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_encoding() {
        assert!(validate_encoding("utf-8").is_ok());
        assert!(validate_encoding("windows-1252").is_ok());
        assert!(matches!(
            validate_encoding("utf-42"),
            Err(TranslationError::ConfigError(_))
        ));
    }

    #[test]
    fn test_artifact_names() {
        let artifacts = ExtractionArtifacts::in_dir(Path::new("out"));
        assert_eq!(artifacts.flat, Path::new("out/translatable_flat.json"));
        assert_eq!(artifacts.placeholder, Path::new("out/non_translatable.html"));
    }

    #[test]
    fn test_extract_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        fs::write(&input, "<html><body><p>Hello world.</p></body></html>").unwrap();

        let out_dir = dir.path().join("out");
        let (extraction, artifacts) =
            extract_to_dir(&input, &out_dir, &TranslationConfig::default()).unwrap();

        assert_eq!(extraction.record.len(), 1);
        for path in [
            &artifacts.structured,
            &artifacts.flat,
            &artifacts.flat_sentences,
            &artifacts.placeholder,
        ] {
            assert!(path.exists(), "{} missing", path.display());
        }
        let placeholder = fs::read_to_string(&artifacts.placeholder).unwrap();
        assert!(placeholder.contains("<p>BLOCK_1_S1</p>"));
    }

    #[test]
    fn test_extract_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_to_dir(
            &dir.path().join("absent.html"),
            dir.path(),
            &TranslationConfig::default(),
        );
        assert!(matches!(result, Err(TranslationError::IoError(_))));
    }

    #[test]
    fn test_build_service_requires_key() {
        let config = TranslationConfig { memory_enabled: false, ..TranslationConfig::default() };
        assert!(matches!(build_service(&config), Err(TranslationError::ConfigError(_))));
    }
}
