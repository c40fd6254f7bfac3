//! 翻译后端
//!
//! [`Translator`] 是外部机器翻译服务的接口；内置 [`DeeplTranslator`] 调用 DeepL v2 JSON API。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};

/// 单条译文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedText {
    pub text: String,
    /// 服务检测到的源语言（小写）
    pub detected_source_language: Option<String>,
}

/// 机器翻译服务
#[async_trait]
pub trait Translator: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &str;

    /// 按输入顺序返回译文，数量必须与输入一致
    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<TranslatedText>>;
}

#[derive(Debug, Serialize)]
struct DeeplRequest<'a> {
    text: &'a [String],
    target_lang: String,
    preserve_formatting: bool,
}

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    #[serde(default)]
    detected_source_language: Option<String>,
    text: String,
}

/// DeepL 客户端
#[derive(Debug, Clone)]
pub struct DeeplTranslator {
    client: reqwest::Client,
    api_url: String,
    auth_key: String,
}

impl DeeplTranslator {
    pub fn new(api_url: &str, auth_key: &str, timeout: Duration) -> TranslationResult<Self> {
        if auth_key.trim().is_empty() {
            return Err(TranslationError::ConfigError("缺少 DeepL 认证密钥".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self { client, api_url: api_url.to_string(), auth_key: auth_key.to_string() })
    }

    /// 从配置创建；缺少密钥是配置错误
    pub fn from_config(config: &TranslationConfig) -> TranslationResult<Self> {
        let auth_key = config.auth_key.as_deref().ok_or_else(|| {
            TranslationError::ConfigError("未设置 DEEPL_AUTH_KEY".to_string())
        })?;
        Self::new(&config.api_url, auth_key, config.request_timeout())
    }
}

#[async_trait]
impl Translator for DeeplTranslator {
    fn name(&self) -> &str {
        "deepl"
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<TranslatedText>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = DeeplRequest {
            text: texts,
            target_lang: target_lang.to_uppercase(),
            preserve_formatting: true,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.auth_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let payload: DeeplResponse = response.json().await?;
        if payload.translations.len() != texts.len() {
            return Err(TranslationError::TranslationServiceError(format!(
                "译文数量不匹配: 请求 {}，返回 {}",
                texts.len(),
                payload.translations.len()
            )));
        }

        Ok(payload
            .translations
            .into_iter()
            .map(|t| TranslatedText {
                text: t.text,
                detected_source_language: t.detected_source_language.map(|l| l.to_lowercase()),
            })
            .collect())
    }
}

fn status_error(status: StatusCode, body: &str) -> TranslationError {
    match status.as_u16() {
        429 => TranslationError::RateLimitExceeded,
        456 => TranslationError::QuotaExceeded,
        401 | 403 => TranslationError::ConfigError(format!("DeepL 认证失败 ({})", status)),
        400 | 413 | 414 => TranslationError::InvalidInput(format!("DeepL 拒绝请求 ({}): {}", status, body)),
        code if code >= 500 => TranslationError::NetworkError(format!("DeepL 服务不可用 ({})", status)),
        _ => TranslationError::TranslationServiceError(format!("DeepL 返回 {}: {}", status, body)),
    }
}
