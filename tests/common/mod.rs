// 集成测试公共模块
//
// 提供测试页面、模拟翻译后端和临时工作目录

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use pagelingo::translation::config::TranslationConfig;
use pagelingo::translation::core::{TranslatedText, Translator};
use pagelingo::translation::error::{TranslationError, TranslationResult};

/// 测试用 HTML 页面
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 含重复句、代码片段与 SEO meta 的英文页面
    pub fn create_simple_english_page() -> String {
        r#"<!DOCTYPE html><html><head><title>Rust news</title><meta name="description" content="Weekly updates."><meta name="viewport" content="width=device-width, initial-scale=1"></head><body><h1>Welcome.</h1><p>Click here.</p><p>Hello there. How are you?</p><img src="cat.png" alt="A cat"><p>console.log(x)</p><p>Click here.</p></body></html>"#
            .to_string()
    }

    /// 带 JSON-LD 的页面
    pub fn create_jsonld_page() -> String {
        r#"<html><head><script type="application/ld+json">{"@context": "https://schema.org", "@type": "Article", "headline": "Welcome.", "datePublished": "2024-01-01"}</script></head><body><p>Welcome.</p></body></html>"#
            .to_string()
    }
}

/// 临时工作目录与测试配置
pub struct TestEnvironment {
    pub dir: tempfile::TempDir,
    pub config: TranslationConfig,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = TranslationConfig {
            auth_key: Some("test-key".to_string()),
            memory_dir: dir.path().join("memory").to_string_lossy().into_owned(),
            request_timeout_secs: 5,
            retry_base_delay_ms: 1,
            parallel_segmentation: false,
            ..TranslationConfig::default()
        };
        Self { dir, config }
    }

    pub fn with_api_url(mut self, url: String) -> Self {
        self.config.api_url = url;
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 把页面写入临时目录并返回路径
    pub fn write_page(&self, name: &str, html: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, html).expect("write page");
        path
    }
}

/// 给每个文本加前缀的模拟后端，记录调用次数
pub struct MockTranslator {
    prefix: String,
    detected: Option<String>,
    fail: bool,
    pub calls: AtomicUsize,
    pub texts_seen: AtomicUsize,
}

impl MockTranslator {
    pub fn prefixing(prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            prefix: prefix.to_string(),
            detected: Some("en".to_string()),
            fail: false,
            calls: AtomicUsize::new(0),
            texts_seen: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            prefix: String::new(),
            detected: None,
            fail: true,
            calls: AtomicUsize::new(0),
            texts_seen: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        _target_lang: &str,
    ) -> TranslationResult<Vec<TranslatedText>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
        if self.fail {
            return Err(TranslationError::NetworkError("connection refused".to_string()));
        }
        Ok(texts
            .iter()
            .map(|text| TranslatedText {
                text: format!("{}{}", self.prefix, text),
                detected_source_language: self.detected.clone(),
            })
            .collect())
    }
}
