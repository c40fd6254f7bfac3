//! 可翻译文本的提取、寻址与回填
//!
//! - **pipeline**: 分类、语言路由、分句寻址、文档改写、去重与回填
//! - **core**: 翻译后端与翻译服务
//! - **storage**: 持久化翻译记忆
//! - **config**: 配置管理
//! - **error**: 错误处理
//! - **record**: 寻址记录及其视图
//! - **reassemble**: 由占位符文档重组译文文档

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod reassemble;
pub mod record;
pub mod storage;

pub use config::{ConfigManager, TranslationConfig};
pub use self::core::{DeeplTranslator, TranslationOutcome, TranslationService, Translator, UnchangedReason};
pub use error::{TranslationError, TranslationResult};
pub use pipeline::{
    dedupe, extract_document, CollectorConfig, DedupResult, Extraction, IdTranslationMap,
    TextCollector,
};
pub use reassemble::{block_texts, reassemble, ReassemblyStats};
pub use record::{AddressedRecord, FlatSummary, Origin};
pub use storage::TranslationMemory;
