//! 翻译核心模块
//!
//! - **后端** (`translator.rs`): 机器翻译服务接口与 DeepL 实现
//! - **服务** (`service.rs`): 记忆、单飞、并发与重试的协调
//!
//! ```text
//! TranslationService (service.rs)
//!     ├── TranslationMemory (storage/memory.rs)
//!     ├── BatchManager (pipeline/batch.rs)
//!     └── Translator (translator.rs)
//!             └── DeeplTranslator
//! ```

pub mod service;
pub mod translator;

pub use service::{
    ServiceConfig, ServiceStats, ServiceStatsSnapshot, TranslationOutcome, TranslationService,
    UnchangedReason,
};
pub use translator::{DeeplTranslator, TranslatedText, Translator};
