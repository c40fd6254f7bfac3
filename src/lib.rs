//! # Pagelingo Library
//!
//! 从 HTML 文档中提取可翻译文本，按 `BLOCK_n_Sk_Wm` 寻址，生成占位符文档，
//! 并在翻译后把译文重组回页面。
//!
//! ## 模块组织
//!
//! - `core` - 提取、翻译与重组的工作流
//! - `env` - 类型安全的环境变量
//! - `parsers` - HTML 与 JSON-LD 解析
//! - `translation` - 分类、分句寻址、去重、翻译服务与回填

pub mod core;
pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use crate::core::*;
pub use translation::{TranslationConfig, TranslationError, TranslationResult};
