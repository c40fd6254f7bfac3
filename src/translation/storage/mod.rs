//! 存储模块
//!
//! 提供按目标语言划分的持久化翻译记忆。

pub mod memory;

pub use memory::{memory_file_name, MemoryStatsSnapshot, TranslationMemory};
