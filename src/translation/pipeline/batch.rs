//! 翻译批次划分
//!
//! 将去重后的句子按数量与字符数上限切分为批次。批次保持输入顺序，
//! 单个超过字符上限的句子独占一个批次。

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::translation::config::{constants, TranslationConfig};

/// 一个翻译批次
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// 批次序号，从 0 开始
    pub id: usize,
    pub items: Vec<String>,
    pub total_chars: usize,
}

impl Batch {
    fn new(id: usize) -> Self {
        Self { id, items: Vec::new(), total_chars: 0 }
    }

    fn push(&mut self, text: String) {
        self.total_chars += text.chars().count();
        self.items.push(text);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn summary(&self) -> String {
        format!("批次 #{}: {} 项, {} 字符", self.id, self.items.len(), self.total_chars)
    }
}

/// 批次上限
#[derive(Debug, Clone)]
pub struct BatchManagerConfig {
    pub max_items: usize,
    pub max_chars: usize,
}

impl Default for BatchManagerConfig {
    fn default() -> Self {
        Self {
            max_items: constants::DEFAULT_BATCH_SIZE,
            max_chars: constants::DEFAULT_MAX_BATCH_CHARS,
        }
    }
}

impl From<&TranslationConfig> for BatchManagerConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            max_items: config.batch_size.max(1),
            max_chars: config.max_batch_chars.max(1),
        }
    }
}

/// 批次统计（线程安全）
#[derive(Debug, Default)]
pub struct BatchStats {
    input_items: AtomicUsize,
    output_batches: AtomicUsize,
    oversized_items: AtomicUsize,
}

impl BatchStats {
    pub fn input_items(&self) -> usize {
        self.input_items.load(Ordering::Relaxed)
    }

    pub fn output_batches(&self) -> usize {
        self.output_batches.load(Ordering::Relaxed)
    }

    pub fn oversized_items(&self) -> usize {
        self.oversized_items.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.input_items.store(0, Ordering::Relaxed);
        self.output_batches.store(0, Ordering::Relaxed);
        self.oversized_items.store(0, Ordering::Relaxed);
    }
}

/// 批次管理器
#[derive(Debug, Default)]
pub struct BatchManager {
    config: BatchManagerConfig,
    stats: BatchStats,
}

impl BatchManager {
    pub fn new(config: BatchManagerConfig) -> Self {
        Self { config, stats: BatchStats::default() }
    }

    pub fn config(&self) -> &BatchManagerConfig {
        &self.config
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// 按顺序装箱：当前批次满（数量或字符数）时开启新批次
    pub fn create_batches<I>(&self, items: I) -> Vec<Batch>
    where
        I: IntoIterator<Item = String>,
    {
        let mut batches = Vec::new();
        let mut current = Batch::new(0);

        for text in items {
            self.stats.input_items.fetch_add(1, Ordering::Relaxed);
            let chars = text.chars().count();
            if chars > self.config.max_chars {
                self.stats.oversized_items.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("句子长度 {} 超过批次字符上限 {}", chars, self.config.max_chars);
            }

            let full = current.len() >= self.config.max_items
                || (!current.is_empty() && current.total_chars + chars > self.config.max_chars);
            if full {
                let next_id = current.id + 1;
                batches.push(std::mem::replace(&mut current, Batch::new(next_id)));
            }
            current.push(text);
        }

        if !current.is_empty() {
            batches.push(current);
        }

        self.stats.output_batches.fetch_add(batches.len(), Ordering::Relaxed);
        for batch in &batches {
            tracing::debug!("{}", batch.summary());
        }
        batches
    }
}
