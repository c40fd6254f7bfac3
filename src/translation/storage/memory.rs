//! 持久化翻译记忆
//!
//! 每个目标语言一个 JSON 文件，键为原句全文，值为译文。启动时加载一次，
//! 结束时与磁盘上的最新内容合并后原子写回（同键以本次运行为准）。

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;
use tempfile::NamedTempFile;

use crate::translation::error::{TranslationError, TranslationResult};

/// 记忆文件名
pub fn memory_file_name(target_lang: &str) -> String {
    format!("translation_memory_{}.json", target_lang.to_lowercase())
}

/// 命中统计
#[derive(Debug, Default)]
pub struct MemoryStats {
    hits: AtomicUsize,
    misses: AtomicUsize,
    inserts: AtomicUsize,
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStatsSnapshot {
    pub hits: usize,
    pub misses: usize,
    pub inserts: usize,
}

impl MemoryStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl MemoryStats {
    pub fn snapshot(&self) -> MemoryStatsSnapshot {
        MemoryStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
        }
    }
}

/// 单个目标语言的翻译记忆
#[derive(Debug)]
pub struct TranslationMemory {
    path: Option<PathBuf>,
    entries: RwLock<IndexMap<String, String>>,
    stats: MemoryStats,
}

impl TranslationMemory {
    /// 不落盘的记忆
    pub fn in_memory() -> Self {
        Self { path: None, entries: RwLock::new(IndexMap::new()), stats: MemoryStats::default() }
    }

    /// 打开 `<dir>/translation_memory_<target>.json`
    pub fn open(dir: impl AsRef<Path>, target_lang: &str) -> TranslationResult<Self> {
        Self::load(dir.as_ref().join(memory_file_name(target_lang)))
    }

    /// 从文件加载；文件不存在时为空，内容损坏时告警并从空开始
    pub fn load(path: impl Into<PathBuf>) -> TranslationResult<Self> {
        let path = path.into();
        let entries = read_entries(&path)?;
        if !entries.is_empty() {
            tracing::info!("加载翻译记忆 {} 条: {}", entries.len(), path.display());
        }
        Ok(Self { path: Some(path), entries: RwLock::new(entries), stats: MemoryStats::default() })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, source: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(source) {
            Some(translated) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(translated.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, source: impl Into<String>, translated: impl Into<String>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(source.into(), translated.into());
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> MemoryStatsSnapshot {
        self.stats.snapshot()
    }

    /// 与磁盘内容合并后原子写回，返回写入的条目数
    pub fn flush(&self) -> TranslationResult<usize> {
        let Some(path) = &self.path else {
            return Ok(0);
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut merged = read_entries(path)?;
        let external = merged.keys().filter(|k| !entries.contains_key(*k)).count();
        for (source, translated) in entries.iter() {
            merged.insert(source.clone(), translated.clone());
        }

        let mut file = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, &merged)?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|e| {
            TranslationError::IoError(format!("写入翻译记忆失败: {}", e.error))
                .with_context(path.display())
        })?;

        if external > 0 {
            tracing::debug!("合并了其他写入者的 {} 条记忆", external);
        }
        tracing::info!("翻译记忆已更新，共 {} 条: {}", merged.len(), path.display());

        let count = merged.len();
        *entries = merged;
        Ok(count)
    }
}

fn read_entries(path: &Path) -> TranslationResult<IndexMap<String, String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(IndexMap::new()),
        Err(e) => return Err(TranslationError::from(e).with_context(path.display())),
    };

    match serde_json::from_str(&raw) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            tracing::warn!("翻译记忆文件已损坏，忽略其内容 {}: {}", path.display(), e);
            Ok(IndexMap::new())
        }
    }
}
