//! 翻译服务
//!
//! 协调翻译记忆、批次划分与翻译后端：
//!
//! - 先查记忆，命中的句子不再请求
//! - 同一文本在任意时刻只有一个进行中的请求，并发调用者等待同一结果
//! - 并发批次数受信号量限制，每次调用有超时与指数退避重试
//! - 失败、超时或源语言不符时返回原文，并注明原因
//!
//! 只有真正翻译成功的结果会写入记忆。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use indexmap::IndexMap;
use tokio::sync::{watch, Semaphore};
use tokio::time::{sleep, timeout};

use super::translator::{TranslatedText, Translator};
use crate::translation::config::TranslationConfig;
use crate::translation::error::{helpers, ErrorStats, TranslationError, TranslationResult};
use crate::translation::pipeline::batch::{Batch, BatchManager, BatchManagerConfig};
use crate::translation::storage::TranslationMemory;

/// 保留原文的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnchangedReason {
    /// 检测到的源语言不在允许范围内
    SourceLanguageMismatch { detected: String },
    /// 调用超时
    Timeout,
    /// 后端返回错误
    ServiceError(String),
    /// 后端返回空译文
    EmptyResult,
}

/// 单个文本的翻译结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Translated(String),
    Unchanged { original: String, reason: UnchangedReason },
}

impl TranslationOutcome {
    /// 最终使用的文本
    pub fn text(&self) -> &str {
        match self {
            TranslationOutcome::Translated(text) => text,
            TranslationOutcome::Unchanged { original, .. } => original,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, TranslationOutcome::Translated(_))
    }
}

/// 服务配置
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub target_lang: String,
    pub allowed_source_languages: Vec<String>,
    pub validate_source_language: bool,
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub retry_enabled: bool,
    pub max_retry_attempts: usize,
    pub retry_base_delay: Duration,
    pub batch: BatchManagerConfig,
}

impl From<&TranslationConfig> for ServiceConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            target_lang: config.target_lang.clone(),
            allowed_source_languages: config.allowed_source_languages(),
            validate_source_language: config.validate_source_language,
            request_timeout: config.request_timeout(),
            max_concurrent_requests: config.max_concurrent_requests.max(1),
            retry_enabled: config.retry_enabled,
            max_retry_attempts: config.max_retry_attempts,
            retry_base_delay: config.retry_base_delay(),
            batch: BatchManagerConfig::from(config),
        }
    }
}

/// 服务统计（线程安全）
#[derive(Debug, Default)]
pub struct ServiceStats {
    pub texts_requested: AtomicUsize,
    pub memory_hits: AtomicUsize,
    pub shared_in_flight: AtomicUsize,
    pub translator_calls: AtomicUsize,
    pub translated: AtomicUsize,
    pub unchanged: AtomicUsize,
    pub errors_encountered: AtomicUsize,
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatsSnapshot {
    pub texts_requested: usize,
    pub memory_hits: usize,
    pub shared_in_flight: usize,
    pub translator_calls: usize,
    pub translated: usize,
    pub unchanged: usize,
    pub errors_encountered: usize,
}

impl ServiceStats {
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            texts_requested: self.texts_requested.load(Ordering::Relaxed),
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            shared_in_flight: self.shared_in_flight.load(Ordering::Relaxed),
            translator_calls: self.translator_calls.load(Ordering::Relaxed),
            translated: self.translated.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            errors_encountered: self.errors_encountered.load(Ordering::Relaxed),
        }
    }
}

type InFlight = DashMap<String, watch::Receiver<Option<TranslationOutcome>>>;

/// 退出作用域时移除本调用登记的进行中条目
struct InFlightGuard<'a> {
    map: &'a InFlight,
    keys: Vec<String>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        for key in &self.keys {
            self.map.remove(key);
        }
    }
}

/// 翻译服务
pub struct TranslationService {
    translator: Arc<dyn Translator>,
    memory: Arc<TranslationMemory>,
    config: ServiceConfig,
    semaphore: Semaphore,
    in_flight: InFlight,
    batch_manager: BatchManager,
    stats: ServiceStats,
    error_stats: Mutex<ErrorStats>,
}

impl TranslationService {
    pub fn new(
        translator: Arc<dyn Translator>,
        memory: Arc<TranslationMemory>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            semaphore: Semaphore::new(config.max_concurrent_requests.max(1)),
            batch_manager: BatchManager::new(config.batch.clone()),
            translator,
            memory,
            config,
            in_flight: DashMap::new(),
            stats: ServiceStats::default(),
            error_stats: Mutex::new(ErrorStats::default()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn memory(&self) -> &TranslationMemory {
        &self.memory
    }

    pub fn get_stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// 后端错误的分类统计
    pub fn error_stats(&self) -> ErrorStats {
        self.error_stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 写回翻译记忆
    pub fn flush_memory(&self) -> TranslationResult<usize> {
        self.memory.flush()
    }

    /// 翻译一组文本，返回每个不同文本的结果（按首次出现顺序）
    pub async fn translate_texts<I, S>(&self, texts: I) -> IndexMap<String, TranslationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut results: IndexMap<String, Option<TranslationOutcome>> = IndexMap::new();
        for text in texts {
            results.entry(text.into()).or_insert(None);
        }
        self.stats.texts_requested.fetch_add(results.len(), Ordering::Relaxed);

        let mut owned = Vec::new();
        let mut waiters = Vec::new();
        let mut guard = InFlightGuard { map: &self.in_flight, keys: Vec::new() };

        for (text, slot) in results.iter_mut() {
            if let Some(cached) = self.memory.get(text) {
                self.stats.memory_hits.fetch_add(1, Ordering::Relaxed);
                *slot = Some(TranslationOutcome::Translated(cached));
                continue;
            }

            match self.in_flight.entry(text.clone()) {
                Entry::Occupied(entry) => {
                    self.stats.shared_in_flight.fetch_add(1, Ordering::Relaxed);
                    waiters.push((text.clone(), entry.get().clone()));
                }
                Entry::Vacant(entry) => {
                    let (sender, receiver) = watch::channel(None);
                    entry.insert(receiver);
                    guard.keys.push(text.clone());
                    owned.push((text.clone(), sender));
                }
            }
        }

        if !owned.is_empty() {
            tracing::info!(
                "请求翻译 {} 个句子（记忆命中 {}，等待进行中 {}）",
                owned.len(),
                self.stats.memory_hits.load(Ordering::Relaxed),
                waiters.len()
            );
        }

        let batches = self
            .batch_manager
            .create_batches(owned.iter().map(|(text, _)| text.clone()));
        let batch_results = join_all(batches.iter().map(|batch| self.translate_batch(batch))).await;

        let mut senders: IndexMap<String, watch::Sender<Option<TranslationOutcome>>> =
            owned.into_iter().collect();
        for outcome_list in batch_results {
            for (text, outcome) in outcome_list {
                if let TranslationOutcome::Translated(translated) = &outcome {
                    self.memory.insert(text.clone(), translated.clone());
                }
                if let Some(sender) = senders.swap_remove(&text) {
                    let _ = sender.send(Some(outcome.clone()));
                }
                if let Some(slot) = results.get_mut(&text) {
                    *slot = Some(outcome);
                }
            }
        }
        drop(senders);
        drop(guard);

        for (text, mut receiver) in waiters {
            let outcome = match receiver.wait_for(Option::is_some).await {
                Ok(value) => value.clone(),
                Err(_) => None,
            };
            let outcome = outcome.unwrap_or_else(|| TranslationOutcome::Unchanged {
                original: text.clone(),
                reason: UnchangedReason::ServiceError("进行中的请求已取消".to_string()),
            });
            if let Some(slot) = results.get_mut(&text) {
                *slot = Some(outcome);
            }
        }

        let finished: IndexMap<String, TranslationOutcome> = results
            .into_iter()
            .map(|(text, outcome)| {
                let outcome = outcome.unwrap_or_else(|| TranslationOutcome::Unchanged {
                    original: text.clone(),
                    reason: UnchangedReason::EmptyResult,
                });
                (text, outcome)
            })
            .collect();

        let translated = finished.values().filter(|o| o.is_translated()).count();
        self.stats.translated.fetch_add(translated, Ordering::Relaxed);
        self.stats
            .unchanged
            .fetch_add(finished.len() - translated, Ordering::Relaxed);
        finished
    }

    /// 翻译一个批次；失败时整批保留原文
    async fn translate_batch(&self, batch: &Batch) -> Vec<(String, TranslationOutcome)> {
        match self.call_with_retry(batch).await {
            Ok(translations) => batch
                .items
                .iter()
                .cloned()
                .zip(translations)
                .map(|(text, translated)| {
                    let outcome = self.validate(&text, translated);
                    (text, outcome)
                })
                .collect(),
            Err(e) => {
                self.stats.errors_encountered.fetch_add(1, Ordering::Relaxed);
                helpers::log_error(&e);
                self.error_stats
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_error(&e);
                tracing::warn!("{} 保留原文", batch.summary());
                let reason = match e {
                    TranslationError::TimeoutError(_) => UnchangedReason::Timeout,
                    other => UnchangedReason::ServiceError(other.to_string()),
                };
                batch
                    .items
                    .iter()
                    .map(|text| {
                        let outcome = TranslationOutcome::Unchanged {
                            original: text.clone(),
                            reason: reason.clone(),
                        };
                        (text.clone(), outcome)
                    })
                    .collect()
            }
        }
    }

    fn validate(&self, original: &str, translated: TranslatedText) -> TranslationOutcome {
        if self.config.validate_source_language && !self.config.allowed_source_languages.is_empty() {
            if let Some(detected) = &translated.detected_source_language {
                let allowed = self
                    .config
                    .allowed_source_languages
                    .iter()
                    .any(|lang| lang.eq_ignore_ascii_case(detected));
                if !allowed {
                    tracing::debug!("源语言 {} 不在允许范围内，保留原文", detected);
                    return TranslationOutcome::Unchanged {
                        original: original.to_string(),
                        reason: UnchangedReason::SourceLanguageMismatch { detected: detected.clone() },
                    };
                }
            }
        }

        if translated.text.is_empty() {
            return TranslationOutcome::Unchanged {
                original: original.to_string(),
                reason: UnchangedReason::EmptyResult,
            };
        }

        TranslationOutcome::Translated(translated.text)
    }

    /// 带超时与指数退避的调用
    async fn call_with_retry(&self, batch: &Batch) -> TranslationResult<Vec<TranslatedText>> {
        let attempts = if self.config.retry_enabled {
            self.config.max_retry_attempts.max(1)
        } else {
            1
        };

        let mut last_error = None;
        for attempt in 0..attempts {
            let result = {
                let _permit = self.semaphore.acquire().await.map_err(|e| {
                    TranslationError::InternalError(format!("获取并发许可失败: {}", e))
                })?;
                self.stats.translator_calls.fetch_add(1, Ordering::Relaxed);

                let call = self.translator.translate_batch(&batch.items, &self.config.target_lang);
                match timeout(self.config.request_timeout, call).await {
                    Ok(result) => result,
                    Err(_) => Err(TranslationError::TimeoutError(format!(
                        "批次 #{} 超过 {:.1} 秒",
                        batch.id,
                        self.config.request_timeout.as_secs_f32()
                    ))),
                }
            };

            match result {
                Ok(translations) => {
                    if attempt > 0 {
                        tracing::info!("批次 #{} 在第 {} 次重试后成功", batch.id, attempt);
                    }
                    return Ok(translations);
                }
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.config.retry_base_delay * 2_u32.pow(attempt as u32);
                    tracing::warn!(
                        "批次 #{} 失败，{:.1} 秒后重试 ({}/{}): {}",
                        batch.id,
                        delay.as_secs_f32(),
                        attempt + 1,
                        attempts - 1,
                        e
                    );
                    last_error = Some(e);
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            TranslationError::InternalError(format!("批次 #{} 未执行", batch.id))
        }))
    }
}
