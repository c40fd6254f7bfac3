//! 译文回填
//!
//! 把代表句的译文展开到共享该文本的全部句标识符，再写回寻址记录或扁平摘要。
//! 缺失或为空的译文保留原文；回填是纯函数，重复应用结果不变。

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::addressing::SentenceId;
use super::dedup::DedupResult;
use crate::translation::record::{join_sentences, AddressedRecord, FlatSummary};

/// 句标识符 → 译文
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdTranslationMap {
    pub entries: IndexMap<SentenceId, String>,
}

impl IdTranslationMap {
    pub fn get(&self, id: &SentenceId) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 以原句文本为键的译文展开
pub fn remap_by_text(translations: &IndexMap<String, String>, dedup: &DedupResult) -> IdTranslationMap {
    let mut entries = IndexMap::new();
    for (text, ids) in &dedup.sentence_to_ids {
        let Some(translated) = translations.get(text).filter(|t| !t.is_empty()) else {
            continue;
        };
        for id in ids {
            entries.insert(*id, translated.clone());
        }
    }
    IdTranslationMap { entries }
}

/// 以代表句标识符为键的译文展开
pub fn remap_by_representative(
    translations: &IndexMap<SentenceId, String>,
    dedup: &DedupResult,
) -> IdTranslationMap {
    let by_text: IndexMap<String, String> = dedup
        .canonical
        .iter()
        .filter_map(|(text, representative)| {
            translations
                .get(representative)
                .map(|translated| (text.clone(), translated.clone()))
        })
        .collect();
    remap_by_text(&by_text, dedup)
}

/// 回填扁平摘要：替换分句，并按分句规则重建块文本
pub fn apply_to_summary(summary: &FlatSummary, translations: &IdTranslationMap) -> FlatSummary {
    let mut translated = summary.clone();
    for block in translated.blocks.values_mut() {
        let mut touched = false;
        for (id, text) in block.segments.iter_mut() {
            if let Some(value) = translations.get(id) {
                *text = value.to_string();
                touched = true;
            }
        }
        if touched {
            block.text = join_sentences(block.segments.values().map(String::as_str));
        }
    }
    translated
}

/// 回填寻址记录：只替换句文本，词保持不变
pub fn apply_to_record(record: &AddressedRecord, translations: &IdTranslationMap) -> AddressedRecord {
    let mut translated = record.clone();
    for (block_id, block) in translated.blocks.iter_mut() {
        for (key, sentence) in block.tokens.iter_mut() {
            let Some(index) = key.strip_prefix('S').and_then(|d| d.parse().ok()) else {
                continue;
            };
            if let Some(value) = translations.get(&block_id.sentence(index)) {
                sentence.text = value.to_string();
            }
        }
    }
    translated
}

/// 仅包含分句译文的导出：句标识符 → 文本
pub fn segment_export(summary: &FlatSummary) -> IndexMap<SentenceId, String> {
    summary
        .segments()
        .map(|(_, id, text)| (id, text.to_string()))
        .collect()
}
