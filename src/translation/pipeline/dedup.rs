//! 句子去重
//!
//! 以精确字符串相等为准，每个不同的句子只保留首次出现的标识符作为代表，
//! 同时记录共享该文本的全部位置。翻译服务只接收代表句。

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::addressing::{BlockId, SentenceId};
use crate::translation::record::FlatSummary;

/// 去重结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupResult {
    /// 句子文本 → 首次出现的句标识符
    pub canonical: IndexMap<String, SentenceId>,
    /// 句子文本 → 共享该文本的全部句标识符（文档顺序）
    pub sentence_to_ids: IndexMap<String, Vec<SentenceId>>,
}

impl DedupResult {
    /// 不同句子的数量
    pub fn unique_count(&self) -> usize {
        self.canonical.len()
    }

    /// 全部句子位置的数量
    pub fn total_count(&self) -> usize {
        self.sentence_to_ids.values().map(Vec::len).sum()
    }

    /// 代表句标识符 → 文本，按首次出现顺序
    pub fn canonical_requests(&self) -> IndexMap<SentenceId, String> {
        self.canonical
            .iter()
            .map(|(text, id)| (*id, text.clone()))
            .collect()
    }

    /// 共享某段文本的 (块, 句) 位置
    pub fn locations<'a>(&'a self, text: &str) -> impl Iterator<Item = (BlockId, SentenceId)> + 'a {
        self.sentence_to_ids
            .get(text)
            .into_iter()
            .flatten()
            .map(|id| (id.block, *id))
    }

    /// 代表句标识符对应的文本
    pub fn text_of(&self, representative: SentenceId) -> Option<&str> {
        self.canonical
            .iter()
            .find(|(_, id)| **id == representative)
            .map(|(text, _)| text.as_str())
    }
}

/// 单次遍历扁平摘要，建立代表句与位置表
pub fn dedupe(summary: &FlatSummary) -> DedupResult {
    let mut result = DedupResult::default();

    for (_, sentence_id, text) in summary.segments() {
        result
            .canonical
            .entry(text.to_string())
            .or_insert(sentence_id);
        result
            .sentence_to_ids
            .entry(text.to_string())
            .or_default()
            .push(sentence_id);
    }

    tracing::info!(
        "去重完成: {} 句 -> {} 个不同句子",
        result.total_count(),
        result.unique_count()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::record::FlatBlock;

    fn summary(blocks: &[(&str, &[&str])]) -> FlatSummary {
        let blocks = blocks
            .iter()
            .enumerate()
            .map(|(i, (kind, sentences))| {
                let block_id = BlockId(i as u32 + 1);
                let segments = sentences
                    .iter()
                    .enumerate()
                    .map(|(k, s)| (block_id.sentence(k as u32 + 1), s.to_string()))
                    .collect();
                let flat = FlatBlock {
                    kind: kind.to_string(),
                    text: sentences.join(" "),
                    segments,
                };
                (block_id, flat)
            })
            .collect();
        FlatSummary { blocks }
    }

    #[test]
    fn test_shared_text_has_one_representative() {
        let summary = summary(&[
            ("p", &["Click here"]),
            ("a", &["Read more.", "Click here"]),
            ("p", &["Click here"]),
        ]);
        let result = dedupe(&summary);

        assert_eq!(result.unique_count(), 2);
        assert_eq!(result.total_count(), 4);
        assert_eq!(result.canonical["Click here"].to_string(), "BLOCK_1_S1");

        let ids: Vec<String> = result.sentence_to_ids["Click here"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, vec!["BLOCK_1_S1", "BLOCK_2_S2", "BLOCK_3_S1"]);

        let locations: Vec<BlockId> = result.locations("Click here").map(|(b, _)| b).collect();
        assert_eq!(locations, vec![BlockId(1), BlockId(2), BlockId(3)]);
    }

    #[test]
    fn test_exact_equality_only() {
        let summary = summary(&[("p", &["Hello"]), ("p", &["hello"]), ("p", &["Hello "])]);
        assert_eq!(dedupe(&summary).unique_count(), 3);
    }

    #[test]
    fn test_canonical_requests_in_first_seen_order() {
        let summary = summary(&[("p", &["B", "A"]), ("p", &["A", "C"])]);
        let result = dedupe(&summary);
        let requests: Vec<(String, String)> = result
            .canonical_requests()
            .into_iter()
            .map(|(id, text)| (id.to_string(), text))
            .collect();
        assert_eq!(
            requests,
            vec![
                ("BLOCK_1_S1".to_string(), "B".to_string()),
                ("BLOCK_1_S2".to_string(), "A".to_string()),
                ("BLOCK_2_S2".to_string(), "C".to_string()),
            ]
        );
        assert_eq!(result.text_of(BlockId(2).sentence(2)), Some("C"));
        assert_eq!(result.text_of(BlockId(2).sentence(1)), None);
    }

    #[test]
    fn test_serialized_shape() {
        let summary = summary(&[("p", &["Hi"]), ("p", &["Hi"])]);
        let json = serde_json::to_value(dedupe(&summary)).unwrap();
        assert_eq!(json["canonical"]["Hi"], "BLOCK_1_S1");
        assert_eq!(json["sentence_to_ids"]["Hi"][1], "BLOCK_2_S1");
    }

    #[test]
    fn test_empty_summary() {
        let result = dedupe(&FlatSummary::default());
        assert_eq!(result.unique_count(), 0);
        assert!(result.canonical_requests().is_empty());
        assert_eq!(result.locations("x").count(), 0);
    }
}
