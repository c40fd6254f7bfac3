//! 寻址记录
//!
//! 提取结果的三种视图：
//! - [`AddressedRecord`]：块 → 句 → 词的完整层级结构（`translatable_structured.json`）
//! - [`FlatSummary`]：每块的类型、全文与分句（`translatable_flat.json`）
//! - 句级扁平映射（`translatable_flat_sentences.json`）

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::addressing::{BlockId, SentenceId};

/// 块的来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// 文本节点，值为所属元素名（`<title>` 也归于此类）
    Tag(String),
    /// 属性值，值为属性名
    Attr(String),
    /// meta 字段，值为 name / property / itemprop
    Meta(String),
    /// JSON-LD 字段，值为键名
    Jsonld(String),
}

impl Origin {
    /// 来源键（标签名、属性名、meta 名或 JSON-LD 键）
    pub fn key(&self) -> &str {
        match self {
            Origin::Tag(key) | Origin::Attr(key) | Origin::Meta(key) | Origin::Jsonld(key) => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Origin::Tag(_) => "tag",
            Origin::Attr(_) => "attr",
            Origin::Meta(_) => "meta",
            Origin::Jsonld(_) => "jsonld",
        }
    }
}

/// 词级记录，翻译时不修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordRecord {
    pub text: String,
    pub pos: String,
    pub language: String,
    pub ent: Option<String>,
    pub pinyin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub text: String,
    pub words: IndexMap<String, WordRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    #[serde(flatten)]
    pub origin: Origin,
    pub tokens: IndexMap<String, SentenceRecord>,
}

impl BlockRecord {
    /// 按句序拼接的块文本
    pub fn text(&self) -> String {
        join_sentences(self.tokens.values().map(|s| s.text.as_str()))
    }
}

/// 完整的寻址记录，键顺序即文档遍历顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressedRecord {
    pub blocks: IndexMap<BlockId, BlockRecord>,
}

impl AddressedRecord {
    /// 插入块；标识符已存在说明寻址方案被破坏
    pub fn insert(&mut self, id: BlockId, block: BlockRecord) -> TranslationResult<()> {
        if self.blocks.contains_key(&id) {
            return Err(TranslationError::DuplicateIdentifier(id.to_string()));
        }
        self.blocks.insert(id, block);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// 所有句子（按文档顺序）
    pub fn sentences(&self) -> impl Iterator<Item = (SentenceId, &SentenceRecord)> {
        self.blocks.iter().flat_map(|(block_id, block)| {
            block.tokens.iter().filter_map(move |(key, sentence)| {
                local_sentence_index(key).map(|index| (block_id.sentence(index), sentence))
            })
        })
    }

    /// 每块的类型、全文与分句
    pub fn flat_summary(&self) -> FlatSummary {
        let blocks = self
            .blocks
            .iter()
            .map(|(block_id, block)| {
                let segments = block
                    .tokens
                    .iter()
                    .filter_map(|(key, sentence)| {
                        local_sentence_index(key)
                            .map(|index| (block_id.sentence(index), sentence.text.clone()))
                    })
                    .collect();
                let flat = FlatBlock {
                    kind: block.origin.key().to_string(),
                    text: block.text(),
                    segments,
                };
                (*block_id, flat)
            })
            .collect();

        FlatSummary { blocks }
    }

    /// 句级扁平映射（不含词）
    pub fn flat_sentences(&self) -> IndexMap<SentenceId, String> {
        self.sentences()
            .map(|(id, sentence)| (id, sentence.text.clone()))
            .collect()
    }

    /// 所有句与词的标识符到文本的映射
    pub fn flat_map(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        for (sentence_id, sentence) in self.sentences() {
            map.insert(sentence_id.to_string(), sentence.text.clone());
            for (key, word) in &sentence.words {
                map.insert(format!("{}_{}", sentence_id, key), word.text.clone());
            }
        }
        map
    }
}

/// 扁平摘要中的单个块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub segments: IndexMap<SentenceId, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatSummary {
    pub blocks: IndexMap<BlockId, FlatBlock>,
}

impl FlatSummary {
    /// 所有分句（按文档顺序）
    pub fn segments(&self) -> impl Iterator<Item = (BlockId, SentenceId, &str)> {
        self.blocks.iter().flat_map(|(block_id, block)| {
            block
                .segments
                .iter()
                .map(move |(sentence_id, text)| (*block_id, *sentence_id, text.as_str()))
        })
    }

    /// 分句总数
    pub fn segment_count(&self) -> usize {
        self.blocks.values().map(|b| b.segments.len()).sum()
    }
}

fn local_sentence_index(key: &str) -> Option<u32> {
    key.strip_prefix('S').and_then(|digits| digits.parse().ok())
}

/// 句间连接规则：默认以单个空格分隔，前一句以中日韩或全角字符结尾时直接相连
pub fn join_sentences<'a>(sentences: impl IntoIterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for sentence in sentences {
        if let Some(last) = joined.chars().last() {
            if !is_wide_char(last) {
                joined.push(' ');
            }
        }
        joined.push_str(sentence);
    }
    joined
}

fn is_wide_char(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F     // CJK 标点
        | 0x3040..=0x30FF   // 平假名、片假名
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0xFF00..=0xFFEF   // 全角字符
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(text: &str) -> SentenceRecord {
        let mut words = IndexMap::new();
        for (i, w) in text.split_whitespace().enumerate() {
            words.insert(
                format!("W{}", i + 1),
                WordRecord {
                    text: w.to_string(),
                    pos: "X".to_string(),
                    language: "default".to_string(),
                    ent: None,
                    pinyin: None,
                },
            );
        }
        SentenceRecord { text: text.to_string(), words }
    }

    fn sample() -> AddressedRecord {
        let mut record = AddressedRecord::default();
        let mut tokens = IndexMap::new();
        tokens.insert("S1".to_string(), sentence("Hello there."));
        tokens.insert("S2".to_string(), sentence("Bye."));
        record
            .insert(BlockId(1), BlockRecord { origin: Origin::Tag("p".into()), tokens })
            .unwrap();
        let mut tokens = IndexMap::new();
        tokens.insert("S1".to_string(), sentence("Logo"));
        record
            .insert(BlockId(2), BlockRecord { origin: Origin::Attr("alt".into()), tokens })
            .unwrap();
        record
    }

    #[test]
    fn test_duplicate_block_is_fatal() {
        let mut record = sample();
        let result = record.insert(
            BlockId(1),
            BlockRecord { origin: Origin::Tag("p".into()), tokens: IndexMap::new() },
        );
        assert!(matches!(result, Err(TranslationError::DuplicateIdentifier(id)) if id == "BLOCK_1"));
    }

    #[test]
    fn test_structured_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["BLOCK_1"]["tag"], "p");
        assert_eq!(json["BLOCK_1"]["tokens"]["S2"]["text"], "Bye.");
        assert_eq!(json["BLOCK_1"]["tokens"]["S1"]["words"]["W1"]["text"], "Hello");
        assert!(json["BLOCK_1"]["tokens"]["S1"]["words"]["W1"]["ent"].is_null());
        assert_eq!(json["BLOCK_2"]["attr"], "alt");

        let back: AddressedRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_flat_summary() {
        let summary = sample().flat_summary();
        let block = &summary.blocks[&BlockId(1)];
        assert_eq!(block.kind, "p");
        assert_eq!(block.text, "Hello there. Bye.");
        assert_eq!(block.segments[&BlockId(1).sentence(2)], "Bye.");
        assert_eq!(summary.segment_count(), 3);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["BLOCK_2"]["type"], "alt");
        assert_eq!(json["BLOCK_1"]["segments"]["BLOCK_1_S1"], "Hello there.");
    }

    #[test]
    fn test_flat_views() {
        let record = sample();
        let sentences = record.flat_sentences();
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences.keys().next().unwrap().to_string(), "BLOCK_1_S1");

        let flat = record.flat_map();
        assert_eq!(flat["BLOCK_1_S1_W2"], "there.");
        assert_eq!(flat["BLOCK_2_S1"], "Logo");
    }

    #[test]
    fn test_join_rule() {
        assert_eq!(join_sentences(["One.", "Two."]), "One. Two.");
        assert_eq!(join_sentences(["你好。", "再见。"]), "你好。再见。");
        assert_eq!(join_sentences(["你好", "Hi"]), "你好Hi");
        assert_eq!(join_sentences(Vec::<&str>::new()), "");
    }
}
