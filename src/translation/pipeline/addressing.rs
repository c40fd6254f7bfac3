//! 层级标识符
//!
//! `BLOCK_<n>` / `BLOCK_<n>_S<k>` / `BLOCK_<n>_S<k>_W<m>`，编号均从 1 开始。
//! 编码是纯语法的，可以无歧义地解析回 (块, 句, 词) 坐标。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::translation::error::TranslationError;

const BLOCK_PREFIX: &str = "BLOCK_";

/// 块标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// 句标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SentenceId {
    pub block: BlockId,
    pub index: u32,
}

/// 词标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordId {
    pub sentence: SentenceId,
    pub index: u32,
}

impl BlockId {
    pub fn sentence(self, index: u32) -> SentenceId {
        SentenceId { block: self, index }
    }
}

impl SentenceId {
    pub fn word(self, index: u32) -> WordId {
        WordId { sentence: self, index }
    }

    /// 块内局部键 `S<k>`
    pub fn local_key(&self) -> String {
        format!("S{}", self.index)
    }
}

impl WordId {
    /// 句内局部键 `W<m>`
    pub fn local_key(&self) -> String {
        format!("W{}", self.index)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", BLOCK_PREFIX, self.0)
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_S{}", self.block, self.index)
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_W{}", self.sentence, self.index)
    }
}

/// 任意层级的标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitId {
    Block(BlockId),
    Sentence(SentenceId),
    Word(WordId),
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Block(id) => id.fmt(f),
            UnitId::Sentence(id) => id.fmt(f),
            UnitId::Word(id) => id.fmt(f),
        }
    }
}

/// 解析 `<tag><digits>` 形式的分段，数字从 1 开始且不允许前导零
fn parse_index(segment: &str, tag: char) -> Option<u32> {
    let digits = segment.strip_prefix(tag)?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 解析任意层级的标识符
pub fn parse_unit_id(value: &str) -> Result<UnitId, TranslationError> {
    let invalid = || TranslationError::InvalidInput(format!("无效的标识符: {}", value));

    let rest = value.strip_prefix(BLOCK_PREFIX).ok_or_else(invalid)?;
    let mut parts = rest.split('_');

    let block = parts
        .next()
        .and_then(|digits| {
            if digits.is_empty()
                || digits.starts_with('0')
                || !digits.bytes().all(|b| b.is_ascii_digit())
            {
                None
            } else {
                digits.parse().ok()
            }
        })
        .map(BlockId)
        .ok_or_else(invalid)?;

    let sentence = match parts.next() {
        None => return Ok(UnitId::Block(block)),
        Some(segment) => block.sentence(parse_index(segment, 'S').ok_or_else(invalid)?),
    };

    let word = match parts.next() {
        None => return Ok(UnitId::Sentence(sentence)),
        Some(segment) => sentence.word(parse_index(segment, 'W').ok_or_else(invalid)?),
    };

    if parts.next().is_some() {
        return Err(invalid());
    }

    Ok(UnitId::Word(word))
}

impl FromStr for BlockId {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_unit_id(s)? {
            UnitId::Block(id) => Ok(id),
            _ => Err(TranslationError::InvalidInput(format!("不是块标识符: {}", s))),
        }
    }
}

impl FromStr for SentenceId {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_unit_id(s)? {
            UnitId::Sentence(id) => Ok(id),
            _ => Err(TranslationError::InvalidInput(format!("不是句标识符: {}", s))),
        }
    }
}

impl FromStr for WordId {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_unit_id(s)? {
            UnitId::Word(id) => Ok(id),
            _ => Err(TranslationError::InvalidInput(format!("不是词标识符: {}", s))),
        }
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(BlockId);
string_serde!(SentenceId);
string_serde!(WordId);

/// 块编号分配器，按文档顺序单调递增
#[derive(Debug)]
pub struct BlockCounter {
    next: u32,
}

impl Default for BlockCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl BlockCounter {
    /// 查看下一个编号但不消耗
    pub fn peek(&self) -> BlockId {
        BlockId(self.next)
    }

    /// 消耗并返回下一个编号
    pub fn allocate(&mut self) -> BlockId {
        let id = BlockId(self.next);
        self.next += 1;
        id
    }
}
