//! 分句与分词
//!
//! 块文本先经过一次更严格的代码片段检查，再由语言路由选择分句配置，
//! 最后拆分为句与词并分配层级标识符。
//!
//! 准备阶段（检查、路由、配置解析）是顺序的；分析阶段是纯函数，
//! 可以在工作线程上并行执行。

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use pinyin::ToPinyin;
use unicode_segmentation::UnicodeSegmentation;

use super::addressing::{BlockId, SentenceId};
use super::{language, patterns};
use crate::translation::config::{constants, is_supported_profile};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::record::{SentenceRecord, WordRecord};

// ============================================================================
// 分句配置
// ============================================================================

/// 配置输出的词
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub pos: String,
    pub ent: Option<String>,
}

/// 配置输出的句
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedSentence {
    pub text: String,
    pub tokens: Vec<Token>,
}

/// 某种语言的分句与标注能力
pub trait SegmentationProfile: Send + Sync {
    /// 配置对应的语言代码
    fn code(&self) -> &str;

    /// 拆分为有序的句，每句为有序的词
    fn analyze(&self, text: &str) -> Vec<AnalyzedSentence>;
}

/// 配置加载器，首次加载可能较慢
pub trait ProfileLoader: Send + Sync {
    fn load(&self, code: &str) -> TranslationResult<Arc<dyn SegmentationProfile>>;
}

/// 基于 Unicode 文本分段规则（UAX #29）的配置
///
/// 实体标注只是启发式：句中首字母大写的词（含连续的多个）标为 `MISC`，
/// 不区分人名、地名与机构名。
#[derive(Debug, Clone)]
pub struct RuleBasedProfile {
    code: String,
}

impl RuleBasedProfile {
    pub fn new(code: &str) -> Self {
        Self { code: code.to_string() }
    }
}

impl SegmentationProfile for RuleBasedProfile {
    fn code(&self) -> &str {
        &self.code
    }

    fn analyze(&self, text: &str) -> Vec<AnalyzedSentence> {
        text.split_sentence_bounds()
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .map(|sentence| {
                let tokens = sentence
                    .split_word_bounds()
                    .filter(|word| !word.trim().is_empty())
                    .enumerate()
                    .map(|(index, word)| {
                        let pos = tag_word(&self.code, word, index == 0);
                        Token {
                            text: word.to_string(),
                            pos: pos.to_string(),
                            ent: (pos == "PROPN").then(|| ENTITY_LABEL.to_string()),
                        }
                    })
                    .collect();
                AnalyzedSentence { text: sentence.to_string(), tokens }
            })
            .collect()
    }
}

const ENTITY_LABEL: &str = "MISC";

/// 启发式词性：标点、数字、符号与少量英文虚词，其余为 X
fn tag_word(code: &str, word: &str, sentence_initial: bool) -> &'static str {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return "X";
    };

    if word.chars().all(|c| c.is_ascii_punctuation() || is_unicode_punctuation(c)) {
        return "PUNCT";
    }
    if word.chars().all(|c| c.is_numeric() || c == '.' || c == ',') && first.is_numeric() {
        return "NUM";
    }
    if !word.chars().any(char::is_alphanumeric) {
        return "SYM";
    }

    if code == "en" {
        let lower = word.to_lowercase();
        let closed = match lower.as_str() {
            "the" | "a" | "an" | "this" | "that" | "these" | "those" => Some("DET"),
            "of" | "in" | "on" | "at" | "for" | "with" | "to" | "from" | "by" | "without" => {
                Some("ADP")
            }
            "and" | "or" | "but" | "nor" => Some("CCONJ"),
            "i" | "you" | "he" | "she" | "it" | "we" | "they" | "me" | "us" | "them" => {
                Some("PRON")
            }
            "is" | "are" | "was" | "were" | "be" | "been" => Some("AUX"),
            "not" => Some("PART"),
            _ => None,
        };
        if let Some(tag) = closed {
            return tag;
        }
    }

    if first.is_uppercase() && !sentence_initial {
        return "PROPN";
    }

    "X"
}

fn is_unicode_punctuation(c: char) -> bool {
    matches!(c as u32,
        0x2010..=0x2027 | 0x2030..=0x205E | 0x3000..=0x303F | 0xFF01..=0xFF0F
        | 0xFF1A..=0xFF20 | 0xFF3B..=0xFF40 | 0xFF5B..=0xFF65
    ) || matches!(c, '¡' | '¿' | '«' | '»' | '·')
}

/// 内置加载器：为所有已知语言代码提供规则配置
#[derive(Debug, Default)]
pub struct RuleBasedLoader;

impl ProfileLoader for RuleBasedLoader {
    fn load(&self, code: &str) -> TranslationResult<Arc<dyn SegmentationProfile>> {
        if !is_supported_profile(code) {
            return Err(TranslationError::UnsupportedLanguage(format!(
                "没有 '{}' 的分句配置，可选: {}",
                code,
                constants::SUPPORTED_PROFILES.join(", ")
            )));
        }
        Ok(Arc::new(RuleBasedProfile::new(code)))
    }
}

/// 运行期内的配置缓存，每种语言只加载一次
pub struct ProfileRegistry {
    loader: Arc<dyn ProfileLoader>,
    profiles: DashMap<String, Arc<dyn SegmentationProfile>>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new(Arc::new(RuleBasedLoader))
    }
}

impl ProfileRegistry {
    pub fn new(loader: Arc<dyn ProfileLoader>) -> Self {
        Self { loader, profiles: DashMap::new() }
    }

    /// 获取配置；不支持的语言是致命错误，不回退到默认配置
    pub fn get(&self, code: &str) -> TranslationResult<Arc<dyn SegmentationProfile>> {
        if let Some(profile) = self.profiles.get(code) {
            return Ok(Arc::clone(profile.value()));
        }

        let profile = self.loader.load(code)?;
        tracing::debug!("加载分句配置: {}", code);
        let entry = self.profiles.entry(code.to_string()).or_insert(profile);
        Ok(Arc::clone(entry.value()))
    }

    pub fn loaded_count(&self) -> usize {
        self.profiles.len()
    }
}

// ============================================================================
// 分句结果
// ============================================================================

/// 一个块的分句结果
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedBlock {
    pub block_id: BlockId,
    /// 结构化视图：`S<k>` → {text, words}
    pub tokens: IndexMap<String, SentenceRecord>,
    /// 扁平视图：句与词的标识符 → 文本
    pub flat: IndexMap<String, String>,
    /// 有序的 (句标识符, 句文本)
    pub sentences: Vec<(SentenceId, String)>,
}

impl SegmentedBlock {
    /// 占位符使用的第一句标识符
    pub fn first_sentence_id(&self) -> Option<SentenceId> {
        self.sentences.first().map(|(id, _)| *id)
    }
}

/// 已分配标识符、等待分析的块
#[derive(Clone)]
pub struct BlockPlan {
    pub block_id: BlockId,
    pub text: String,
    /// 路由结果，`None` 表示文档主语言
    pub route: Option<&'static str>,
    pub profile: Arc<dyn SegmentationProfile>,
}

/// 准备阶段：代码片段检查与配置选择。代码片段返回 `Ok(None)`，块被丢弃
pub fn plan_block(
    registry: &ProfileRegistry,
    default_profile: &Arc<dyn SegmentationProfile>,
    block_id: BlockId,
    text: &str,
) -> TranslationResult<Option<BlockPlan>> {
    if patterns::is_code_fragment(text) {
        tracing::debug!("{} 为代码片段，跳过分句", block_id);
        return Ok(None);
    }

    let route = language::route(text);
    let profile = match route {
        Some(code) => registry.get(code)?,
        None => Arc::clone(default_profile),
    };

    Ok(Some(BlockPlan { block_id, text: text.to_string(), route, profile }))
}

/// 分析阶段：纯函数。配置未产生任何句子时返回 `None`
pub fn analyze_block(plan: &BlockPlan) -> Option<SegmentedBlock> {
    let language = plan.route.unwrap_or(constants::DEFAULT_ROUTE_LABEL);

    let mut tokens = IndexMap::new();
    let mut flat = IndexMap::new();
    let mut sentences = Vec::new();

    for (s_idx, sentence) in plan.profile.analyze(&plan.text).into_iter().enumerate() {
        let sentence_id = plan.block_id.sentence(s_idx as u32 + 1);
        flat.insert(sentence_id.to_string(), sentence.text.clone());
        sentences.push((sentence_id, sentence.text.clone()));

        let mut words = IndexMap::new();
        for (w_idx, token) in sentence.tokens.into_iter().enumerate() {
            let word_id = sentence_id.word(w_idx as u32 + 1);
            flat.insert(word_id.to_string(), token.text.clone());
            words.insert(
                word_id.local_key(),
                WordRecord {
                    pinyin: phonetic_hint(&token.text),
                    text: token.text,
                    pos: token.pos,
                    language: language.to_string(),
                    ent: token.ent.filter(|e| !e.is_empty()),
                },
            );
        }

        tokens.insert(sentence_id.local_key(), SentenceRecord { text: sentence.text, words });
    }

    if sentences.is_empty() {
        return None;
    }

    Some(SegmentedBlock { block_id: plan.block_id, tokens, flat, sentences })
}

/// 准备并分析单个块
pub fn segment(
    registry: &ProfileRegistry,
    default_profile: &Arc<dyn SegmentationProfile>,
    block_id: BlockId,
    text: &str,
) -> TranslationResult<Option<SegmentedBlock>> {
    Ok(plan_block(registry, default_profile, block_id, text)?.and_then(|plan| analyze_block(&plan)))
}

/// 含汉字的词给出拼音，非汉字片段原样保留，以空格连接
pub fn phonetic_hint(word: &str) -> Option<String> {
    if !language::contains_chinese(word) {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    let mut pending = String::new();

    for (ch, reading) in word.chars().zip(word.to_pinyin()) {
        match reading {
            Some(p) => {
                if !pending.is_empty() {
                    parts.push(std::mem::take(&mut pending));
                }
                parts.push(p.plain().to_string());
            }
            None => pending.push(ch),
        }
    }
    if !pending.is_empty() {
        parts.push(pending);
    }

    Some(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_profile() -> Arc<dyn SegmentationProfile> {
        Arc::new(RuleBasedProfile::new("en"))
    }

    #[test]
    fn test_sentences_and_words() {
        let registry = ProfileRegistry::default();
        let block = segment(&registry, &default_profile(), BlockId(1), "Hello world. How are you?")
            .unwrap()
            .unwrap();

        assert_eq!(block.sentences.len(), 2);
        assert_eq!(block.sentences[0], (BlockId(1).sentence(1), "Hello world.".to_string()));
        assert_eq!(block.sentences[1].1, "How are you?");
        assert_eq!(block.flat["BLOCK_1_S1_W1"], "Hello");
        assert_eq!(block.flat["BLOCK_1_S1_W3"], ".");
        assert_eq!(block.tokens["S1"].words["W3"].pos, "PUNCT");
        assert_eq!(block.tokens["S2"].words["W2"].pos, "AUX");
        assert_eq!(block.first_sentence_id().unwrap().to_string(), "BLOCK_1_S1");
    }

    #[test]
    fn test_capitalised_words_marked_as_entities() {
        let registry = ProfileRegistry::default();
        let block = segment(&registry, &default_profile(), BlockId(6), "Yesterday we visited New York.")
            .unwrap()
            .unwrap();
        let words = &block.tokens["S1"].words;
        assert_eq!(words["W1"].ent, None);
        assert_eq!(words["W2"].ent, None);
        assert_eq!(words["W4"].ent.as_deref(), Some("MISC"));
        assert_eq!(words["W5"].ent.as_deref(), Some("MISC"));
        assert_eq!(words["W6"].ent, None);
    }

    #[test]
    fn test_route_propagates_to_words() {
        let registry = ProfileRegistry::default();
        let block = segment(&registry, &default_profile(), BlockId(4), "This is fine")
            .unwrap()
            .unwrap();
        assert!(block.tokens["S1"].words.values().all(|w| w.language == "en"));

        let block = segment(&registry, &default_profile(), BlockId(5), "Lorem ipsum")
            .unwrap()
            .unwrap();
        assert!(block.tokens["S1"].words.values().all(|w| w.language == "default"));
    }

    #[test]
    fn test_chinese_words_get_pinyin() {
        let registry = ProfileRegistry::default();
        let block = segment(&registry, &default_profile(), BlockId(2), "中国。")
            .unwrap()
            .unwrap();
        let words = &block.tokens["S1"].words;
        assert_eq!(words["W1"].text, "中");
        assert_eq!(words["W1"].pinyin.as_deref(), Some("zhong"));
        assert_eq!(words["W1"].language, "zh");
        assert_eq!(words["W3"].pinyin, None);
    }

    #[test]
    fn test_phonetic_hint_keeps_non_han_runs() {
        assert_eq!(phonetic_hint("中国"), Some("zhong guo".to_string()));
        assert_eq!(phonetic_hint("A股"), Some("A gu".to_string()));
        assert_eq!(phonetic_hint("hello"), None);
    }

    #[test]
    fn test_code_fragment_dropped() {
        let registry = ProfileRegistry::default();
        let block = segment(&registry, &default_profile(), BlockId(3), "console.log(x)").unwrap();
        assert!(block.is_none());
    }

    #[test]
    fn test_registry_caches_profiles() {
        let registry = ProfileRegistry::default();
        let first = registry.get("fr").unwrap();
        let second = registry.get("fr").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.loaded_count(), 1);
    }

    #[test]
    fn test_unsupported_profile_is_fatal() {
        let registry = ProfileRegistry::default();
        assert!(matches!(
            registry.get("tlh"),
            Err(TranslationError::UnsupportedLanguage(_))
        ));
    }

    struct SilentProfile;

    impl SegmentationProfile for SilentProfile {
        fn code(&self) -> &str {
            "en"
        }

        fn analyze(&self, _: &str) -> Vec<AnalyzedSentence> {
            Vec::new()
        }
    }

    #[test]
    fn test_profile_without_sentences_yields_none() {
        let registry = ProfileRegistry::default();
        let silent: Arc<dyn SegmentationProfile> = Arc::new(SilentProfile);
        let block = segment(&registry, &silent, BlockId(9), "Lorem ipsum").unwrap();
        assert!(block.is_none());
    }
}
