//! 语言路由
//!
//! 根据书写系统与词汇特征为文本选择分句配置。
//!
//! 两个检测层级：
//! - 例外层（[`exception_language`]）：只识别无歧义的书写系统，供分类器跳过符号/公式筛查
//! - 完整层（[`route`]）：在例外层基础上增加拉丁字母语言的变音符与停用词启发式
//!
//! 检测顺序本身是契约的一部分：多种特征同时出现时返回列表中第一个命中的语言。

use std::sync::OnceLock;

use regex::Regex;

/// 单个语言检测器
struct Detector {
    code: &'static str,
    matches: fn(&str) -> bool,
}

// ============================================================================
// 书写系统检测
// ============================================================================

fn in_ranges(text: &str, ranges: &[(u32, u32)]) -> bool {
    text.chars().any(|c| {
        let cp = c as u32;
        ranges.iter().any(|&(lo, hi)| cp >= lo && cp <= hi)
    })
}

pub fn contains_chinese(text: &str) -> bool {
    in_ranges(text, &[(0x4E00, 0x9FFF), (0x3400, 0x4DBF)])
}

pub fn contains_japanese(text: &str) -> bool {
    in_ranges(text, &[(0x3040, 0x309F), (0x30A0, 0x30FF), (0x4E00, 0x9FAF)])
}

pub fn contains_korean(text: &str) -> bool {
    in_ranges(text, &[(0xAC00, 0xD7AF), (0x1100, 0x11FF), (0x3130, 0x318F)])
}

pub fn contains_arabic(text: &str) -> bool {
    in_ranges(
        text,
        &[
            (0x0600, 0x06FF),
            (0x0750, 0x077F),
            (0x08A0, 0x08FF),
            (0xFB50, 0xFDFF),
            (0xFE70, 0xFEFF),
        ],
    )
}

pub fn contains_hebrew(text: &str) -> bool {
    in_ranges(text, &[(0x0590, 0x05FF), (0xFB1D, 0xFB4F)])
}

pub fn contains_thai(text: &str) -> bool {
    in_ranges(text, &[(0x0E00, 0x0E7F)])
}

pub fn contains_devanagari(text: &str) -> bool {
    in_ranges(text, &[(0x0900, 0x097F)])
}

pub fn contains_cyrillic(text: &str) -> bool {
    in_ranges(
        text,
        &[(0x0400, 0x04FF), (0x0500, 0x052F), (0x2DE0, 0x2DFF), (0xA640, 0xA69F)],
    )
}

pub fn contains_greek(text: &str) -> bool {
    in_ranges(text, &[(0x0370, 0x03FF), (0x1F00, 0x1FFF)])
}

// ============================================================================
// 拉丁字母语言：变音符与停用词
// ============================================================================

fn lexical(cell: &'static OnceLock<Option<Regex>>, source: &str, text: &str) -> bool {
    cell.get_or_init(|| {
        Regex::new(source)
            .map_err(|e| tracing::error!("语言检测正则编译失败: {}", e))
            .ok()
    })
    .as_ref()
    .map_or(false, |re| re.is_match(text))
}

macro_rules! lexical_detector {
    ($name:ident, $source:expr) => {
        pub fn $name(text: &str) -> bool {
            static CELL: OnceLock<Option<Regex>> = OnceLock::new();
            lexical(&CELL, $source, text)
        }
    };
}

lexical_detector!(
    contains_english,
    r"(?i)\b(?:the|and|is|of|to|in|with|but|not|a|an|for|on|that|how|without|more|are|this|these|those)\b"
);

lexical_detector!(
    contains_french,
    r"(?i)[àâæçéèêëîïôœùûüÿ]|\b(?:le|la|les|un|une|des|ce|cette|est|avec|mais|pour|pas|qui|sur|vous|nous|ils|elles|sont)\b"
);

lexical_detector!(
    contains_spanish,
    r"(?i)[áéíóúüñ¿¡]|\b(?:el|la|los|las|un|una|que|es|con|pero|por|para|cómo|sin|más|esto|esta|estos|estas|eso|esa)\b"
);

lexical_detector!(
    contains_italian,
    r"(?i)[àèéìíîòóùú]|\b(?:il|lo|la|gli|le|un|una|che|è|con|ma|come|perché|senza|più|meno|sono|questo|questa|questi)\b"
);

lexical_detector!(
    contains_portuguese,
    r"(?i)[áàâãéêíóôõúç]|\b(?:o|a|os|as|um|uma|que|é|com|mas|por|para|como|sem|mais|são|isto|esta|estes|estas|esse|essa)\b"
);

lexical_detector!(
    contains_german,
    r"(?i)[äöüß]|\b(?:der|die|das|ein|eine|ist|mit|aber|und|nicht|für|ohne|warum|wie|mehr|sind|diese|dieser)\b"
);

lexical_detector!(
    contains_dutch,
    r"(?i)[áàéèëïöüĳ]|\b(?:de|het|een|is|zijn|en|of|maar|voor|met|door|wat|wie|waar|hoe|waarom|wanneer)\b"
);

lexical_detector!(
    contains_polish,
    r"(?i)[ąćęłńóśźż]|\b(?:i|w|z|na|to|że|a|jest|się|do|o|jak|nie|co|dla|tak|przez|tylko|albo)\b"
);

// ============================================================================
// 检测层级
// ============================================================================

const EXCEPTION_TIER: &[Detector] = &[
    Detector { code: "zh", matches: contains_chinese },
    Detector { code: "ar", matches: contains_arabic },
    Detector { code: "xx", matches: contains_hebrew },
    Detector { code: "xx", matches: contains_thai },
    Detector { code: "xx", matches: contains_devanagari },
    Detector { code: "ko", matches: contains_korean },
    Detector { code: "ja", matches: contains_japanese },
];

const FULL_TIER: &[Detector] = &[
    Detector { code: "zh", matches: contains_chinese },
    Detector { code: "en", matches: contains_english },
    Detector { code: "ar", matches: contains_arabic },
    Detector { code: "ru", matches: contains_cyrillic },
    Detector { code: "el", matches: contains_greek },
    Detector { code: "xx", matches: contains_hebrew },
    Detector { code: "xx", matches: contains_thai },
    Detector { code: "xx", matches: contains_devanagari },
    Detector { code: "ja", matches: contains_japanese },
    Detector { code: "ko", matches: contains_korean },
    Detector { code: "fr", matches: contains_french },
    Detector { code: "es", matches: contains_spanish },
    Detector { code: "it", matches: contains_italian },
    Detector { code: "de", matches: contains_german },
    Detector { code: "nl", matches: contains_dutch },
    Detector { code: "pt", matches: contains_portuguese },
    Detector { code: "pl", matches: contains_polish },
];

fn first_match(tier: &[Detector], text: &str) -> Option<&'static str> {
    tier.iter().find(|d| (d.matches)(text)).map(|d| d.code)
}

/// 例外层：文本明显需要非默认语言处理时返回语言代码
pub fn exception_language(text: &str) -> Option<&'static str> {
    first_match(EXCEPTION_TIER, text)
}

/// 完整层：为文本选择分句配置，`None` 表示使用文档主语言
pub fn route(text: &str) -> Option<&'static str> {
    first_match(FULL_TIER, text)
}
