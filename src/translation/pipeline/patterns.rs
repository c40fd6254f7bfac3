//! 文本特征模式
//!
//! 模板语法、源代码片段、数学公式与纯符号文本的检测。
//! 所有检测均为纯函数，正则表达式在首次使用时编译并缓存。

use std::sync::OnceLock;

use regex::Regex;

/// 已编译的正则，编译失败时记录错误并视为不匹配
fn cached(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| {
        Regex::new(source)
            .map_err(|e| tracing::error!("正则表达式编译失败 {}: {}", source, e))
            .ok()
    })
    .as_ref()
}

fn is_match(cell: &'static OnceLock<Option<Regex>>, source: &str, text: &str) -> bool {
    cached(cell, source).map_or(false, |re| re.is_match(text))
}

// ============================================================================
// 模板语法
// ============================================================================

const TEMPLATE_MARKERS: &[&str] = &[
    r"\{\{[^}]*\}\}",                // Mustache / Handlebars
    r"\{%[^%]*%\}",                  // Jinja2 / Liquid
    r"\{#[^#]*#\}",                  // Jinja2 注释
    r"\$\{[^}]*\}",                  // JS 模板字符串 / shell 变量
    r"@\([^)]*\)",                   // Angular 表达式
    r"%\([^)]*\)s",                  // Python 格式化
    r"\[\[\s*[\w\s.]*\s*\]\]",       // Vue / Angular 绑定
    r#"<\?=\s*\$[\w'"]+\s*\?>"#,     // PHP 短输出
    r"(?s)<\?php.*?\?>",             // PHP 代码块
    r"\$[A-Za-z_][A-Za-z0-9_]*",     // $VAR
    r"(?s)<#.*?#>",                  // Razor
    r"<:.*?>",                       // JSP
];

static TEMPLATE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static TEMPLATE_SOURCE: OnceLock<String> = OnceLock::new();

/// 是否包含模板语法标记
pub fn contains_template_markers(text: &str) -> bool {
    let source = TEMPLATE_SOURCE.get_or_init(|| TEMPLATE_MARKERS.join("|"));
    is_match(&TEMPLATE_PATTERN, source, text)
}

// ============================================================================
// 源代码片段
// ============================================================================

const CODE_PATTERNS: &[&str] = &[
    r"(\w+)\.(\w+)\(.*?\)",                                   // 方法调用: obj.fn()
    r"(?:^|[^\w])[A-Za-z0-9_]+\s*=\s*",                       // 赋值: x = ...
    r"</?[a-z0-9-]+(?:\s+[^>]*)?/?>",                         // HTML 标签
    r#"\{\s*[\w\s,:"']*\s*\}"#,                               // 对象字面量
    r"\[[^\]]*\]",                                            // 数组字面量
    r#"^\s*(?:import\s+(?:[\w*{}\s,]+\s+from\s+)?['"][^'"]+['"]|export\s+(?:default|const|let|var|function|class)\b)"#, // import/export 语句
    r"console\.(?:log|error|warn|info)",                      // console 调用
    r"function\s+\w+\s*\([^)]*\)",                            // 函数声明
    r"@\w+(?:\([^)]*\))?",                                    // 装饰器
    r"#[a-fA-F0-9]{3,8}\b",                                   // 十六进制颜色
    r"\$\{[^}]*\}",                                           // 模板字符串
    r"\b(?:let|const|var)\s+\w+\s*:\s*[\w<>{}, ]+",           // TS 类型标注
    r"\binterface\s+\w+\s*\{[^}]*\}",                         // TS 接口
    r"\benum\s+\w+\s*\{[^}]*\}",                              // TS 枚举
    r"\bfunction\s+\w+\s*<[^>]+>\s*\([^)]*\)",                // TS 泛型函数
];

static CODE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static CODE_SOURCE: OnceLock<String> = OnceLock::new();

/// 是否看起来像源代码
pub fn is_code_fragment(text: &str) -> bool {
    let source = CODE_SOURCE.get_or_init(|| CODE_PATTERNS.join("|"));
    is_match(&CODE_PATTERN, source, text)
}

// ============================================================================
// 数学与符号
// ============================================================================

static REAL_WORD: OnceLock<Option<Regex>> = OnceLock::new();
static SYMBOL_CHAR: OnceLock<Option<Regex>> = OnceLock::new();
static EQUATION: OnceLock<Option<Regex>> = OnceLock::new();
static LATEX_DELIMITERS: OnceLock<Option<Regex>> = OnceLock::new();

const LATEX_SOURCE: &str = r"\$.*?\$|\\.*?\\";

/// 不含任何文字（任何书写系统）的文本
pub fn is_pure_symbol(text: &str) -> bool {
    !text.chars().any(char::is_alphabetic)
}

/// 是否包含至少三个字母组成的词
pub fn has_real_words(text: &str) -> bool {
    is_match(&REAL_WORD, r"\b\p{L}{3,}\b", text)
}

/// 没有真实词汇且含有标点、符号或数字
pub fn is_symbol_heavy(text: &str) -> bool {
    if has_real_words(text) {
        return false;
    }
    is_match(&SYMBOL_CHAR, r"[\p{P}\p{S}\d_]", text)
}

/// 独立的数学公式或表达式
pub fn is_math_fragment(text: &str) -> bool {
    let source = concat!(
        r"(\w+\s*[=+\-*/^]\s*\S+)",  // x = y + 1
        r"|(\d+[+\-*/]\d+)",         // 2+2
        r"|([a-zA-Z]+\^?\d+)",       // x^2
        r"|(\$.*?\$|\\.*?\\)",       // LaTeX
    );
    (is_match(&EQUATION, source, text) && !has_real_words(text)) || is_symbol_heavy(text)
}

/// 文本中是否出现 LaTeX 分隔符
pub fn has_latex_delimiters(text: &str) -> bool {
    is_match(&LATEX_DELIMITERS, LATEX_SOURCE, text)
}
