//! 可翻译性分类器
//!
//! 对一个文本单元及其结构上下文作出"可翻译 / 不可翻译"的判定。
//! 规则是一个有序的纯函数列表，按顺序短路求值，第一个给出结论的规则生效：
//!
//! 1. 不翻译标记（自身或任一祖先）→ 拒绝
//! 2. 最近的 `translate` 覆盖（仅文本节点与标题）：`no` 拒绝，`yes` 接受（跳过 3-6，但不跳过 1）
//! 3. 模板语法或源代码 → 拒绝
//! 4. 外语书写系统 → 跳过规则 5
//! 5. 纯符号、数学片段或数学容器 → 拒绝
//! 6. 按来源的结构默认规则

use std::collections::HashMap;

use markup5ever_rcdom::Handle;

use super::{language, patterns};
use crate::parsers::html::{get_node_attr, get_node_name};
use crate::translation::config::constants;

// ============================================================================
// 文本单元
// ============================================================================

/// 祖先元素上与分类相关的事实，捕获后不可变
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementFacts {
    pub tag: String,
    pub translate: Option<String>,
    pub classes: Vec<String>,
    pub data_translate: Option<String>,
    pub data_i18n_skip: Option<String>,
}

impl ElementFacts {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_string(), ..Default::default() }
    }

    /// 从 DOM 元素读取；非元素节点返回 `None`
    pub fn from_handle(handle: &Handle) -> Option<Self> {
        let tag = get_node_name(handle)?.to_string();
        Some(Self {
            tag,
            translate: get_node_attr(handle, "translate").map(|v| v.trim().to_lowercase()),
            classes: get_node_attr(handle, "class")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            data_translate: get_node_attr(handle, "data-translate"),
            data_i18n_skip: get_node_attr(handle, "data-i18n-skip"),
        })
    }

    pub fn with_translate(mut self, value: &str) -> Self {
        self.translate = Some(value.to_lowercase());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    fn has_do_not_translate_marker(&self) -> bool {
        self.translate.as_deref() == Some("no")
            || self
                .classes
                .iter()
                .any(|c| constants::NO_TRANSLATE_CLASSES.contains(&c.as_str()))
            || self.data_translate.as_deref() == Some("no")
            || self.data_i18n_skip.as_deref() == Some("true")
    }

    fn is_math_container(&self) -> bool {
        self.tag == "math"
            || self
                .classes
                .iter()
                .any(|c| constants::MATH_CLASSES.contains(&c.as_str()))
    }
}

/// meta 元素的键
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaField {
    pub name: Option<String>,
    pub property: Option<String>,
    pub itemprop: Option<String>,
}

impl MetaField {
    /// 记录中使用的键：name 优先，其次 property、itemprop
    pub fn key(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(self.property.as_deref().filter(|v| !v.is_empty()))
            .or(self.itemprop.as_deref().filter(|v| !v.is_empty()))
    }
}

/// 文本单元的来源
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOrigin {
    /// 文本节点，`tag` 为所属元素
    NodeText { tag: String },
    /// 属性值
    Attribute { name: String },
    /// meta content
    Meta(MetaField),
    /// 文档 `<title>`
    DocumentTitle,
    /// JSON-LD 字段
    StructuredData { key: String },
}

/// 待分类的文本单元
#[derive(Debug, Clone)]
pub struct TextUnit {
    pub origin: UnitOrigin,
    pub text: String,
    /// 所属元素及其祖先，最近的在前
    pub ancestors: Vec<ElementFacts>,
    /// 所属元素的全部文本（用于数学容器判断）
    pub context_text: Option<String>,
    pub path: String,
}

impl TextUnit {
    pub fn new(origin: UnitOrigin, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
            ancestors: Vec::new(),
            context_text: None,
            path: String::new(),
        }
    }

    pub fn with_ancestors(mut self, ancestors: Vec<ElementFacts>) -> Self {
        self.ancestors = ancestors;
        self
    }

    pub fn with_context_text(mut self, text: impl Into<String>) -> Self {
        self.context_text = Some(text.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

// ============================================================================
// 判定结果
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Empty,
    DoNotTranslateMarker,
    OverrideNo,
    TemplateMarker,
    CodeFragment,
    PureSymbol,
    MathFragment,
    MathContainer,
    SkippedParent,
    TagNotAllowed,
    AttributeNotAllowed,
    MetaExcluded,
    MetaNotSeo,
    StructuredDataExcluded,
    StructuredDataTechnical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceptReason {
    OverrideYes,
    AllowedTag,
    AllowedAttribute,
    SeoMeta,
    DocumentTitle,
    StructuredDataKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept(AcceptReason),
    Reject(RejectReason),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }
}

// ============================================================================
// 规则
// ============================================================================

#[derive(Debug, Default)]
struct RuleContext {
    foreign_script: bool,
}

type Rule = fn(&TextUnit, &str, &mut RuleContext) -> Option<Decision>;

/// 规则顺序即优先级
const RULES: &[(&str, Rule)] = &[
    ("do_not_translate", rule_do_not_translate),
    ("translate_override", rule_translate_override),
    ("template_or_code", rule_template_or_code),
    ("foreign_script", rule_foreign_script),
    ("symbol_or_math", rule_symbol_or_math),
    ("structural_default", rule_structural_default),
];

fn rule_do_not_translate(unit: &TextUnit, _: &str, _: &mut RuleContext) -> Option<Decision> {
    unit.ancestors
        .iter()
        .any(ElementFacts::has_do_not_translate_marker)
        .then_some(Decision::Reject(RejectReason::DoNotTranslateMarker))
}

fn rule_translate_override(unit: &TextUnit, _: &str, _: &mut RuleContext) -> Option<Decision> {
    // meta 与 JSON-LD 只走各自的键规则
    if !matches!(unit.origin, UnitOrigin::NodeText { .. } | UnitOrigin::DocumentTitle) {
        return None;
    }

    let nearest = unit
        .ancestors
        .iter()
        .find_map(|a| a.translate.as_deref().filter(|v| *v == "yes" || *v == "no"))?;

    match nearest {
        "no" => Some(Decision::Reject(RejectReason::OverrideNo)),
        _ => Some(Decision::Accept(AcceptReason::OverrideYes)),
    }
}

fn rule_template_or_code(_: &TextUnit, text: &str, _: &mut RuleContext) -> Option<Decision> {
    if patterns::contains_template_markers(text) {
        return Some(Decision::Reject(RejectReason::TemplateMarker));
    }
    if patterns::is_code_fragment(text) {
        return Some(Decision::Reject(RejectReason::CodeFragment));
    }
    None
}

fn rule_foreign_script(_: &TextUnit, text: &str, ctx: &mut RuleContext) -> Option<Decision> {
    ctx.foreign_script = language::exception_language(text).is_some();
    None
}

fn rule_symbol_or_math(unit: &TextUnit, text: &str, ctx: &mut RuleContext) -> Option<Decision> {
    if ctx.foreign_script {
        return None;
    }
    if patterns::is_pure_symbol(text) {
        return Some(Decision::Reject(RejectReason::PureSymbol));
    }
    if patterns::is_math_fragment(text) {
        return Some(Decision::Reject(RejectReason::MathFragment));
    }
    if matches!(unit.origin, UnitOrigin::NodeText { .. }) && in_math_container(unit) {
        return Some(Decision::Reject(RejectReason::MathContainer));
    }
    None
}

fn in_math_container(unit: &TextUnit) -> bool {
    unit.ancestors.iter().any(ElementFacts::is_math_container)
        || unit
            .context_text
            .as_deref()
            .map_or(false, patterns::has_latex_delimiters)
}

fn rule_structural_default(unit: &TextUnit, _: &str, _: &mut RuleContext) -> Option<Decision> {
    let decision = match &unit.origin {
        UnitOrigin::NodeText { tag } => {
            if unit
                .ancestors
                .iter()
                .any(|a| constants::SKIP_PARENTS.contains(&a.tag.as_str()))
            {
                Decision::Reject(RejectReason::SkippedParent)
            } else if constants::TRANSLATABLE_TAGS.contains(&tag.as_str()) {
                Decision::Accept(AcceptReason::AllowedTag)
            } else {
                Decision::Reject(RejectReason::TagNotAllowed)
            }
        }
        UnitOrigin::Attribute { name } => {
            if constants::TRANSLATABLE_ATTRS.contains(&name.as_str())
                && !constants::BLOCKED_ATTRS.contains(&name.as_str())
            {
                Decision::Accept(AcceptReason::AllowedAttribute)
            } else {
                Decision::Reject(RejectReason::AttributeNotAllowed)
            }
        }
        UnitOrigin::Meta(field) => classify_meta(field),
        UnitOrigin::DocumentTitle => Decision::Accept(AcceptReason::DocumentTitle),
        UnitOrigin::StructuredData { key } => classify_structured_key(key),
    };
    Some(decision)
}

fn contains_ignore_case(list: &[&str], value: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(value))
}

fn classify_meta(field: &MetaField) -> Decision {
    let name = field.name.as_deref().unwrap_or("");
    let property = field.property.as_deref().unwrap_or("");
    let itemprop = field.itemprop.as_deref().unwrap_or("");

    if contains_ignore_case(constants::EXCLUDED_META_NAMES, name)
        || contains_ignore_case(constants::EXCLUDED_META_PROPERTIES, property)
    {
        return Decision::Reject(RejectReason::MetaExcluded);
    }

    let is_seo = (!name.is_empty() && contains_ignore_case(constants::SEO_META_NAMES, name))
        || (!property.is_empty() && contains_ignore_case(constants::SEO_META_PROPERTIES, property))
        || (!itemprop.is_empty() && contains_ignore_case(constants::SEO_META_ITEMPROPS, itemprop));

    if is_seo {
        Decision::Accept(AcceptReason::SeoMeta)
    } else {
        Decision::Reject(RejectReason::MetaNotSeo)
    }
}

fn classify_structured_key(key: &str) -> Decision {
    let key_lc = key.to_lowercase();

    if contains_ignore_case(constants::JSONLD_EXCLUDE_KEYS, key) || key_lc.starts_with('@') {
        return Decision::Reject(RejectReason::StructuredDataExcluded);
    }

    let technical = constants::JSONLD_TECHNICAL_FRAGMENTS
        .iter()
        .any(|fragment| key_lc.contains(fragment));

    if contains_ignore_case(constants::TRANSLATABLE_JSONLD_KEYS, key) || !technical {
        Decision::Accept(AcceptReason::StructuredDataKey)
    } else {
        Decision::Reject(RejectReason::StructuredDataTechnical)
    }
}

// ============================================================================
// 公共接口
// ============================================================================

/// 对文本单元作出判定
pub fn classify(unit: &TextUnit) -> Decision {
    let text = unit.text.trim();
    if text.is_empty() {
        return Decision::Reject(RejectReason::Empty);
    }

    let mut ctx = RuleContext::default();
    for (name, rule) in RULES {
        if let Some(decision) = rule(unit, text, &mut ctx) {
            tracing::trace!("规则 {} 判定 {:?}: {}", name, decision, unit.path);
            return decision;
        }
    }

    // 结构默认规则总会给出结论
    Decision::Reject(RejectReason::TagNotAllowed)
}

/// 文本单元是否可翻译
pub fn is_translatable(unit: &TextUnit) -> bool {
    classify(unit).is_accept()
}

/// 规则名称（按优先级）
pub fn rule_order() -> Vec<&'static str> {
    RULES.iter().map(|(name, _)| *name).collect()
}

/// 分类统计，由调用方维护
#[derive(Debug, Clone, Default)]
pub struct ClassifierStats {
    pub evaluated: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub by_reject_reason: HashMap<RejectReason, usize>,
}

impl ClassifierStats {
    pub fn record(&mut self, decision: &Decision) {
        self.evaluated += 1;
        match decision {
            Decision::Accept(_) => self.accepted += 1,
            Decision::Reject(reason) => {
                self.rejected += 1;
                *self.by_reject_reason.entry(*reason).or_insert(0) += 1;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_text(text: &str, chain: &[&str]) -> TextUnit {
        let ancestors = chain.iter().map(|t| ElementFacts::new(t)).collect();
        TextUnit::new(UnitOrigin::NodeText { tag: chain[0].to_string() }, text)
            .with_ancestors(ancestors)
    }

    fn meta(name: Option<&str>, property: Option<&str>) -> TextUnit {
        TextUnit::new(
            UnitOrigin::Meta(MetaField {
                name: name.map(str::to_string),
                property: property.map(str::to_string),
                itemprop: None,
            }),
            "Some descriptive words",
        )
        .with_ancestors(vec![ElementFacts::new("meta"), ElementFacts::new("head")])
    }

    #[test]
    fn test_rule_order_is_fixed() {
        assert_eq!(
            rule_order(),
            vec![
                "do_not_translate",
                "translate_override",
                "template_or_code",
                "foreign_script",
                "symbol_or_math",
                "structural_default",
            ]
        );
    }

    #[test]
    fn test_plain_paragraph_accepted() {
        let unit = node_text("Click here", &["p", "body", "html"]);
        assert_eq!(classify(&unit), Decision::Accept(AcceptReason::AllowedTag));
    }

    #[test]
    fn test_whitespace_rejected_first() {
        let unit = node_text("  \n\t ", &["p"]).with_ancestors(vec![
            ElementFacts::new("p").with_translate("yes"),
        ]);
        assert_eq!(classify(&unit), Decision::Reject(RejectReason::Empty));
    }

    #[test]
    fn test_template_marker_rejected() {
        let unit = node_text("{{user.name}}", &["span", "body"]);
        assert_eq!(classify(&unit), Decision::Reject(RejectReason::TemplateMarker));
    }

    #[test]
    fn test_code_or_math_rejected() {
        let unit = node_text("x = y + 1", &["p"]);
        assert!(!is_translatable(&unit));
        let unit = node_text("console.log(x)", &["p"]);
        assert_eq!(classify(&unit), Decision::Reject(RejectReason::CodeFragment));
    }

    #[test]
    fn test_script_container_rejected() {
        let unit = node_text("Hello world", &["span", "script", "body"]);
        assert_eq!(classify(&unit), Decision::Reject(RejectReason::SkippedParent));
        let unit = node_text("Hello world", &["script", "body"]);
        assert!(!is_translatable(&unit));
    }

    #[test]
    fn test_override_yes_beats_skip_parent_and_code() {
        let ancestors = vec![
            ElementFacts::new("span").with_translate("yes"),
            ElementFacts::new("code"),
        ];
        let unit = node_text("Hello world", &["span"]).with_ancestors(ancestors.clone());
        assert_eq!(classify(&unit), Decision::Accept(AcceptReason::OverrideYes));

        let unit = node_text("console.log(x)", &["span"]).with_ancestors(ancestors);
        assert!(is_translatable(&unit));
    }

    #[test]
    fn test_override_yes_ignored_for_meta_and_structured_data() {
        let root = vec![ElementFacts::new("meta"), ElementFacts::new("html").with_translate("yes")];
        let viewport = meta(Some("viewport"), None).with_ancestors(root.clone());
        assert_eq!(classify(&viewport), Decision::Reject(RejectReason::MetaExcluded));
        let og_url = meta(None, Some("og:url")).with_ancestors(root.clone());
        assert_eq!(classify(&og_url), Decision::Reject(RejectReason::MetaExcluded));

        let key = TextUnit::new(UnitOrigin::StructuredData { key: "@type".into() }, "Article")
            .with_ancestors(vec![ElementFacts::new("script"), ElementFacts::new("html").with_translate("yes")]);
        assert_eq!(classify(&key), Decision::Reject(RejectReason::StructuredDataExcluded));

        let href = TextUnit::new(UnitOrigin::Attribute { name: "href".into() }, "About us")
            .with_ancestors(root);
        assert_eq!(classify(&href), Decision::Reject(RejectReason::AttributeNotAllowed));
    }

    #[test]
    fn test_do_not_translate_beats_override_yes() {
        let ancestors = vec![
            ElementFacts::new("span").with_translate("yes"),
            ElementFacts::new("div").with_class("notranslate"),
        ];
        let unit = node_text("Brand Name", &["span"]).with_ancestors(ancestors);
        assert_eq!(classify(&unit), Decision::Reject(RejectReason::DoNotTranslateMarker));
    }

    #[test]
    fn test_translate_no_on_any_ancestor_is_marker() {
        let ancestors = vec![
            ElementFacts::new("span"),
            ElementFacts::new("div").with_translate("yes"),
            ElementFacts::new("section").with_translate("no"),
        ];
        let unit = node_text("Welcome", &["span"]).with_ancestors(ancestors);
        assert_eq!(classify(&unit), Decision::Reject(RejectReason::DoNotTranslateMarker));
    }

    #[test]
    fn test_inherited_override_yes() {
        let ancestors = vec![
            ElementFacts::new("td"),
            ElementFacts::new("pre").with_translate("YES"),
        ];
        let unit = node_text("Quarterly totals", &["td"]).with_ancestors(ancestors);
        assert_eq!(classify(&unit), Decision::Accept(AcceptReason::OverrideYes));
    }

    #[test]
    fn test_data_attribute_markers() {
        let mut facts = ElementFacts::new("p");
        facts.data_i18n_skip = Some("true".to_string());
        let unit = node_text("Hello world", &["p"]).with_ancestors(vec![facts]);
        assert!(!is_translatable(&unit));

        let mut facts = ElementFacts::new("p");
        facts.data_translate = Some("no".to_string());
        let unit = node_text("Hello world", &["p"]).with_ancestors(vec![facts]);
        assert!(!is_translatable(&unit));
    }

    #[test]
    fn test_symbols_and_math() {
        assert_eq!(
            classify(&node_text("→ • ©", &["span"])),
            Decision::Reject(RejectReason::PureSymbol)
        );
        assert_eq!(
            classify(&node_text("x^2", &["span"])),
            Decision::Reject(RejectReason::MathFragment)
        );
        let unit = node_text("Area", &["span", "div"]).with_ancestors(vec![
            ElementFacts::new("span"),
            ElementFacts::new("div").with_class("katex"),
        ]);
        assert_eq!(classify(&unit), Decision::Reject(RejectReason::MathContainer));
        let unit = node_text("where", &["p"]).with_context_text("where $a$ is constant");
        assert_eq!(classify(&unit), Decision::Reject(RejectReason::MathContainer));
    }

    #[test]
    fn test_foreign_script_skips_symbol_screen() {
        // 中文标点较多但不应被当作符号文本
        let unit = node_text("价格：¥100！", &["span"]);
        assert!(is_translatable(&unit));
        // 外语书写系统不跳过结构规则
        let unit = node_text("你好", &["script"]);
        assert!(!is_translatable(&unit));
    }

    #[test]
    fn test_attributes() {
        let alt = TextUnit::new(UnitOrigin::Attribute { name: "alt".into() }, "Company logo")
            .with_ancestors(vec![ElementFacts::new("img")]);
        assert_eq!(classify(&alt), Decision::Accept(AcceptReason::AllowedAttribute));

        let href = TextUnit::new(UnitOrigin::Attribute { name: "href".into() }, "About us")
            .with_ancestors(vec![ElementFacts::new("a")]);
        assert_eq!(classify(&href), Decision::Reject(RejectReason::AttributeNotAllowed));
    }

    #[test]
    fn test_meta_viewport_never_extracted() {
        assert_eq!(
            classify(&meta(Some("viewport"), None)),
            Decision::Reject(RejectReason::MetaExcluded)
        );
        assert_eq!(
            classify(&meta(None, Some("og:image"))),
            Decision::Reject(RejectReason::MetaExcluded)
        );
        assert_eq!(
            classify(&meta(Some("description"), None)),
            Decision::Accept(AcceptReason::SeoMeta)
        );
        assert_eq!(
            classify(&meta(None, Some("og:title"))),
            Decision::Accept(AcceptReason::SeoMeta)
        );
        assert_eq!(
            classify(&meta(Some("csrf-token"), None)),
            Decision::Reject(RejectReason::MetaNotSeo)
        );
    }

    #[test]
    fn test_meta_itemprop() {
        let unit = TextUnit::new(
            UnitOrigin::Meta(MetaField { itemprop: Some("headline".into()), ..Default::default() }),
            "Breaking news today",
        );
        assert!(is_translatable(&unit));
    }

    #[test]
    fn test_structured_data_keys() {
        let field = |key: &str, text: &str| {
            TextUnit::new(UnitOrigin::StructuredData { key: key.into() }, text)
        };
        assert!(is_translatable(&field("headline", "Rust in production")));
        assert!(is_translatable(&field("slogan", "Fast and safe")));
        assert!(is_translatable(&field("jobTitleLabel", "Senior engineer")));
        assert_eq!(
            classify(&field("@type", "Article")),
            Decision::Reject(RejectReason::StructuredDataExcluded)
        );
        assert_eq!(
            classify(&field("datePublished", "Yesterday morning")),
            Decision::Reject(RejectReason::StructuredDataExcluded)
        );
        assert_eq!(
            classify(&field("logoUrl", "Brand logo")),
            Decision::Reject(RejectReason::StructuredDataTechnical)
        );
    }

    #[test]
    fn test_document_title_accepted() {
        let unit = TextUnit::new(UnitOrigin::DocumentTitle, "Home page");
        assert!(is_translatable(&unit));
    }

    #[test]
    fn test_stats() {
        let mut stats = ClassifierStats::default();
        stats.record(&classify(&node_text("Click here", &["p"])));
        stats.record(&classify(&node_text("{{x}}", &["p"])));
        assert_eq!(stats.evaluated, 2);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.by_reject_reason.get(&RejectReason::TemplateMarker), Some(&1));
    }
}
