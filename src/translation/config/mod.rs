//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslationConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 批次处理相关
    pub const DEFAULT_BATCH_SIZE: usize = 330;
    pub const DEFAULT_MAX_BATCH_CHARS: usize = 50_000;

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "https://api-free.deepl.com/v2/translate";
    pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 3;
    pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

    // 语言设置
    pub const DEFAULT_PRIMARY_LANG: &str = "en";
    pub const DEFAULT_TARGET_LANG: &str = "fr";
    pub const DEFAULT_ROUTE_LABEL: &str = "default";

    // 输出文件
    pub const DEFAULT_MEMORY_DIR: &str = "translation_memory";
    pub const STRUCTURED_ARTIFACT: &str = "translatable_structured.json";
    pub const FLAT_ARTIFACT: &str = "translatable_flat.json";
    pub const FLAT_SENTENCES_ARTIFACT: &str = "translatable_flat_sentences.json";
    pub const PLACEHOLDER_ARTIFACT: &str = "non_translatable.html";
    pub const DEDUP_ARTIFACT: &str = "deduplicated.json";
    pub const ID_REMAP_ARTIFACT: &str = "id_remap.json";
    pub const TRANSLATED_FLAT_ARTIFACT: &str = "translated_flat.json";
    pub const TRANSLATED_HTML_ARTIFACT: &str = "translated.html";

    /// 已知的分句配置（语言代码），`xx` 为多语种通用配置
    pub const SUPPORTED_PROFILES: &[&str] = &[
        "en", "zh", "fr", "es", "de", "it", "pt", "ru", "el", "ja", "ko", "nl", "pl", "ar", "xx",
    ];

    // 可翻译的文本节点所属标签
    pub const TRANSLATABLE_TAGS: &[&str] = &[
        "p", "span", "div", "h1", "h2", "h3", "h4", "h5", "h6",
        "label", "button", "li", "td", "th", "a", "strong", "em",
        "b", "i", "caption", "summary", "figcaption", "option", "optgroup",
        "legend", "mark", "output", "details", "time", "abbr", "address", "article",
        "aside", "bdi", "bdo", "blockquote", "cite", "data", "dd", "dfn", "dl", "dt",
        "fieldset", "footer", "header", "ins", "kbd", "main", "nav", "q", "rp", "rt",
        "ruby", "s", "samp", "section", "small", "sub", "sup", "u", "var", "textarea",
        "meter", "progress", "audio", "track", "video", "custom-element", "x-component",
    ];

    // 可翻译属性（按提取顺序）
    pub const TRANSLATABLE_ATTRS: &[&str] = &[
        "alt", "title", "placeholder", "aria-label", "aria-placeholder", "aria-valuetext",
        "aria-roledescription", "value", "data-i18n", "data-caption", "data-title",
        "data-tooltip", "data-label", "data-error", "aria-description", "aria-details",
        "aria-errormessage", "aria-keyshortcuts", "aria-labelledby", "data-message",
        "data-content", "data-text", "data-description", "data-alt", "data-prompt",
        "data-hint", "data-warning", "data-success-message", "data-error-message",
        "data-empty-message", "data-confirmation", "data-fallback-text",
        "data-notification", "v-tooltip", "ng-attr-title", "x-tooltip", "react-tooltip",
        "tooltip-content", "tooltip-text", "ng-placeholder", "v-placeholder",
        "pattern-description", "validation-message", "help-text", "description-text",
    ];

    // 永不翻译的属性
    pub const BLOCKED_ATTRS: &[&str] = &[
        // 布局与行为
        "accept", "align", "autocomplete", "bgcolor", "charset", "content", "dir",
        "download", "href", "id", "lang", "name", "rel", "src", "style", "type",
        "action", "method", "enctype", "target", "wrap",
        // 表单
        "pattern", "readonly", "step", "max", "min", "size", "multiple", "list",
        // 显示与结构
        "colspan", "rowspan", "headers", "height", "width", "hidden", "poster",
        "preload", "media", "start",
        // 媒体
        "high", "low", "kind", "srcset", "frameborder",
        // 无障碍与角色
        "role", "selected", "aria-hidden",
        // 框架控制指令
        "v-if", "v-else", "v-for", "ng-if", "ng-show", "x-data", "x-show",
    ];

    // 跳过的父元素
    pub const SKIP_PARENTS: &[&str] = &[
        "script", "style", "code", "pre", "noscript", "template", "svg", "canvas",
        "frameset", "frame", "noframes", "object", "embed", "base", "map", "xmp",
        "plaintext", "math", "annotation", "datalist", "select", "option",
    ];

    // SEO 相关 meta 字段
    pub const SEO_META_NAMES: &[&str] = &[
        "description", "keywords", "robots", "author", "viewport", "theme-color",
        "application-name", "twitter:label1", "twitter:data1", "twitter:label2",
        "twitter:data2", "news_keywords", "summary", "abstract", "subject",
        "topic", "copyright", "language", "designer", "generator", "owner",
    ];

    pub const SEO_META_PROPERTIES: &[&str] = &[
        "og:title", "og:description", "og:image", "og:url", "twitter:title",
        "twitter:description", "twitter:image", "twitter:card", "og:site_name",
        "og:locale", "product:brand", "article:author", "article:section",
        "article:tag", "book:author", "music:creator", "place:location:latitude",
        "video:director", "profile:username", "product:availability",
        "og:video:tag",
    ];

    pub const SEO_META_ITEMPROPS: &[&str] = &[
        "name", "description", "headline", "author", "articleBody",
        "reviewBody", "recipeInstructions", "text", "caption",
        "alternativeHeadline", "award", "education", "jobTitle", "worksFor",
    ];

    // 排除的 meta（优先于 SEO 列表）
    pub const EXCLUDED_META_NAMES: &[&str] = &[
        "viewport",
        "theme-color",
        "msapplication-TileColor",
        "apple-mobile-web-app-capable",
        "apple-touch-icon",
        "mobile-web-app-capable",
        "application-name",
    ];

    pub const EXCLUDED_META_PROPERTIES: &[&str] = &[
        "og:url", "og:image", "og:image:width", "og:image:height", "og:locale:alternate",
        "og:video", "og:video:width", "og:video:height", "twitter:image",
        "twitter:card", "twitter:site", "twitter:creator",
    ];

    // JSON-LD 可翻译键
    pub const TRANSLATABLE_JSONLD_KEYS: &[&str] = &[
        "name", "description", "headline", "caption", "text", "title", "summary",
        "alternativeHeadline", "alternateName", "reviewBody", "articleBody",
        "about", "abstract", "articleSection", "comment", "backstory",
        "courseDescription", "learningResourceType",
        "slogan", "disambiguatingDescription", "roleDescription", "applicationCategory",
        "contentDescription", "mainContentOfPage", "shortDescription", "genre",
        "author", "creator", "position", "keywords",
    ];

    // JSON-LD 排除键
    pub const JSONLD_EXCLUDE_KEYS: &[&str] = &[
        "duration", "uploadDate", "embedUrl", "contentUrl", "thumbnailUrl", "url",
        "fileFormat", "encodingFormat", "dateCreated", "dateModified", "datePublished",
        "width", "height", "email", "telephone", "addressCountry", "postalCode",
        "addressRegion", "latitude", "longitude", "target", "identifier",
    ];

    /// 键名包含这些片段的 JSON-LD 字段视为技术字段
    pub const JSONLD_TECHNICAL_FRAGMENTS: &[&str] = &["url", "date", "time", "type"];

    // 不翻译标记
    pub const NO_TRANSLATE_CLASSES: &[&str] = &[
        "notranslate", "no-translate", "do-not-translate",
        "translation-skip", "translation-ignore",
    ];

    // 数学容器的类名
    pub const MATH_CLASSES: &[&str] = &["math", "equation", "formula", "katex", "latex"];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "pagelingo.toml",
        ".pagelingo.toml",
        "pagelingo.json",
        "~/.config/pagelingo/config.toml",
        "/etc/pagelingo/config.toml",
    ];
}

/// 语言代码是否有对应的分句配置
pub fn is_supported_profile(code: &str) -> bool {
    constants::SUPPORTED_PROFILES.contains(&code)
}
