//! 文档改写器
//!
//! 按固定顺序遍历文档，对每个文本单元分类、分句，并把内容替换为第一句的标识符：
//!
//! 1. 文本节点（深度优先的文档顺序）
//! 2. 可翻译属性（元素按文档顺序，属性按列表顺序）
//! 3. `<meta>` 字段
//! 4. 文档 `<title>`
//! 5. JSON-LD 脚本（递归，按键顺序）
//!
//! 遍历顺序决定块编号。分析阶段可以并行，标识符分配与 DOM 写入始终是顺序的。

use std::sync::Arc;

use markup5ever_rcdom::{Handle, NodeData, RcDom};
use rayon::prelude::*;
use serde_json::Value;

use super::addressing::{BlockCounter, BlockId};
use super::filters::{
    self, ClassifierStats, ElementFacts, MetaField, TextUnit, UnitOrigin,
};
use super::segmenter::{self, BlockPlan, ProfileRegistry, SegmentationProfile, SegmentedBlock};
use crate::parsers::html::{
    ancestor_elements, document_path, elements_in_order, get_node_attr, get_node_name,
    get_text, get_text_content, html_to_dom, serialize_document, set_node_attr, set_text,
    text_nodes_in_order,
};
use crate::parsers::jsonld;
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::record::{AddressedRecord, BlockRecord, Origin};

/// 改写器配置
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 文档主语言，决定默认分句配置
    pub primary_lang: String,
    /// 是否在线程池上并行分析块
    pub parallel_segmentation: bool,
    /// 输入与输出文档的字符编码
    pub document_encoding: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            primary_lang: constants::DEFAULT_PRIMARY_LANG.to_string(),
            parallel_segmentation: false,
            document_encoding: "utf-8".to_string(),
        }
    }
}

impl From<&TranslationConfig> for CollectorConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            primary_lang: config.primary_lang.clone(),
            parallel_segmentation: config.parallel_segmentation,
            document_encoding: config.document_encoding.clone(),
        }
    }
}

/// 提取统计
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub classifier: ClassifierStats,
    pub blocks: usize,
    pub sentences: usize,
    pub words: usize,
    /// 分句前因代码片段被丢弃的单元
    pub code_fragments: usize,
    /// 配置未产生句子的单元
    pub empty_segmentations: usize,
    pub jsonld_scripts: usize,
    pub jsonld_failures: usize,
}

/// 一次提取的结果
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: AddressedRecord,
    /// 占位符文档（已按输入编码序列化）
    pub placeholder_html: Vec<u8>,
    pub stats: CollectionStats,
}

/// 占位符写入位置
enum Target {
    TextNode(Handle),
    Attribute(Handle, &'static str),
    MetaContent(Handle),
    Title(Handle),
    Jsonld { script: usize, pointer: String },
}

/// 通过分类的单元
struct Candidate {
    target: Target,
    origin: Origin,
    text: String,
}

/// 已解析的 JSON-LD 脚本
struct JsonldScript {
    node: Handle,
    value: Value,
    changed: bool,
}

/// 文档改写器
pub struct TextCollector {
    config: CollectorConfig,
    registry: Arc<ProfileRegistry>,
    stats: CollectionStats,
}

impl TextCollector {
    pub fn new(config: CollectorConfig, registry: Arc<ProfileRegistry>) -> Self {
        Self { config, registry, stats: CollectionStats::default() }
    }

    /// 使用内置分句配置
    pub fn with_config(config: CollectorConfig) -> Self {
        Self::new(config, Arc::new(ProfileRegistry::default()))
    }

    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CollectionStats::default();
    }

    /// 解析、改写并序列化文档
    pub fn extract(&mut self, html: &[u8]) -> TranslationResult<Extraction> {
        let dom = html_to_dom(html, &self.config.document_encoding)
            .map_err(|e| TranslationError::ParseError(format!("HTML 解析失败: {}", e)))?;

        let record = self.rewrite(&dom)?;

        let placeholder_html = serialize_document(&dom.document, &self.config.document_encoding)
            .map_err(|e| TranslationError::SerializationError(format!("HTML 序列化失败: {}", e)))?;

        Ok(Extraction { record, placeholder_html, stats: self.stats.clone() })
    }

    /// 原位改写 DOM，返回寻址记录
    pub fn rewrite(&mut self, dom: &RcDom) -> TranslationResult<AddressedRecord> {
        self.reset_stats();
        let default_profile = self.registry.get(&self.config.primary_lang)?;

        let mut scripts = Vec::new();
        let candidates = self.collect_candidates(&dom.document, &mut scripts);
        tracing::info!(
            "分类完成: {} 个单元，接受 {}，拒绝 {}",
            self.stats.classifier.evaluated,
            self.stats.classifier.accepted,
            self.stats.classifier.rejected
        );

        let (plans, planned) = self.plan(&candidates, &default_profile)?;
        let segmented = self.analyze(&plans);

        let mut record = AddressedRecord::default();
        for (candidate_index, block) in planned.into_iter().zip(segmented) {
            let Some(block) = block else {
                self.stats.empty_segmentations += 1;
                continue;
            };
            let candidate = &candidates[candidate_index];
            self.apply(candidate, &block, &mut scripts, &mut record)?;
        }

        for script in scripts.iter().filter(|s| s.changed) {
            let pretty = jsonld::to_pretty(&script.value)?;
            replace_children_text(&script.node, &pretty);
        }

        tracing::info!(
            "提取完成: {} 个块，{} 句，{} 词",
            self.stats.blocks,
            self.stats.sentences,
            self.stats.words
        );
        Ok(record)
    }

    // ------------------------------------------------------------------------
    // 收集
    // ------------------------------------------------------------------------

    fn collect_candidates(&mut self, document: &Handle, scripts: &mut Vec<JsonldScript>) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let elements = elements_in_order(document);

        self.collect_text_nodes(document, &mut candidates);
        self.collect_attributes(&elements, &mut candidates);
        self.collect_meta(&elements, &mut candidates);
        self.collect_title(&elements, &mut candidates);
        self.collect_jsonld(&elements, scripts, &mut candidates);

        candidates
    }

    fn accept(&mut self, unit: &TextUnit) -> bool {
        let decision = filters::classify(unit);
        self.stats.classifier.record(&decision);
        tracing::debug!("{} [{}] -> {:?}", unit.path, preview(&unit.text), decision);
        decision.is_accept()
    }

    fn collect_text_nodes(&mut self, document: &Handle, candidates: &mut Vec<Candidate>) {
        for node in text_nodes_in_order(document) {
            let Some(raw) = get_text(&node) else { continue };
            if raw.trim().is_empty() {
                continue;
            }
            let chain = ancestor_elements(&node);
            let Some(owner) = chain.first() else { continue };
            let Some(tag) = get_node_name(owner).map(str::to_string) else { continue };
            // 标题与 JSON-LD 由各自的收集步骤处理，脚本与样式在重组时也不回填
            if matches!(tag.as_str(), "title" | "script" | "style") {
                continue;
            }

            let unit = TextUnit::new(UnitOrigin::NodeText { tag: tag.clone() }, raw.as_str())
                .with_ancestors(facts(&chain))
                .with_context_text(get_text_content(owner))
                .with_path(document_path(owner));

            if self.accept(&unit) {
                candidates.push(Candidate {
                    target: Target::TextNode(node.clone()),
                    origin: Origin::Tag(tag),
                    text: raw.trim().to_string(),
                });
            }
        }
    }

    fn collect_attributes(&mut self, elements: &[Handle], candidates: &mut Vec<Candidate>) {
        for element in elements {
            for &attr in constants::TRANSLATABLE_ATTRS {
                let Some(value) = get_node_attr(element, attr) else { continue };
                if value.trim().is_empty() {
                    continue;
                }

                let unit = TextUnit::new(UnitOrigin::Attribute { name: attr.to_string() }, value.as_str())
                    .with_ancestors(facts_from(element))
                    .with_path(format!("{}@{}", document_path(element), attr));

                if self.accept(&unit) {
                    candidates.push(Candidate {
                        target: Target::Attribute(element.clone(), attr),
                        origin: Origin::Attr(attr.to_string()),
                        text: value.trim().to_string(),
                    });
                }
            }
        }
    }

    fn collect_meta(&mut self, elements: &[Handle], candidates: &mut Vec<Candidate>) {
        for element in elements.iter().filter(|e| get_node_name(e) == Some("meta")) {
            let Some(content) = get_node_attr(element, "content") else { continue };
            if content.trim().is_empty() {
                continue;
            }

            let field = MetaField {
                name: get_node_attr(element, "name").map(|v| v.to_lowercase()),
                property: get_node_attr(element, "property").map(|v| v.to_lowercase()),
                itemprop: get_node_attr(element, "itemprop"),
            };
            let Some(key) = field.key().map(str::to_string) else { continue };

            let unit = TextUnit::new(UnitOrigin::Meta(field), content.as_str())
                .with_ancestors(facts_from(element))
                .with_path(format!("{}[{}]", document_path(element), key));

            if self.accept(&unit) {
                candidates.push(Candidate {
                    target: Target::MetaContent(element.clone()),
                    origin: Origin::Meta(key),
                    text: content.trim().to_string(),
                });
            }
        }
    }

    fn collect_title(&mut self, elements: &[Handle], candidates: &mut Vec<Candidate>) {
        let Some(title) = elements.iter().find(|e| get_node_name(e) == Some("title")) else {
            return;
        };
        // 只处理单一文本子节点的标题
        let texts: Vec<Handle> = title
            .children
            .borrow()
            .iter()
            .filter(|c| matches!(c.data, NodeData::Text { .. }))
            .cloned()
            .collect();
        let [node] = texts.as_slice() else { return };
        let Some(raw) = get_text(node) else { return };
        if raw.trim().is_empty() {
            return;
        }

        let unit = TextUnit::new(UnitOrigin::DocumentTitle, raw.as_str())
            .with_ancestors(facts_from(title))
            .with_path(document_path(title));

        if self.accept(&unit) {
            candidates.push(Candidate {
                target: Target::Title(node.clone()),
                origin: Origin::Tag("title".to_string()),
                text: raw.trim().to_string(),
            });
        }
    }

    fn collect_jsonld(
        &mut self,
        elements: &[Handle],
        scripts: &mut Vec<JsonldScript>,
        candidates: &mut Vec<Candidate>,
    ) {
        let script_nodes = elements.iter().filter(|e| {
            get_node_name(e) == Some("script")
                && get_node_attr(e, "type")
                    .map(|t| t.trim().eq_ignore_ascii_case(jsonld::JSONLD_MIME))
                    .unwrap_or(false)
        });

        for node in script_nodes {
            self.stats.jsonld_scripts += 1;
            let source = get_text_content(node);
            let value = match jsonld::parse(&source) {
                Ok(value) => value,
                Err(e) => {
                    self.stats.jsonld_failures += 1;
                    tracing::warn!("JSON-LD 解析失败，跳过该脚本: {}", e);
                    continue;
                }
            };

            let index = scripts.len();
            let ancestors = facts_from(node);
            let base_path = document_path(node);

            for field in jsonld::string_fields(&value) {
                if field.value.trim().is_empty() {
                    continue;
                }
                let unit = TextUnit::new(
                    UnitOrigin::StructuredData { key: field.key.clone() },
                    field.value.as_str(),
                )
                .with_ancestors(ancestors.clone())
                .with_path(format!("{}#{}", base_path, field.pointer));

                if self.accept(&unit) {
                    candidates.push(Candidate {
                        target: Target::Jsonld { script: index, pointer: field.pointer },
                        origin: Origin::Jsonld(field.key),
                        text: field.value.trim().to_string(),
                    });
                }
            }

            scripts.push(JsonldScript { node: node.clone(), value, changed: false });
        }
    }

    // ------------------------------------------------------------------------
    // 分句
    // ------------------------------------------------------------------------

    /// 顺序准备：代码检查、分配块编号、解析配置
    fn plan(
        &mut self,
        candidates: &[Candidate],
        default_profile: &Arc<dyn SegmentationProfile>,
    ) -> TranslationResult<(Vec<BlockPlan>, Vec<usize>)> {
        let mut counter = BlockCounter::default();
        let mut plans = Vec::new();
        let mut planned = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            match segmenter::plan_block(&self.registry, default_profile, counter.peek(), &candidate.text)? {
                Some(plan) => {
                    counter.allocate();
                    plans.push(plan);
                    planned.push(index);
                }
                None => self.stats.code_fragments += 1,
            }
        }

        Ok((plans, planned))
    }

    fn analyze(&self, plans: &[BlockPlan]) -> Vec<Option<SegmentedBlock>> {
        if self.config.parallel_segmentation {
            tracing::debug!("并行分析 {} 个块", plans.len());
            plans.par_iter().map(segmenter::analyze_block).collect()
        } else {
            plans.iter().map(segmenter::analyze_block).collect()
        }
    }

    // ------------------------------------------------------------------------
    // 写入
    // ------------------------------------------------------------------------

    fn apply(
        &mut self,
        candidate: &Candidate,
        block: &SegmentedBlock,
        scripts: &mut [JsonldScript],
        record: &mut AddressedRecord,
    ) -> TranslationResult<()> {
        let Some(placeholder) = block.first_sentence_id().map(|id| id.to_string()) else {
            return Ok(());
        };

        match &candidate.target {
            Target::TextNode(node) | Target::Title(node) => {
                let raw = get_text(node).unwrap_or_default();
                set_text(node, &wrap_like(&raw, &placeholder));
            }
            Target::Attribute(element, attr) => {
                set_node_attr(element, attr, Some(placeholder.clone()));
            }
            Target::MetaContent(element) => {
                set_node_attr(element, "content", Some(placeholder.clone()));
            }
            Target::Jsonld { script, pointer } => {
                let script = scripts.get_mut(*script).ok_or_else(|| {
                    TranslationError::InternalError(format!("JSON-LD 脚本索引越界: {}", script))
                })?;
                if jsonld::set_string(&mut script.value, pointer, &placeholder) {
                    script.changed = true;
                }
            }
        }

        record.insert(
            block.block_id,
            BlockRecord { origin: candidate.origin.clone(), tokens: block.tokens.clone() },
        )?;

        self.stats.blocks += 1;
        self.stats.sentences += block.sentences.len();
        self.stats.words += block.flat.len() - block.sentences.len();
        tracing::debug!("{} <- {} ({})", block.block_id, candidate.origin.kind(), candidate.origin.key());
        Ok(())
    }
}

/// 保留原文首尾空白，中间替换为占位符
fn wrap_like(raw: &str, placeholder: &str) -> String {
    let trimmed_start = raw.trim_start();
    let leading = &raw[..raw.len() - trimmed_start.len()];
    let trailing = &trimmed_start[trimmed_start.trim_end().len()..];
    format!("{}{}{}", leading, placeholder, trailing)
}

/// 用单个文本节点替换元素内全部文本子节点的内容
fn replace_children_text(node: &Handle, text: &str) {
    let children = node.children.borrow();
    let mut texts = children.iter().filter(|c| matches!(c.data, NodeData::Text { .. }));
    if let Some(first) = texts.next() {
        set_text(first, text);
    }
    for rest in texts {
        set_text(rest, "");
    }
}

fn facts(chain: &[Handle]) -> Vec<ElementFacts> {
    chain.iter().filter_map(ElementFacts::from_handle).collect()
}

/// 元素自身及其祖先
fn facts_from(element: &Handle) -> Vec<ElementFacts> {
    let mut chain = vec![element.clone()];
    chain.extend(ancestor_elements(element));
    facts(&chain)
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > 40 {
        format!("{}…", trimmed.chars().take(40).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

/// 便利函数：使用默认配置提取
pub fn extract_document(html: &[u8], config: CollectorConfig) -> TranslationResult<Extraction> {
    TextCollector::with_config(config).extract(html)
}

/// 便利函数：返回指定块的来源
pub fn block_origin(record: &AddressedRecord, id: BlockId) -> Option<&Origin> {
    record.blocks.get(&id).map(|b| &b.origin)
}
