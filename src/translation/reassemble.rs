//! 译文重组
//!
//! 占位符文档的逆操作：把文本节点、属性、meta content 与 JSON-LD 字段中的
//! 第一句标识符替换回对应块的文本（已翻译或原文）。

use indexmap::IndexMap;
use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::{
    elements_in_order, get_node_attr, get_node_name, get_parent_node, get_text, get_text_content,
    html_to_dom, serialize_document, set_node_attr, set_text, text_nodes_in_order,
};
use crate::parsers::jsonld;
use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::addressing::{parse_unit_id, BlockId, UnitId};
use crate::translation::record::FlatSummary;

/// 重组统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub replaced: usize,
    /// 找到占位符但没有对应块
    pub missing: usize,
}

/// 摘要中每块的最终文本
pub fn block_texts(summary: &FlatSummary) -> IndexMap<BlockId, String> {
    summary
        .blocks
        .iter()
        .map(|(id, block)| (*id, block.text.clone()))
        .collect()
}

/// 占位符（某块的第一句标识符）对应的块
fn placeholder_block(value: &str) -> Option<BlockId> {
    match parse_unit_id(value.trim()) {
        Ok(UnitId::Sentence(id)) if id.index == 1 => Some(id.block),
        _ => None,
    }
}

struct Reassembler<'a> {
    blocks: &'a IndexMap<BlockId, String>,
    stats: ReassemblyStats,
}

impl Reassembler<'_> {
    fn lookup(&mut self, value: &str) -> Option<&str> {
        let block = placeholder_block(value)?;
        match self.blocks.get(&block) {
            Some(text) => {
                self.stats.replaced += 1;
                Some(text.as_str())
            }
            None => {
                self.stats.missing += 1;
                tracing::warn!("占位符 {} 没有对应的块", value.trim());
                None
            }
        }
    }

    fn text_node(&mut self, node: &Handle) {
        let in_script = get_parent_node(node)
            .map(|parent| matches!(get_node_name(&parent), Some("script" | "style")))
            .unwrap_or(false);
        if in_script {
            return;
        }
        let Some(raw) = get_text(node) else { return };
        let Some(text) = self.lookup(&raw).map(str::to_string) else { return };

        let start = raw.len() - raw.trim_start().len();
        let end = raw.trim_end().len();
        set_text(node, &format!("{}{}{}", &raw[..start], text, &raw[end..]));
    }

    fn attributes(&mut self, element: &Handle) {
        let is_meta = get_node_name(element) == Some("meta");
        let names = constants::TRANSLATABLE_ATTRS
            .iter()
            .copied()
            .chain(is_meta.then_some("content"));

        for name in names {
            let Some(value) = get_node_attr(element, name) else { continue };
            if let Some(text) = self.lookup(&value).map(str::to_string) {
                set_node_attr(element, name, Some(text));
            }
        }
    }

    fn jsonld_script(&mut self, element: &Handle) {
        let source = get_text_content(element);
        let Ok(mut value) = jsonld::parse(&source) else { return };

        let fields = jsonld::string_fields(&value);
        let mut changed = false;
        for field in fields {
            if let Some(text) = self.lookup(&field.value).map(str::to_string) {
                changed |= jsonld::set_string(&mut value, &field.pointer, &text);
            }
        }
        if !changed {
            return;
        }

        match jsonld::to_pretty(&value) {
            Ok(pretty) => {
                let children = element.children.borrow();
                let mut texts = children.iter().filter(|c| matches!(c.data, NodeData::Text { .. }));
                if let Some(first) = texts.next() {
                    set_text(first, &pretty);
                }
                for rest in texts {
                    set_text(rest, "");
                }
            }
            Err(e) => tracing::warn!("JSON-LD 序列化失败: {}", e),
        }
    }
}

/// 把占位符文档重组为最终文档
pub fn reassemble(
    placeholder_html: &[u8],
    encoding: &str,
    blocks: &IndexMap<BlockId, String>,
) -> TranslationResult<(Vec<u8>, ReassemblyStats)> {
    let dom = html_to_dom(placeholder_html, encoding)
        .map_err(|e| TranslationError::ParseError(format!("HTML 解析失败: {}", e)))?;

    let mut reassembler = Reassembler { blocks, stats: ReassemblyStats::default() };

    for node in text_nodes_in_order(&dom.document) {
        reassembler.text_node(&node);
    }

    for element in elements_in_order(&dom.document) {
        reassembler.attributes(&element);

        let is_jsonld = get_node_name(&element) == Some("script")
            && get_node_attr(&element, "type")
                .map(|t| t.trim().eq_ignore_ascii_case(jsonld::JSONLD_MIME))
                .unwrap_or(false);
        if is_jsonld {
            reassembler.jsonld_script(&element);
        }
    }

    let output = serialize_document(&dom.document, encoding)
        .map_err(|e| TranslationError::SerializationError(format!("HTML 序列化失败: {}", e)))?;

    tracing::info!(
        "重组完成: 替换 {} 处，缺失 {} 处",
        reassembler.stats.replaced,
        reassembler.stats.missing
    );
    Ok((output, reassembler.stats))
}
