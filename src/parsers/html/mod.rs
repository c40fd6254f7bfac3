//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作与遍历
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;

pub use dom::{
    ancestor_elements, document_path, elements_in_order, find_nodes, get_node_attr,
    get_node_name, get_parent_node, get_text, get_text_content, html_to_dom, set_node_attr,
    set_text, text_nodes_in_order,
};
pub use serializer::serialize_document;
