//! # 解析器模块
//!
//! - `html` - HTML文档解析、DOM操作与序列化
//! - `jsonld` - 内嵌 JSON-LD 结构化数据的读写

pub mod html;
pub mod jsonld;

pub use html::{html_to_dom, serialize_document};
