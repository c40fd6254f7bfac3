//! JSON-LD 结构化数据
//!
//! 解析 `<script type="application/ld+json">` 内容，按键顺序枚举字符串字段，
//! 并通过 JSON Pointer 原位替换字段值。

use serde_json::Value;

pub const JSONLD_MIME: &str = "application/ld+json";

/// 对象中的一个字符串字段
#[derive(Debug, Clone, PartialEq)]
pub struct JsonField {
    /// 所属键名
    pub key: String,
    /// RFC 6901 路径
    pub pointer: String,
    pub value: String,
}

pub fn parse(source: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(source.trim())
}

/// 以两个空格缩进输出，保留键顺序与非 ASCII 字符
pub fn to_pretty(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// 按文档顺序枚举对象中的字符串字段；数组中的裸字符串不属于任何键，不枚举
pub fn string_fields(value: &Value) -> Vec<JsonField> {
    let mut fields = Vec::new();
    collect(value, String::new(), &mut fields);
    fields
}

fn collect(value: &Value, pointer: String, fields: &mut Vec<JsonField>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_pointer = format!("{}/{}", pointer, escape_token(key));
                match child {
                    Value::String(text) => fields.push(JsonField {
                        key: key.clone(),
                        pointer: child_pointer,
                        value: text.clone(),
                    }),
                    Value::Object(_) | Value::Array(_) => collect(child, child_pointer, fields),
                    _ => {}
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect(item, format!("{}/{}", pointer, index), fields);
            }
        }
        _ => {}
    }
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// 替换指定路径上的字符串，路径不存在或不是字符串时返回 false
pub fn set_string(value: &mut Value, pointer: &str, replacement: &str) -> bool {
    match value.pointer_mut(pointer) {
        Some(slot) if slot.is_string() => {
            *slot = Value::String(replacement.to_string());
            true
        }
        _ => false,
    }
}
