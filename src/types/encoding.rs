//! 载荷编码模块
//!
//! 将原始字节按声明的编码解码为 JSON 值，或反向编码

use crate::debug_log;
use crate::error::{DtoError, DtoResult, FieldError};
use serde::{Deserialize, Serialize};

/// 载荷编码类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// application/json
    #[default]
    Json,
    /// application/x-www-form-urlencoded
    UrlEncoded,
}

impl Encoding {
    /// 根据媒体类型选择编码，忽略 `; charset=...` 之类的参数
    pub fn from_media_type(media_type: &str) -> DtoResult<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/json" => Ok(Encoding::Json),
            "application/x-www-form-urlencoded" => Ok(Encoding::UrlEncoded),
            other if other.ends_with("+json") => Ok(Encoding::Json),
            other => Err(crate::dto_error!(
                config,
                format!("不支持的媒体类型: {}", other)
            )),
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Encoding::Json => "application/json",
            Encoding::UrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

/// 将原始字节解码为 JSON 值
pub fn decode_payload(buffer: &[u8], encoding: Encoding) -> DtoResult<serde_json::Value> {
    match encoding {
        Encoding::Json => serde_json::from_slice(buffer).map_err(|e| DtoError::ValidationError {
            errors: vec![FieldError::new(
                "$",
                format!("JSON解析失败 (行 {}, 列 {}): {}", e.line(), e.column(), e),
            )],
        }),
        Encoding::UrlEncoded => decode_form(buffer),
    }
}

/// 将 JSON 值编码为字节
pub fn encode_payload(value: &serde_json::Value, encoding: Encoding) -> DtoResult<Vec<u8>> {
    match encoding {
        Encoding::Json => serde_json::to_vec(value)
            .map_err(|e| crate::dto_error!(serialization, format!("JSON编码失败: {}", e))),
        Encoding::UrlEncoded => encode_form(value),
    }
}

fn decode_form(buffer: &[u8]) -> DtoResult<serde_json::Value> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(buffer).map_err(|e| DtoError::ValidationError {
            errors: vec![FieldError::new("$", format!("表单数据解码失败: {}", e))],
        })?;

    let mut object = serde_json::Map::new();
    for (key, value) in pairs {
        let value = serde_json::Value::String(value);

        // 重复的键聚合为数组
        match object.get_mut(&key) {
            Some(serde_json::Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = serde_json::Value::Array(vec![first, value]);
            }
            None => {
                object.insert(key, value);
            }
        }
    }

    debug_log!("表单载荷解码完成: {} 个字段", object.len());
    Ok(serde_json::Value::Object(object))
}

/// 空值字段不输出，数组展开为重复的键
fn encode_form(value: &serde_json::Value) -> DtoResult<Vec<u8>> {
    let object = value
        .as_object()
        .ok_or_else(|| crate::dto_error!(serialization, "表单编码只支持对象载荷"))?;

    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(object.len());
    for (key, value) in object {
        let items: Vec<&serde_json::Value> = match value {
            serde_json::Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for item in items {
            let text = match item {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Bool(_) | serde_json::Value::Number(_) => item.to_string(),
                _ => {
                    return Err(crate::dto_error!(
                        serialization,
                        format!("字段 {} 无法进行表单编码: 嵌套结构", key)
                    ));
                }
            };
            pairs.push((key.as_str(), text));
        }
    }

    serde_urlencoded::to_string(&pairs)
        .map(String::into_bytes)
        .map_err(|e| crate::dto_error!(serialization, format!("表单编码失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_media_type_parsing() {
        assert_eq!(
            Encoding::from_media_type("application/json; charset=utf-8").unwrap(),
            Encoding::Json
        );
        assert_eq!(
            Encoding::from_media_type("application/vnd.api+json").unwrap(),
            Encoding::Json
        );
        assert_eq!(
            Encoding::from_media_type("application/x-www-form-urlencoded").unwrap(),
            Encoding::UrlEncoded
        );
        assert!(Encoding::from_media_type("text/plain").unwrap_err().is_configuration());
    }

    #[test]
    fn test_malformed_json_is_validation_error() {
        let err = decode_payload(b"{\"name\": ", Encoding::Json).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.field_errors()[0].path, "$");
    }

    #[test]
    fn test_form_decoding() {
        let value = decode_payload(
            b"name=Acme+Corp&tag=a&tag=b&note=%E4%BD%A0",
            Encoding::UrlEncoded,
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"name": "Acme Corp", "tag": ["a", "b"], "note": "你"})
        );
    }

    #[test]
    fn test_form_encoding_rejects_nested_objects() {
        let err = encode_payload(&json!({"owner": {"id": 1}}), Encoding::UrlEncoded).unwrap_err();
        assert!(matches!(err, DtoError::SerializationError { .. }));

        let bytes = encode_payload(&json!({"name": "a b", "worth": 1.5}), Encoding::UrlEncoded)
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("name=a+b"));
        assert!(text.contains("worth=1.5"));
    }

    #[test]
    fn test_form_encoding_skips_nulls_and_repeats_arrays() {
        let bytes = encode_payload(
            &json!({"id": 1, "score": null, "tags": ["a", "b c"], "empty": []}),
            Encoding::UrlEncoded,
        )
        .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("score"));
        assert!(!text.contains("empty"));
        assert!(text.contains("tags=a&tags=b+c"));

        let decoded = decode_payload(text.as_bytes(), Encoding::UrlEncoded).unwrap();
        assert_eq!(decoded, json!({"id": "1", "tags": ["a", "b c"]}));
    }
}
