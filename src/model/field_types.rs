//! 字段类型定义模块
//!
//! 定义模型字段的类型、约束与宽松类型转换

use crate::error::FieldError;
use crate::i18n::{t, tf};
use crate::transfer::TransferType;
use crate::types::DataValue;
use base64::Engine;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rat_logger::debug;
use regex::Regex;
use std::sync::Arc;

/// 已编译的正则表达式，按模式字符串缓存
static REGEX_CACHE: Lazy<DashMap<String, Regex>> = Lazy::new(DashMap::new);

fn cached_regex(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(regex) = REGEX_CACHE.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern)?;
    REGEX_CACHE.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// 字段类型枚举
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// 字符串类型
    String {
        max_length: Option<usize>,
        min_length: Option<usize>,
        regex: Option<String>,
    },
    /// 整数类型
    Integer {
        min_value: Option<i64>,
        max_value: Option<i64>,
    },
    /// 浮点数类型
    Float {
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
    /// 布尔类型
    Boolean,
    /// 日期时间类型
    DateTime,
    /// UUID类型
    Uuid,
    /// JSON类型，接受任意值
    Json,
    /// 二进制类型（线上格式为 base64 字符串）
    Binary,
    /// 数组类型
    Array {
        item_type: Box<FieldType>,
        max_items: Option<usize>,
        min_items: Option<usize>,
    },
    /// 嵌套的传输类型
    Model(Arc<TransferType>),
    /// 尚未解析的前向引用，值为被引用模型的名称
    ForwardRef(String),
}

impl FieldType {
    /// 无约束的字符串类型
    pub fn string() -> Self {
        FieldType::String {
            max_length: None,
            min_length: None,
            regex: None,
        }
    }

    /// 无约束的整数类型
    pub fn integer() -> Self {
        FieldType::Integer {
            min_value: None,
            max_value: None,
        }
    }

    /// 无约束的浮点数类型
    pub fn float() -> Self {
        FieldType::Float {
            min_value: None,
            max_value: None,
        }
    }

    /// 无约束的数组类型
    pub fn array(item_type: FieldType) -> Self {
        FieldType::Array {
            item_type: Box::new(item_type),
            max_items: None,
            min_items: None,
        }
    }

    /// 类型的可读名称，用于错误消息与日志
    pub fn type_label(&self) -> String {
        match self {
            FieldType::String { .. } => "string".to_string(),
            FieldType::Integer { .. } => "integer".to_string(),
            FieldType::Float { .. } => "float".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::DateTime => "datetime".to_string(),
            FieldType::Uuid => "uuid".to_string(),
            FieldType::Json => "json".to_string(),
            FieldType::Binary => "binary".to_string(),
            FieldType::Array { item_type, .. } => format!("array<{}>", item_type.type_label()),
            FieldType::Model(transfer) => transfer.name().to_string(),
            FieldType::ForwardRef(name) => format!("'{}'", name),
        }
    }

    /// 是否包含未解析的前向引用
    pub fn has_forward_ref(&self) -> bool {
        match self {
            FieldType::ForwardRef(_) => true,
            FieldType::Array { item_type, .. } => item_type.has_forward_ref(),
            _ => false,
        }
    }

    /// 去掉所有数值/长度/正则约束，保留结构
    pub fn without_constraints(&self) -> FieldType {
        match self {
            FieldType::String { .. } => FieldType::string(),
            FieldType::Integer { .. } => FieldType::integer(),
            FieldType::Float { .. } => FieldType::float(),
            FieldType::Array { item_type, .. } => FieldType::array(item_type.without_constraints()),
            other => other.clone(),
        }
    }

    /// 将值转换为本类型，并检查约束
    ///
    /// 转换是宽松的：可无损转换的值（如整数字符串、整数值的浮点数）会被接受
    pub fn coerce(&self, value: &DataValue, path: &str) -> Result<DataValue, Vec<FieldError>> {
        match self {
            FieldType::String {
                max_length,
                min_length,
                regex,
            } => {
                let s = match value {
                    DataValue::String(s) => s,
                    other => return Err(vec![mismatch(path, self, other)]),
                };
                let length = s.chars().count();
                if let Some(max_len) = max_length {
                    if length > *max_len {
                        return Err(vec![FieldError::new(
                            path,
                            format!("字符串长度不能超过{}", max_len),
                        )]);
                    }
                }
                if let Some(min_len) = min_length {
                    if length < *min_len {
                        return Err(vec![FieldError::new(
                            path,
                            format!("字符串长度不能少于{}", min_len),
                        )]);
                    }
                }
                if let Some(pattern) = regex {
                    let regex = cached_regex(pattern).map_err(|e| {
                        let detail = e.to_string();
                        vec![FieldError::new(
                            path,
                            tf("error.invalid_pattern", &[("detail", detail.as_str())]),
                        )]
                    })?;
                    if !regex.is_match(s) {
                        return Err(vec![FieldError::new(
                            path,
                            tf("error.pattern_mismatch", &[("pattern", pattern.as_str())]),
                        )]);
                    }
                }
                Ok(DataValue::String(s.clone()))
            }
            FieldType::Integer {
                min_value,
                max_value,
            } => {
                let i = match value {
                    DataValue::Int(i) => *i,
                    DataValue::UInt(u) => i64::try_from(*u)
                        .map_err(|_| vec![FieldError::new(path, "整数超出范围")])?,
                    DataValue::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                        if *f < i64::MIN as f64 || *f > i64::MAX as f64 {
                            return Err(vec![FieldError::new(path, "整数超出范围")]);
                        }
                        *f as i64
                    }
                    DataValue::String(s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| vec![mismatch(path, self, value)])?,
                    other => return Err(vec![mismatch(path, self, other)]),
                };
                if let Some(min_val) = min_value {
                    if i < *min_val {
                        return Err(vec![FieldError::new(
                            path,
                            format!("整数值不能小于{}", min_val),
                        )]);
                    }
                }
                if let Some(max_val) = max_value {
                    if i > *max_val {
                        return Err(vec![FieldError::new(
                            path,
                            format!("整数值不能大于{}", max_val),
                        )]);
                    }
                }
                Ok(DataValue::Int(i))
            }
            FieldType::Float {
                min_value,
                max_value,
            } => {
                let f = match value {
                    DataValue::Float(f) => *f,
                    DataValue::Int(i) => *i as f64,
                    DataValue::UInt(u) => *u as f64,
                    DataValue::String(s) => s
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| vec![mismatch(path, self, value)])?,
                    other => return Err(vec![mismatch(path, self, other)]),
                };
                if let Some(min_val) = min_value {
                    if f < *min_val {
                        return Err(vec![FieldError::new(
                            path,
                            format!("浮点数值不能小于{}", min_val),
                        )]);
                    }
                }
                if let Some(max_val) = max_value {
                    if f > *max_val {
                        return Err(vec![FieldError::new(
                            path,
                            format!("浮点数值不能大于{}", max_val),
                        )]);
                    }
                }
                Ok(DataValue::Float(f))
            }
            FieldType::Boolean => match value {
                DataValue::Bool(b) => Ok(DataValue::Bool(*b)),
                DataValue::Int(0) => Ok(DataValue::Bool(false)),
                DataValue::Int(1) => Ok(DataValue::Bool(true)),
                DataValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(DataValue::Bool(true)),
                    "false" | "0" => Ok(DataValue::Bool(false)),
                    _ => Err(vec![mismatch(path, self, value)]),
                },
                other => Err(vec![mismatch(path, self, other)]),
            },
            FieldType::DateTime => match value {
                DataValue::DateTime(dt) => Ok(DataValue::DateTime(*dt)),
                DataValue::String(s) => chrono::DateTime::parse_from_rfc3339(s.trim())
                    .map(DataValue::DateTime)
                    .map_err(|e| {
                        vec![FieldError::new(path, format!("无效的RFC3339日期时间: {}", e))]
                    }),
                other => Err(vec![mismatch(path, self, other)]),
            },
            FieldType::Uuid => match value {
                DataValue::Uuid(u) => Ok(DataValue::Uuid(*u)),
                DataValue::String(s) => uuid::Uuid::parse_str(s.trim())
                    .map(DataValue::Uuid)
                    .map_err(|_| {
                        debug!("❌ UUID字段验证失败 - 无效的UUID格式: '{}' (字段: {})", s, path);
                        vec![FieldError::new(path, format!("无效的UUID格式: '{}'", s))]
                    }),
                other => Err(vec![mismatch(path, self, other)]),
            },
            FieldType::Json => Ok(value.clone()),
            FieldType::Binary => match value {
                DataValue::Bytes(bytes) => Ok(DataValue::Bytes(bytes.clone())),
                DataValue::String(s) => base64::engine::general_purpose::STANDARD
                    .decode(s.trim())
                    .map(DataValue::Bytes)
                    .map_err(|e| vec![FieldError::new(path, format!("无效的Base64数据: {}", e))]),
                // serde 把 Vec<u8> 序列化为整数数组
                DataValue::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        DataValue::Int(i) => u8::try_from(*i).ok(),
                        DataValue::UInt(u) => u8::try_from(*u).ok(),
                        _ => None,
                    })
                    .collect::<Option<Vec<u8>>>()
                    .map(DataValue::Bytes)
                    .ok_or_else(|| vec![mismatch(path, self, value)]),
                other => Err(vec![mismatch(path, self, other)]),
            },
            FieldType::Array {
                item_type,
                max_items,
                min_items,
            } => {
                let parsed;
                let items = match value {
                    DataValue::Array(items) => items,
                    DataValue::String(json_str) => {
                        // JSON字符串格式的数组
                        match serde_json::from_str::<serde_json::Value>(json_str) {
                            Ok(json @ serde_json::Value::Array(_)) => {
                                parsed = DataValue::from_json(json);
                                match &parsed {
                                    DataValue::Array(items) => items,
                                    _ => return Err(vec![mismatch(path, self, value)]),
                                }
                            }
                            _ => return Err(vec![mismatch(path, self, value)]),
                        }
                    }
                    other => return Err(vec![mismatch(path, self, other)]),
                };
                if let Some(max_items) = max_items {
                    if items.len() > *max_items {
                        return Err(vec![FieldError::new(
                            path,
                            format!("数组元素数量不能超过{}", max_items),
                        )]);
                    }
                }
                if let Some(min_items) = min_items {
                    if items.len() < *min_items {
                        return Err(vec![FieldError::new(
                            path,
                            format!("数组元素数量不能少于{}", min_items),
                        )]);
                    }
                }

                let mut coerced = Vec::with_capacity(items.len());
                let mut errors = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    match item_type.coerce(item, &format!("{}.{}", path, index)) {
                        Ok(v) => coerced.push(v),
                        Err(mut item_errors) => errors.append(&mut item_errors),
                    }
                }
                if errors.is_empty() {
                    Ok(DataValue::Array(coerced))
                } else {
                    Err(errors)
                }
            }
            FieldType::Model(transfer) => match value {
                DataValue::Object(map) => transfer
                    .coerce_values(map.clone())
                    .map(DataValue::Object)
                    .map_err(|errors| errors.into_iter().map(|e| e.nested(path)).collect()),
                other => Err(vec![mismatch(path, self, other)]),
            },
            // 前向引用由被引用模型自身负责验证
            FieldType::ForwardRef(_) => Ok(value.clone()),
        }
    }
}

fn mismatch(path: &str, expected: &FieldType, actual: &DataValue) -> FieldError {
    let label = expected.type_label();
    FieldError::new(
        path,
        tf(
            "error.type_mismatch",
            &[("expected", label.as_str()), ("actual", actual.type_name())],
        ),
    )
}

/// 字段定义
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// 字段类型
    pub field_type: FieldType,
    /// 是否必填
    pub required: bool,
    /// 默认值
    pub default: Option<DataValue>,
    /// 是否只读（不出现在入站载荷中）
    pub read_only: bool,
    /// 字段描述
    pub description: Option<String>,
}

impl FieldDefinition {
    /// 创建新的字段定义
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            read_only: false,
            description: None,
        }
    }

    /// 设置为必填字段
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 设置默认值
    pub fn default_value(mut self, value: impl Into<DataValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// 设置为只读字段
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// 设置字段描述
    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }
}

/// 字段形态：单值或序列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Singleton,
    Sequence,
}

/// 字段默认值规格
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultSpec {
    /// 必填，无默认值
    Required,
    /// 缺失时使用的值
    Value(DataValue),
}

impl DefaultSpec {
    pub fn is_required(&self) -> bool {
        matches!(self, DefaultSpec::Required)
    }
}

/// 模型字段描述符
///
/// 由模型族的反射接口产生，是字段整形的输入
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// 字段名
    pub name: String,
    /// 声明类型
    pub outer_type: FieldType,
    /// 去掉一层容器后的类型
    pub inner_type: FieldType,
    /// 字段形态
    pub shape: FieldShape,
    /// 是否可为空
    pub nullable: bool,
    /// 默认值规格
    pub default: DefaultSpec,
    /// 是否只读
    pub read_only: bool,
    /// 字段描述
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// 从字段定义构建描述符
    ///
    /// 非必填且无默认值的字段视为可空，默认值为 null
    pub fn from_definition(name: &str, definition: FieldDefinition) -> Self {
        let (inner_type, shape) = match &definition.field_type {
            FieldType::Array { item_type, .. } => ((**item_type).clone(), FieldShape::Sequence),
            other => (other.clone(), FieldShape::Singleton),
        };
        let (nullable, default) = match (definition.required, definition.default) {
            (_, Some(value)) => (value.is_null(), DefaultSpec::Value(value)),
            (true, None) => (false, DefaultSpec::Required),
            (false, None) => (true, DefaultSpec::Value(DataValue::Null)),
        };
        Self {
            name: name.to_string(),
            outer_type: definition.field_type,
            inner_type,
            shape,
            nullable,
            default,
            read_only: definition.read_only,
            description: definition.description,
        }
    }

    /// 将值转换为字段类型，空值只在可空字段上被接受
    pub fn coerce_value(&self, value: &DataValue, path: &str) -> Result<DataValue, Vec<FieldError>> {
        if value.is_null() {
            if self.nullable {
                return Ok(DataValue::Null);
            }
            return Err(vec![FieldError::new(path, t("error.not_nullable"))]);
        }
        self.outer_type.coerce(value, path)
    }
}
