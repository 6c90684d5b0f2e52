//! 表结构描述模块
//!
//! 表映射模型的列与关系描述

use crate::types::DataValue;
use serde::{Deserialize, Serialize};

/// 列类型
///
/// 方言相关的类型通过 `Custom` 表示，需要在表适配器上注册字段类型提供者
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    SmallInteger,
    Integer,
    BigInteger,
    Float,
    Double,
    Numeric { precision: u8, scale: u8 },
    String { length: Option<usize> },
    Text,
    Boolean,
    DateTime,
    Date,
    Time,
    Uuid,
    Json,
    LargeBinary,
    /// 枚举列，值为允许的取值
    Enum(Vec<String>),
    /// 数组列
    Array(Box<ColumnType>),
    /// 方言特定类型
    Custom(String),
}

impl ColumnType {
    /// 提供者表中使用的类型键
    pub fn type_key(&self) -> String {
        match self {
            ColumnType::SmallInteger => "small_integer".to_string(),
            ColumnType::Integer => "integer".to_string(),
            ColumnType::BigInteger => "big_integer".to_string(),
            ColumnType::Float => "float".to_string(),
            ColumnType::Double => "double".to_string(),
            ColumnType::Numeric { .. } => "numeric".to_string(),
            ColumnType::String { .. } => "string".to_string(),
            ColumnType::Text => "text".to_string(),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::DateTime => "datetime".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::Uuid => "uuid".to_string(),
            ColumnType::Json => "json".to_string(),
            ColumnType::LargeBinary => "large_binary".to_string(),
            ColumnType::Enum(_) => "enum".to_string(),
            ColumnType::Array(_) => "array".to_string(),
            ColumnType::Custom(name) => name.clone(),
        }
    }
}

/// 列描述
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// 列名（即模型字段名）
    pub name: String,
    /// 列类型
    pub column_type: ColumnType,
    /// 是否可为空
    pub nullable: bool,
    /// 列级默认值
    pub default: Option<DataValue>,
    /// 是否主键
    pub primary_key: bool,
}

impl ColumnDescriptor {
    /// 创建不可空、无默认值的列
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: false,
            default: None,
            primary_key: false,
        }
    }

    /// 设置为可空列
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// 设置列默认值
    pub fn default_value(mut self, value: impl Into<DataValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// 设置为主键
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// 关系描述
///
/// 目标按模型名称引用，在构建传输类型时解析
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// 关系字段名
    pub name: String,
    /// 目标模型名称
    pub target: String,
    /// 是否一对多
    pub many: bool,
}

impl RelationDescriptor {
    /// 指向单个目标的关系
    pub fn one(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            many: false,
        }
    }

    /// 指向目标集合的关系
    pub fn many(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            many: true,
        }
    }
}
