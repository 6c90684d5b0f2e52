//! # 核心配置类型
//!
//! DTO整形配置：排除、重命名/重定型、附加字段、用途与未知字段策略

use crate::model::{DefaultSpec, FieldType};
use crate::transfer::TransferField;
use crate::types::DataValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 传输类型的用途
///
/// 同一模型在入站（请求体）和出站（响应体）场景下的字段集合可以不同
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purpose {
    /// 出站表示
    #[default]
    Outbound,
    /// 入站载荷，去掉只读字段、主键与关系
    Inbound,
}

/// 未知字段处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnknownFields {
    /// 静默忽略
    #[default]
    Ignore,
    /// 作为验证错误拒绝
    Forbid,
}

/// 字段映射：仅重命名，或重命名并重定型
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMapping {
    Rename(String),
    Retype(String, FieldType),
}

impl FieldMapping {
    /// 映射后的传输字段名
    pub fn target_name(&self) -> &str {
        match self {
            FieldMapping::Rename(name) | FieldMapping::Retype(name, _) => name,
        }
    }

    /// 映射后的字段类型，仅重命名时为 None
    pub fn target_type(&self) -> Option<&FieldType> {
        match self {
            FieldMapping::Rename(_) => None,
            FieldMapping::Retype(_, field_type) => Some(field_type),
        }
    }
}

impl From<&str> for FieldMapping {
    fn from(name: &str) -> Self {
        FieldMapping::Rename(name.to_string())
    }
}

impl From<(&str, FieldType)> for FieldMapping {
    fn from((name, field_type): (&str, FieldType)) -> Self {
        FieldMapping::Retype(name.to_string(), field_type)
    }
}

/// 附加的合成字段，不对应模型上的任何字段
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraField {
    pub name: String,
    pub field_type: FieldType,
    pub default: DefaultSpec,
    pub nullable: bool,
}

impl ExtraField {
    /// 必填附加字段
    pub fn required(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            default: DefaultSpec::Required,
            nullable: false,
        }
    }

    /// 带默认值的附加字段
    pub fn with_default(name: &str, field_type: FieldType, default: impl Into<DataValue>) -> Self {
        let default = default.into();
        Self {
            name: name.to_string(),
            field_type,
            nullable: default.is_null(),
            default: DefaultSpec::Value(default),
        }
    }

    /// 可空附加字段，默认值为 null
    pub fn optional(name: &str, field_type: FieldType) -> Self {
        Self::with_default(name, field_type, DataValue::Null)
    }

    pub fn to_transfer_field(&self) -> TransferField {
        TransferField {
            name: self.name.clone(),
            field_type: self.field_type.clone(),
            nullable: self.nullable,
            default: self.default.clone(),
            description: None,
        }
    }
}

/// DTO配置
///
/// 不可变值对象，按结构比较；默认值为空配置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DtoConfig {
    /// 排除的模型字段名
    pub exclude: BTreeSet<String>,
    /// 模型字段名到映射的表
    pub field_mapping: BTreeMap<String, FieldMapping>,
    /// 附加字段，保持声明顺序
    pub fields: Vec<ExtraField>,
    /// 用途标记
    pub purpose: Purpose,
    /// 未知字段策略
    pub unknown_fields: UnknownFields,
}

impl DtoConfig {
    /// 创建配置构建器
    pub fn builder() -> super::DtoConfigBuilder {
        super::DtoConfigBuilder::new()
    }

    /// 是否为空配置（不整形任何字段）
    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.field_mapping.is_empty() && self.fields.is_empty()
    }

    /// 返回替换了用途的副本
    pub fn with_purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// 附加字段名集合
    pub fn extra_field_names(&self) -> BTreeSet<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}
