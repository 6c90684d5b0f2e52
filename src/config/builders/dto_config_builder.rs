//! # DTO配置构建器模块
//!
//! 提供DTO配置的构建器实现，支持链式调用和严格验证

use crate::config::core::{DtoConfig, ExtraField, FieldMapping, Purpose, UnknownFields};
use crate::error::DtoResult;
use crate::i18n::tf;
use crate::model::FieldType;
use rat_logger::{info, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// DTO配置构建器
#[derive(Debug, Default)]
pub struct DtoConfigBuilder {
    exclude: BTreeSet<String>,
    field_mapping: BTreeMap<String, FieldMapping>,
    fields: Vec<ExtraField>,
    purpose: Option<Purpose>,
    unknown_fields: Option<UnknownFields>,
}

impl DtoConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 排除字段
    pub fn exclude(mut self, name: &str) -> Self {
        self.exclude.insert(name.to_string());
        self
    }

    /// 批量排除字段
    pub fn exclude_all<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.exclude.extend(names.into_iter().map(str::to_string));
        self
    }

    /// 重命名字段
    ///
    /// # 参数
    ///
    /// * `from` - 模型字段名
    /// * `to` - 传输字段名
    pub fn rename(mut self, from: &str, to: &str) -> Self {
        self.field_mapping
            .insert(from.to_string(), FieldMapping::Rename(to.to_string()));
        self
    }

    /// 重命名并重定型字段
    pub fn retype(mut self, from: &str, to: &str, field_type: FieldType) -> Self {
        self.field_mapping.insert(
            from.to_string(),
            FieldMapping::Retype(to.to_string(), field_type),
        );
        self
    }

    /// 添加附加字段
    pub fn field(mut self, field: ExtraField) -> Self {
        self.fields.push(field);
        self
    }

    /// 设置用途
    pub fn purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = Some(purpose);
        self
    }

    /// 设置未知字段策略
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = Some(policy);
        self
    }

    /// 构建配置
    ///
    /// 附加字段重名、映射目标为空或重复时返回 `ConfigurationError`
    pub fn build(self) -> DtoResult<DtoConfig> {
        let mut extra_names = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(crate::dto_error!(config, "附加字段名不能为空"));
            }
            if !extra_names.insert(field.name.as_str()) {
                return Err(crate::dto_error!(
                    config,
                    tf("error.extra_field_collision", &[("field", field.name.as_str())])
                ));
            }
        }

        let mut targets = HashSet::new();
        for (source, mapping) in &self.field_mapping {
            if mapping.target_name().is_empty() {
                return Err(crate::dto_error!(
                    config,
                    format!("字段 '{}' 的映射目标名不能为空", source)
                ));
            }
            // 被排除的字段不参与映射，其目标名不占位
            if self.exclude.contains(source) {
                warn!("字段 '{}' 同时出现在 exclude 与 field_mapping 中，排除优先", source);
                continue;
            }
            if !targets.insert(mapping.target_name()) {
                return Err(crate::dto_error!(
                    config,
                    tf("error.rename_collision", &[("field", mapping.target_name())])
                ));
            }
        }

        let config = DtoConfig {
            exclude: self.exclude,
            field_mapping: self.field_mapping,
            fields: self.fields,
            purpose: self.purpose.unwrap_or_default(),
            unknown_fields: self.unknown_fields.unwrap_or_default(),
        };
        info!(
            "DTO配置构建完成: 排除 {} 个字段, 映射 {} 个字段, 附加 {} 个字段",
            config.exclude.len(),
            config.field_mapping.len(),
            config.fields.len()
        );
        Ok(config)
    }
}
