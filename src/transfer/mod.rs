//! 传输类型模块
//!
//! 运行时合成的传输结构：有序字段定义、验证与实例

use crate::config::UnknownFields;
use crate::debug_log;
use crate::error::{DtoError, DtoResult, FieldError};
use crate::i18n::{t, tf};
use crate::model::{DefaultSpec, FieldType};
use crate::types::{DataValue, Encoding, ValueMap, decode_payload, encode_payload};
use std::collections::HashSet;
use std::sync::Arc;

/// 传输字段定义
#[derive(Debug, Clone, PartialEq)]
pub struct TransferField {
    /// 传输侧字段名
    pub name: String,
    /// 字段类型
    pub field_type: FieldType,
    /// 是否可为空
    pub nullable: bool,
    /// 默认值规格
    pub default: DefaultSpec,
    /// 字段描述
    pub description: Option<String>,
}

impl TransferField {
    /// 创建必填、不可空的字段
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            nullable: false,
            default: DefaultSpec::Required,
            description: None,
        }
    }

    /// 设置为可空
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// 设置默认值
    pub fn default_value(mut self, value: impl Into<DataValue>) -> Self {
        self.default = DefaultSpec::Value(value.into());
        self
    }

    /// 设置字段描述
    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    fn coerce(&self, value: &DataValue) -> Result<DataValue, Vec<FieldError>> {
        if value.is_null() {
            if self.nullable {
                return Ok(DataValue::Null);
            }
            return Err(vec![FieldError::new(&self.name, t("error.not_nullable"))]);
        }
        self.field_type.coerce(value, &self.name)
    }
}

/// 传输类型
///
/// 创建后不可变，通过 `Arc` 共享
#[derive(Debug, Clone, PartialEq)]
pub struct TransferType {
    name: String,
    fields: Vec<TransferField>,
    unknown_fields: UnknownFields,
}

impl TransferType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 按声明顺序排列的字段
    pub fn fields(&self) -> &[TransferField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&TransferField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn unknown_fields(&self) -> UnknownFields {
        self.unknown_fields
    }

    /// 按字段定义转换值映射，缺失字段使用默认值，收集所有字段错误
    pub fn coerce_values(&self, mut values: ValueMap) -> Result<ValueMap, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut coerced = ValueMap::with_capacity(self.fields.len());

        for field in &self.fields {
            match values.remove(&field.name) {
                Some(value) => match field.coerce(&value) {
                    Ok(v) => {
                        coerced.insert(field.name.clone(), v);
                    }
                    Err(mut field_errors) => errors.append(&mut field_errors),
                },
                None => match &field.default {
                    DefaultSpec::Value(default) => {
                        coerced.insert(field.name.clone(), default.clone());
                    }
                    DefaultSpec::Required => {
                        errors.push(FieldError::new(&field.name, t("error.field_required")));
                    }
                },
            }
        }

        // 剩余的键都是未知字段
        if !values.is_empty() {
            match self.unknown_fields {
                UnknownFields::Ignore => {
                    debug_log!("忽略传输类型 {} 的未知字段: {:?}", self.name, values.keys());
                }
                UnknownFields::Forbid => {
                    let mut unknown: Vec<String> = values.into_keys().collect();
                    unknown.sort();
                    errors.extend(
                        unknown
                            .into_iter()
                            .map(|key| FieldError::new(key, t("error.unknown_field"))),
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(coerced)
        } else {
            Err(errors)
        }
    }

    /// 验证值映射，失败时返回 `ValidationError`
    pub fn validate(&self, values: ValueMap) -> DtoResult<ValueMap> {
        self.coerce_values(values)
            .map_err(|errors| DtoError::ValidationError { errors })
    }

    /// 验证值映射并创建传输实例
    pub fn instantiate(self: &Arc<Self>, values: ValueMap) -> DtoResult<TransferInstance> {
        let values = self.validate(values)?;
        Ok(TransferInstance {
            transfer_type: Arc::clone(self),
            values,
        })
    }

    /// 从原始字节解析单个传输实例
    pub fn parse_bytes(self: &Arc<Self>, buffer: &[u8], encoding: Encoding) -> DtoResult<TransferInstance> {
        let payload = DataValue::from_json(decode_payload(buffer, encoding)?);
        let values = payload.expect_object()?;
        let values = match encoding {
            Encoding::UrlEncoded => self.normalize_form_values(values),
            Encoding::Json => values,
        };
        self.instantiate(values)
    }

    /// 从原始字节解析传输实例数组，错误路径以元素下标开头
    pub fn parse_array_bytes(
        self: &Arc<Self>,
        buffer: &[u8],
        encoding: Encoding,
    ) -> DtoResult<Vec<TransferInstance>> {
        let items = match DataValue::from_json(decode_payload(buffer, encoding)?) {
            DataValue::Array(items) => items,
            other => {
                return Err(crate::dto_error!(
                    validation,
                    "$",
                    tf("error.expected_array", &[("actual", other.type_name())])
                ));
            }
        };

        let mut instances = Vec::with_capacity(items.len());
        let mut errors = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            let prefix = index.to_string();
            let result = item.expect_object().and_then(|values| self.instantiate(values));
            match result {
                Ok(instance) => instances.push(instance),
                Err(DtoError::ValidationError { errors: item_errors }) => {
                    errors.extend(item_errors.into_iter().map(|e| e.nested(&prefix)));
                }
                Err(other) => return Err(other),
            }
        }

        if errors.is_empty() {
            Ok(instances)
        } else {
            Err(DtoError::ValidationError { errors })
        }
    }

    /// 按字段类型整理表单值
    ///
    /// 表单无法表示空值与空数组：缺失的数组字段视为空数组，缺失且无默认值的可空字段视为空值，
    /// 可空的非字符串字段收到空字符串时视为空值，单次出现的键对应数组字段时包装为单元素数组
    fn normalize_form_values(&self, mut values: ValueMap) -> ValueMap {
        for field in &self.fields {
            let normalized = match (values.remove(&field.name), &field.field_type) {
                (Some(DataValue::Array(items)), _) => DataValue::Array(items),
                (Some(single), FieldType::Array { .. }) => DataValue::Array(vec![single]),
                (Some(DataValue::String(text)), field_type)
                    if text.is_empty()
                        && field.nullable
                        && !matches!(field_type, FieldType::String { .. }) =>
                {
                    DataValue::Null
                }
                (Some(value), _) => value,
                (None, FieldType::Array { .. }) => DataValue::Array(Vec::new()),
                (None, _) if field.nullable && field.default.is_required() => DataValue::Null,
                (None, _) => continue,
            };
            values.insert(field.name.clone(), normalized);
        }
        values
    }
}

/// 传输类型构建器
///
/// 在 `build()` 时检查字段重名、未解析的前向引用以及默认值是否符合字段类型
#[derive(Debug, Clone)]
pub struct TransferTypeBuilder {
    name: String,
    fields: Vec<TransferField>,
    unknown_fields: UnknownFields,
}

impl TransferTypeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            unknown_fields: UnknownFields::default(),
        }
    }

    pub fn field(mut self, field: TransferField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = TransferField>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn build(self) -> DtoResult<Arc<TransferType>> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for mut field in self.fields {
            if !seen.insert(field.name.clone()) {
                return Err(crate::dto_error!(
                    config,
                    tf(
                        "error.duplicate_transfer_field",
                        &[("transfer", self.name.as_str()), ("field", field.name.as_str())]
                    )
                ));
            }
            if field.field_type.has_forward_ref() {
                return Err(crate::dto_error!(
                    config,
                    tf(
                        "error.unresolved_transfer_ref",
                        &[
                            ("transfer", self.name.as_str()),
                            ("field", field.name.as_str()),
                            ("target", field.field_type.type_label().as_str()),
                        ]
                    )
                ));
            }
            if let DefaultSpec::Value(default) = &field.default {
                if !default.is_null() {
                    let coerced = field.field_type.coerce(default, &field.name).map_err(|errors| {
                        let detail = errors
                            .iter()
                            .map(|e| e.to_string())
                            .collect::<Vec<_>>()
                            .join("; ");
                        crate::dto_error!(
                            config,
                            tf(
                                "error.invalid_transfer_default",
                                &[
                                    ("transfer", self.name.as_str()),
                                    ("field", field.name.as_str()),
                                    ("detail", detail.as_str()),
                                ]
                            )
                        )
                    })?;
                    field.default = DefaultSpec::Value(coerced);
                } else {
                    field.nullable = true;
                }
            }
            fields.push(field);
        }

        debug_log!("构建传输类型 {}: {:?}", self.name, seen);
        Ok(Arc::new(TransferType {
            name: self.name,
            fields,
            unknown_fields: self.unknown_fields,
        }))
    }
}

/// 传输实例
///
/// 持有已通过验证的值映射及其传输类型
#[derive(Debug, Clone, PartialEq)]
pub struct TransferInstance {
    transfer_type: Arc<TransferType>,
    values: ValueMap,
}

impl TransferInstance {
    pub fn transfer_type(&self) -> &Arc<TransferType> {
        &self.transfer_type
    }

    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    pub fn into_values(self) -> ValueMap {
        self.values
    }

    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.values.get(name)
    }

    /// 设置字段值，值按字段类型转换
    pub fn set(&mut self, name: &str, value: impl Into<DataValue>) -> DtoResult<()> {
        let field = self.transfer_type.field(name).ok_or_else(|| {
            crate::dto_error!(validation, name, t("error.unknown_field"))
        })?;
        let value = field
            .coerce(&value.into())
            .map_err(|errors| DtoError::ValidationError { errors })?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        let object: serde_json::Map<String, serde_json::Value> = self
            .transfer_type
            .fields()
            .iter()
            .filter_map(|f| {
                self.values
                    .get(&f.name)
                    .map(|v| (f.name.clone(), v.to_json_value()))
            })
            .collect();
        serde_json::Value::Object(object)
    }

    pub fn to_bytes(&self, encoding: Encoding) -> DtoResult<Vec<u8>> {
        encode_payload(&self.to_json_value(), encoding)
    }
}
