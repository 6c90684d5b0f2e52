//! 特化后的DTO类型与DTO实例

use crate::adapter::{ExtractionMode, ModelAdapter};
use crate::config::{DtoConfig, UnknownFields};
use crate::debug_log;
use crate::error::DtoResult;
use crate::i18n::tf;
use crate::model::{DtoModel, FieldDescriptor, FieldShape, FieldType, ModelType};
use crate::shaping::{append_extra_fields, compute_field_definitions};
use crate::transfer::{TransferField, TransferInstance, TransferType, TransferTypeBuilder};
use crate::types::{DataValue, Encoding, ValueMap};
use rat_logger::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use std::sync::Arc;

/// 特化结果
pub(crate) struct DtoSpec {
    pub(crate) model_type: Arc<ModelType>,
    /// 依次应用的配置层，第一层是特化时的配置
    pub(crate) configs: Vec<DtoConfig>,
    pub(crate) adapter: Arc<dyn ModelAdapter>,
    pub(crate) transfer_type: Arc<TransferType>,
    /// 模型字段名 -> 传输字段名
    pub(crate) forward: BTreeMap<String, String>,
    /// 传输字段名 -> 模型字段名
    pub(crate) reverse: BTreeMap<String, String>,
    /// 不出现在传输类型上的模型字段
    pub(crate) excluded: BTreeSet<String>,
    /// 只存在于传输类型上的附加字段
    pub(crate) synthetic: BTreeSet<String>,
}

/// 特化后的DTO类型
///
/// 绑定模型类型、配置、适配器与传输类型，负责双向转换
pub struct DtoType<M> {
    spec: Arc<DtoSpec>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for DtoType<M> {
    fn clone(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
            _model: PhantomData,
        }
    }
}

impl<M> std::fmt::Debug for DtoType<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DtoType")
            .field("model", &self.spec.model_type.name())
            .field("adapter", &self.spec.adapter.name())
            .field("transfer_type", &self.spec.transfer_type)
            .finish()
    }
}

impl<M: DtoModel> DtoType<M> {
    pub(crate) fn new(spec: DtoSpec) -> Self {
        Self {
            spec: Arc::new(spec),
            _model: PhantomData,
        }
    }

    pub fn model_type(&self) -> &Arc<ModelType> {
        &self.spec.model_type
    }

    /// 特化时使用的配置
    pub fn config(&self) -> &DtoConfig {
        &self.spec.configs[0]
    }

    /// 全部配置层，`extend` 追加的层排在后面
    pub fn configs(&self) -> &[DtoConfig] {
        &self.spec.configs
    }

    pub fn adapter(&self) -> &Arc<dyn ModelAdapter> {
        &self.spec.adapter
    }

    pub fn transfer_type(&self) -> &Arc<TransferType> {
        &self.spec.transfer_type
    }

    /// 传输字段名到模型字段名的映射
    pub fn reverse_mapping(&self) -> &BTreeMap<String, String> {
        &self.spec.reverse
    }

    /// 只存在于传输类型上的字段名
    pub fn synthetic_fields(&self) -> &BTreeSet<String> {
        &self.spec.synthetic
    }

    /// 从模型实例同步创建DTO
    ///
    /// 适配器只支持异步提取时返回 `ConfigurationError`
    pub fn from_model(&self, model: &M) -> DtoResult<Dto<M>> {
        if self.spec.adapter.extraction_mode() == ExtractionMode::AsyncOnly {
            return Err(crate::dto_error!(
                config,
                tf("error.async_only_extraction", &[("adapter", self.spec.adapter.name())])
            ));
        }
        let values = self.spec.adapter.extract_values(&self.spec.model_type, model)?;
        self.from_model_values(values)
    }

    /// 从模型实例异步创建DTO
    ///
    /// 适配器错误原样返回；丢弃返回的 future 即取消
    pub async fn from_model_async(&self, model: &M) -> DtoResult<Dto<M>> {
        let values = self
            .spec
            .adapter
            .extract_values_async(&self.spec.model_type, model)
            .await?;
        self.from_model_values(values)
    }

    /// 从原始字节解析DTO
    pub fn from_buffer(&self, buffer: &[u8], encoding: Encoding) -> DtoResult<Dto<M>> {
        let instance =
            self.spec
                .adapter
                .parse_from_bytes(&self.spec.transfer_type, buffer, encoding)?;
        Ok(self.wrap(instance))
    }

    /// 从原始字节解析DTO数组
    pub fn array_from_buffer(&self, buffer: &[u8], encoding: Encoding) -> DtoResult<Vec<Dto<M>>> {
        let instances =
            self.spec
                .adapter
                .parse_array_from_bytes(&self.spec.transfer_type, buffer, encoding)?;
        Ok(instances.into_iter().map(|i| self.wrap(i)).collect())
    }

    /// 从原始字节直接得到模型实例数组
    pub fn models_from_buffer(&self, buffer: &[u8], encoding: Encoding) -> DtoResult<Vec<M>> {
        self.array_from_buffer(buffer, encoding)?
            .iter()
            .map(Dto::to_model)
            .collect()
    }

    /// 从以传输字段名为键的值映射创建DTO
    pub fn from_values(&self, values: ValueMap) -> DtoResult<Dto<M>> {
        let instance = self.spec.transfer_type.instantiate(values)?;
        Ok(self.wrap(instance))
    }

    /// 包装已有的传输实例，属于其他传输类型时重新验证
    pub fn from_transfer(&self, instance: TransferInstance) -> DtoResult<Dto<M>> {
        if Arc::ptr_eq(instance.transfer_type(), &self.spec.transfer_type) {
            return Ok(self.wrap(instance));
        }
        self.from_values(instance.into_values())
    }

    /// 在当前DTO类型上叠加配置
    ///
    /// 当前传输字段作为源字段，新的排除与映射按传输字段名书写，
    /// 并与已有映射组合。结果不进入适配器缓存
    pub fn extend(&self, config: DtoConfig) -> DtoResult<DtoType<M>> {
        let parent = &self.spec;
        let source: Vec<FieldDescriptor> = parent
            .transfer_type
            .fields()
            .iter()
            .map(descriptor_from_transfer_field)
            .collect();

        let mut definitions =
            compute_field_definitions(&config.exclude, &config.field_mapping, &source)?;
        append_extra_fields(&mut definitions, &config.fields)?;

        let unknown_fields = if config.unknown_fields == UnknownFields::Forbid
            || parent.transfer_type.unknown_fields() == UnknownFields::Forbid
        {
            UnknownFields::Forbid
        } else {
            UnknownFields::Ignore
        };
        let transfer_type = TransferTypeBuilder::new(parent.transfer_type.name())
            .fields(definitions)
            .unknown_fields(unknown_fields)
            .build()?;

        let rename = |name: &str| -> String {
            config
                .field_mapping
                .get(name)
                .map(|mapping| mapping.target_name().to_string())
                .unwrap_or_else(|| name.to_string())
        };

        // 组合模型字段到新传输字段的映射
        let mut excluded = parent.excluded.clone();
        let mut forward = BTreeMap::new();
        for model_field in parent.model_type.field_names() {
            if parent.excluded.contains(model_field) {
                continue;
            }
            let current = parent
                .forward
                .get(model_field)
                .cloned()
                .unwrap_or_else(|| model_field.to_string());
            if !parent.transfer_type.has_field(&current) {
                continue;
            }
            if config.exclude.contains(&current) {
                excluded.insert(model_field.to_string());
                continue;
            }
            let next = rename(&current);
            if next != model_field {
                forward.insert(model_field.to_string(), next);
            }
        }

        let mut reverse = BTreeMap::new();
        for (model_field, transfer_field) in &forward {
            if reverse
                .insert(transfer_field.clone(), model_field.clone())
                .is_some()
            {
                return Err(crate::dto_error!(
                    config,
                    tf("error.rename_collision", &[("field", transfer_field.as_str())])
                ));
            }
        }

        let mut synthetic: BTreeSet<String> = parent
            .synthetic
            .iter()
            .filter(|name| !config.exclude.contains(*name))
            .map(|name| rename(name))
            .collect();
        synthetic.extend(config.extra_field_names());

        let mut configs = parent.configs.clone();
        configs.push(config);

        debug!(
            "扩展 {} 的DTO类型，传输字段: {:?}",
            parent.model_type.name(),
            transfer_type.field_names()
        );

        Ok(DtoType::new(DtoSpec {
            model_type: Arc::clone(&parent.model_type),
            configs,
            adapter: Arc::clone(&parent.adapter),
            transfer_type,
            forward,
            reverse,
            excluded,
            synthetic,
        }))
    }

    /// 排除 -> 正向重命名 -> 过滤到传输字段 -> 验证
    fn from_model_values(&self, values: ValueMap) -> DtoResult<Dto<M>> {
        let spec = &self.spec;
        let mut shaped = ValueMap::with_capacity(values.len());
        for (name, value) in values {
            if spec.excluded.contains(&name) {
                continue;
            }
            let target = spec.forward.get(&name).cloned().unwrap_or(name);
            if spec.transfer_type.has_field(&target) {
                shaped.insert(target, value);
            }
        }
        debug_log!("模型 {} 的值已整形为 {} 个传输字段", spec.model_type.name(), shaped.len());
        self.from_values(shaped)
    }

    fn wrap(&self, instance: TransferInstance) -> Dto<M> {
        Dto {
            dto_type: self.clone(),
            instance,
        }
    }
}

fn descriptor_from_transfer_field(field: &TransferField) -> FieldDescriptor {
    let (inner_type, shape) = match &field.field_type {
        FieldType::Array { item_type, .. } => ((**item_type).clone(), FieldShape::Sequence),
        other => (other.clone(), FieldShape::Singleton),
    };
    FieldDescriptor {
        name: field.name.clone(),
        outer_type: field.field_type.clone(),
        inner_type,
        shape,
        nullable: field.nullable,
        default: field.default.clone(),
        read_only: false,
        description: field.description.clone(),
    }
}

/// DTO实例
///
/// 持有一个已验证的传输实例
pub struct Dto<M> {
    dto_type: DtoType<M>,
    instance: TransferInstance,
}

impl<M: DtoModel> Dto<M> {
    pub fn dto_type(&self) -> &DtoType<M> {
        &self.dto_type
    }

    pub fn transfer(&self) -> &TransferInstance {
        &self.instance
    }

    pub fn into_transfer(self) -> TransferInstance {
        self.instance
    }

    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.instance.get(name)
    }

    /// 设置传输字段值，值按字段类型验证
    pub fn set(&mut self, name: &str, value: impl Into<DataValue>) -> DtoResult<()> {
        self.instance.set(name, value)
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        self.instance.to_json_value()
    }

    pub fn to_bytes(&self, encoding: Encoding) -> DtoResult<Vec<u8>> {
        self.instance.to_bytes(encoding)
    }

    /// 转换为模型实例
    ///
    /// 去掉附加字段 -> 反向重命名 -> 适配器构造
    pub fn to_model(&self) -> DtoResult<M> {
        let spec = &self.dto_type.spec;
        let values = spec.adapter.transfer_instance_to_values(&self.instance);

        let mut model_values = ValueMap::with_capacity(values.len());
        for (name, value) in values {
            if spec.synthetic.contains(&name) {
                continue;
            }
            let target = spec.reverse.get(&name).cloned().unwrap_or(name);
            model_values.insert(target, value);
        }

        let instance = spec.adapter.construct_model(&spec.model_type, model_values)?;
        match instance.downcast::<M>() {
            Ok(model) => Ok(*model),
            Err(_) => Err(crate::dto_error!(
                config,
                tf(
                    "error.downcast_failed",
                    &[("adapter", spec.adapter.name()), ("model", spec.model_type.name())]
                )
            )),
        }
    }
}

impl<M> Clone for Dto<M> {
    fn clone(&self) -> Self {
        Self {
            dto_type: self.dto_type.clone(),
            instance: self.instance.clone(),
        }
    }
}

impl<M> PartialEq for Dto<M> {
    fn eq(&self, other: &Self) -> bool {
        self.instance == other.instance
    }
}

impl<M> std::fmt::Debug for Dto<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dto")
            .field("model", &self.dto_type.spec.model_type.name())
            .field("values", self.instance.values())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{DtoConfig, ExtraField};
    use crate::factory::DtoFactory;
    use crate::model::{FieldType, integer_field, string_field};
    use crate::types::{DataValue, Encoding};

    crate::define_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Pair {
            id: i64,
            first: i64,
            second: i64,
            label: String,
        }

        name = "DtoTypePair",
        fields = {
            id: integer_field(None, None).default_value(0i64),
            first: integer_field(None, None).required(),
            second: integer_field(None, None).required(),
            label: string_field(None, None, None).default_value("pair"),
        }
    }

    fn pair() -> Pair {
        Pair {
            id: 9,
            first: 1,
            second: 2,
            label: "p".to_string(),
        }
    }

    #[test]
    fn test_extend_composes_renames() {
        let base = DtoFactory::records()
            .specialize_with::<Pair>(
                DtoConfig::builder()
                    .exclude("id")
                    .rename("first", "third")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let extended = base
            .extend(
                DtoConfig::builder()
                    .rename("third", "fifth")
                    .exclude("label")
                    .field(ExtraField::optional("note", FieldType::string()))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(
            extended.transfer_type().field_names(),
            vec!["fifth", "second", "note"]
        );
        assert_eq!(extended.configs().len(), 2);

        let dto = extended.from_model(&pair()).unwrap();
        assert_eq!(dto.get("fifth"), Some(&DataValue::Int(1)));
        assert_eq!(dto.get("note"), Some(&DataValue::Null));

        let model = dto.to_model().unwrap();
        assert_eq!(model.first, 1);
        assert_eq!(model.second, 2);
        // 被排除的字段取模型默认值
        assert_eq!(model.id, 0);
        assert_eq!(model.label, "pair");
    }

    #[test]
    fn test_extend_rejects_collisions() {
        let base = DtoFactory::records().specialize::<Pair>().unwrap();
        let clash = DtoConfig::builder().rename("first", "second").build().unwrap();
        assert!(base.extend(clash).unwrap_err().is_configuration());
    }

    #[test]
    fn test_dto_accessors() {
        let dto_type = DtoFactory::records().specialize::<Pair>().unwrap();
        let mut dto = dto_type.from_model(&pair()).unwrap();
        dto.set("first", "5").unwrap();
        assert_eq!(dto.get("first"), Some(&DataValue::Int(5)));
        assert!(dto.set("missing", 1i64).unwrap_err().is_validation());
        assert!(dto.set("first", "x").unwrap_err().is_validation());

        let json = dto.to_json_value();
        assert_eq!(json["label"], serde_json::json!("p"));

        let bytes = dto.to_bytes(Encoding::Json).unwrap();
        let again = dto_type.from_buffer(&bytes, Encoding::Json).unwrap();
        assert_eq!(again, dto);
        assert_eq!(again.to_model().unwrap().first, 5);

        let transfer = dto.clone().into_transfer();
        let rewrapped = dto_type.from_transfer(transfer).unwrap();
        assert_eq!(rewrapped, dto);
    }
}
