//! 模型适配器模块
//!
//! 提供统一的模型适配接口，屏蔽不同模型族（普通记录、带验证模型、表映射模型）的实现差异

use crate::config::DtoConfig;
use crate::debug_log;
use crate::error::{DtoError, DtoResult, FieldError};
use crate::i18n::tf;
use crate::model::{AnyModel, FieldDescriptor, ModelType};
use crate::shaping::{TypeNamespace, append_extra_fields, compute_field_definitions, resolve_field_type};
use crate::transfer::{TransferInstance, TransferType, TransferTypeBuilder};
use crate::types::{DataValue, Encoding, ValueMap};
use async_trait::async_trait;
use std::sync::Arc;

pub mod cache;
mod record;
mod table;
mod validated;

pub use crate::config::Purpose;
pub use cache::TransferTypeCache;
pub use record::RecordAdapter;
pub use table::{ColumnTypeProvider, TableAdapter};
pub use validated::ValidatedAdapter;

/// 值提取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// 同步与异步提取都可用
    Sync,
    /// 只能异步提取
    AsyncOnly,
}

/// 适配器查找时使用的类型引用
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// 已描述的模型类型
    Model(Arc<ModelType>),
    /// 序列容器
    Sequence(Box<TypeRef>),
    /// 元组
    Tuple(Vec<TypeRef>),
    /// 泛型容器及其参数
    Generic { name: String, args: Vec<TypeRef> },
    /// 标量类型名
    Scalar(String),
}

impl TypeRef {
    /// 模型类型的引用
    pub fn of<M: crate::model::DtoModel>() -> Self {
        TypeRef::Model(M::model_type())
    }

    /// 模型列表的引用
    pub fn sequence_of<M: crate::model::DtoModel>() -> Self {
        TypeRef::Sequence(Box::new(Self::of::<M>()))
    }

    /// 引用的模型描述，非模型类型返回 None
    pub fn model(&self) -> Option<&Arc<ModelType>> {
        match self {
            TypeRef::Model(model) => Some(model),
            _ => None,
        }
    }

    /// 去掉一层容器后的元素类型
    fn unwrap_one_level(&self) -> Vec<&TypeRef> {
        match self {
            TypeRef::Sequence(inner) => vec![inner.as_ref()],
            TypeRef::Tuple(items) => items.iter().collect(),
            TypeRef::Generic { args, .. } => args.iter().collect(),
            TypeRef::Model(_) | TypeRef::Scalar(_) => Vec::new(),
        }
    }
}

/// 模型适配器trait，定义统一的模型操作接口
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// 适配器名称
    fn name(&self) -> &str;

    /// 是否支持该类型，对无法识别的输入返回 false
    fn is_supported(&self, type_ref: &TypeRef) -> bool;

    /// 值提取方式
    fn extraction_mode(&self) -> ExtractionMode;

    /// 构建（或从缓存取出）模型在给定配置下的传输类型
    fn build_transfer_type(
        &self,
        model: &Arc<ModelType>,
        config: &DtoConfig,
        namespace: &TypeNamespace,
    ) -> DtoResult<Arc<TransferType>>;

    /// 同步提取模型实例的字段值
    fn extract_values(&self, model: &ModelType, instance: &AnyModel) -> DtoResult<ValueMap> {
        model.extract_sync(instance).unwrap_or_else(|| {
            Err(crate::dto_error!(
                config,
                tf("error.async_only_extraction", &[("adapter", self.name())])
            ))
        })
    }

    /// 异步提取模型实例的字段值
    async fn extract_values_async(
        &self,
        model: &ModelType,
        instance: &AnyModel,
    ) -> DtoResult<ValueMap> {
        model.extract(instance).await
    }

    /// 从值映射构造模型实例
    ///
    /// 值会先按模型自身的字段类型转换，缺失字段使用模型默认值
    fn construct_model(&self, model: &ModelType, values: ValueMap) -> DtoResult<Box<AnyModel>>;

    /// 从原始字节解析单个传输实例
    fn parse_from_bytes(
        &self,
        transfer: &Arc<TransferType>,
        buffer: &[u8],
        encoding: Encoding,
    ) -> DtoResult<TransferInstance> {
        transfer.parse_bytes(buffer, encoding)
    }

    /// 从原始字节解析传输实例数组
    fn parse_array_from_bytes(
        &self,
        transfer: &Arc<TransferType>,
        buffer: &[u8],
        encoding: Encoding,
    ) -> DtoResult<Vec<TransferInstance>> {
        transfer.parse_array_bytes(buffer, encoding)
    }

    /// 传输实例转换为值映射
    fn transfer_instance_to_values(&self, instance: &TransferInstance) -> ValueMap {
        instance.values().clone()
    }
}

/// 按注册顺序查找第一个支持该类型的适配器
///
/// 序列、元组与泛型参数会先去掉一层再判断；没有匹配时返回 None
pub fn find_adapter(
    type_ref: &TypeRef,
    adapters: &[Arc<dyn ModelAdapter>],
) -> Option<Arc<dyn ModelAdapter>> {
    let mut candidates = vec![type_ref];
    candidates.extend(type_ref.unwrap_one_level());

    let found = adapters
        .iter()
        .find(|adapter| candidates.iter().any(|candidate| adapter.is_supported(candidate)))
        .cloned();
    match &found {
        Some(adapter) => debug_log!("找到适配器: {}", adapter.name()),
        None => debug_log!("没有适配器支持类型: {:?}", type_ref),
    }
    found
}

/// 传输类型名称，入站用途带后缀
pub(crate) fn transfer_type_name(model: &ModelType, config: &DtoConfig) -> String {
    match config.purpose {
        Purpose::Outbound => model.name().to_string(),
        Purpose::Inbound => format!("{}Inbound", model.name()),
    }
}

/// 按源字段与配置合成传输类型
///
/// 前向引用依次从命名空间、本适配器已构建的类型、全局注册的模型中解析
pub(crate) fn synthesize_transfer_type(
    model: &ModelType,
    source_fields: &[FieldDescriptor],
    config: &DtoConfig,
    namespace: &TypeNamespace,
    cache: &TransferTypeCache,
) -> DtoResult<Arc<TransferType>> {
    let child = namespace.enter(model.name())?;
    let purpose = config.purpose;

    let mut definitions =
        compute_field_definitions(&config.exclude, &config.field_mapping, source_fields)?;

    let mut resolver = |target: &str| -> DtoResult<Option<Arc<TransferType>>> {
        if let Some(bound) = child.get(target) {
            return Ok(Some(bound));
        }
        if let Some(built) = cache.get_by_name(target, purpose) {
            return Ok(Some(built));
        }
        let Some(target_model) = crate::manager::get_registered_model(target) else {
            return Ok(None);
        };
        // 目标模型可能属于其他模型族，交给负责它的适配器构建
        let type_ref = TypeRef::Model(Arc::clone(&target_model));
        let Some(adapter) = crate::manager::find_registered_adapter(&type_ref) else {
            return Ok(None);
        };
        adapter
            .build_transfer_type(&target_model, &DtoConfig::default().with_purpose(purpose), &child)
            .map(Some)
    };

    for definition in &mut definitions {
        if definition.field_type.has_forward_ref() {
            definition.field_type =
                resolve_field_type(&definition.name, &definition.field_type, &mut resolver)?;
        }
    }

    append_extra_fields(&mut definitions, &config.fields)?;

    TransferTypeBuilder::new(&transfer_type_name(model, config))
        .fields(definitions)
        .unknown_fields(config.unknown_fields)
        .build()
}

/// 按缓存规则构建传输类型
///
/// 命名空间带有显式绑定时结果依赖于绑定，不进入缓存
pub(crate) fn cached_transfer_type<F>(
    cache: &TransferTypeCache,
    model: &ModelType,
    config: &DtoConfig,
    namespace: &TypeNamespace,
    build: F,
) -> DtoResult<Arc<TransferType>>
where
    F: FnOnce() -> DtoResult<Arc<TransferType>>,
{
    if !namespace.is_empty() {
        return build();
    }
    if let Some(hit) = cache.get(model, config) {
        return Ok(hit);
    }
    let transfer = build()?;
    Ok(cache.insert(model, config, transfer))
}

/// 按模型字段描述符准备构造用的值
///
/// 存在的字段按声明类型转换，缺失字段使用默认值，必填字段缺失返回
/// `ConfigurationError`；不属于模型的键被丢弃
pub(crate) fn prepare_field_values(
    model: &ModelType,
    fields: &[FieldDescriptor],
    mut values: ValueMap,
    enforce_constraints: bool,
) -> DtoResult<ValueMap> {
    let mut prepared = ValueMap::with_capacity(fields.len());
    let mut errors: Vec<FieldError> = Vec::new();

    for field in fields {
        match values.remove(&field.name) {
            Some(value) => match coerce_descriptor(field, &value, enforce_constraints) {
                Ok(coerced) => {
                    prepared.insert(field.name.clone(), coerced);
                }
                Err(mut field_errors) => errors.append(&mut field_errors),
            },
            None => match &field.default {
                crate::model::DefaultSpec::Value(default) => {
                    prepared.insert(field.name.clone(), default.clone());
                }
                crate::model::DefaultSpec::Required => {
                    return Err(crate::dto_error!(
                        config,
                        tf(
                            "error.missing_required_field",
                            &[("model", model.name()), ("field", field.name.as_str())]
                        )
                    ));
                }
            },
        }
    }

    if !values.is_empty() {
        debug_log!("构造 {} 时丢弃多余的键: {:?}", model.name(), values.keys());
    }

    if errors.is_empty() {
        Ok(prepared)
    } else {
        Err(DtoError::ValidationError { errors })
    }
}

fn coerce_descriptor(
    field: &FieldDescriptor,
    value: &DataValue,
    enforce_constraints: bool,
) -> Result<DataValue, Vec<FieldError>> {
    if enforce_constraints || value.is_null() {
        return field.coerce_value(value, &field.name);
    }
    field.outer_type.without_constraints().coerce(value, &field.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DtoModel, integer_field, string_field};

    crate::define_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Gadget {
            id: i64,
            label: String,
        }

        name = "Gadget",
        fields = {
            id: integer_field(None, None).required(),
            label: string_field(Some(4), None, None).default_value("none"),
        }
    }

    fn builtin_adapters() -> Vec<Arc<dyn ModelAdapter>> {
        vec![
            Arc::new(ValidatedAdapter::new()),
            Arc::new(RecordAdapter::new()),
            Arc::new(TableAdapter::new()),
        ]
    }

    #[test]
    fn test_find_adapter_unwraps_one_level() {
        let adapters = builtin_adapters();

        let direct = find_adapter(&TypeRef::of::<Gadget>(), &adapters).unwrap();
        assert_eq!(direct.name(), "record");

        let listed = find_adapter(&TypeRef::sequence_of::<Gadget>(), &adapters).unwrap();
        assert_eq!(listed.name(), "record");

        let generic = TypeRef::Generic {
            name: "Page".to_string(),
            args: vec![TypeRef::of::<Gadget>()],
        };
        assert_eq!(find_adapter(&generic, &adapters).unwrap().name(), "record");

        // 只去掉一层
        let nested = TypeRef::Sequence(Box::new(TypeRef::sequence_of::<Gadget>()));
        assert!(find_adapter(&nested, &adapters).is_none());

        assert!(find_adapter(&TypeRef::Scalar("i64".to_string()), &adapters).is_none());
        assert!(find_adapter(&TypeRef::of::<Gadget>(), &[]).is_none());
    }

    #[test]
    fn test_prepare_field_values() {
        let model = Gadget::model_type();
        let fields = model.fields().unwrap();

        let values = ValueMap::from([
            ("id".to_string(), DataValue::String("7".to_string())),
            ("extra".to_string(), DataValue::Bool(true)),
        ]);
        let prepared = prepare_field_values(&model, fields, values, true).unwrap();
        assert_eq!(prepared.get("id"), Some(&DataValue::Int(7)));
        assert_eq!(prepared.get("label"), Some(&DataValue::String("none".to_string())));
        assert!(!prepared.contains_key("extra"));

        let missing = prepare_field_values(&model, fields, ValueMap::new(), true).unwrap_err();
        assert!(missing.is_configuration());
    }

    #[test]
    fn test_prepare_enforces_constraints_only_when_asked() {
        let model = Gadget::model_type();
        let fields = model.fields().unwrap();
        let values = || {
            ValueMap::from([
                ("id".to_string(), DataValue::Int(1)),
                ("label".to_string(), DataValue::String("too long".to_string())),
            ])
        };

        assert!(prepare_field_values(&model, fields, values(), false).is_ok());
        let err = prepare_field_values(&model, fields, values(), true).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.field_errors()[0].path, "label");
    }

    #[test]
    fn test_transfer_type_name_by_purpose() {
        let model = Gadget::model_type();
        assert_eq!(transfer_type_name(&model, &DtoConfig::default()), "Gadget");
        assert_eq!(
            transfer_type_name(&model, &DtoConfig::default().with_purpose(Purpose::Inbound)),
            "GadgetInbound"
        );
    }
}
