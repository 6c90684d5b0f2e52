//! 普通记录模型适配器

use crate::adapter::{
    ExtractionMode, ModelAdapter, Purpose, TransferTypeCache, TypeRef, cached_transfer_type,
    prepare_field_values, synthesize_transfer_type,
};
use crate::config::DtoConfig;
use crate::error::DtoResult;
use crate::i18n::tf;
use crate::model::{AnyModel, FieldDescriptor, ModelFamily, ModelType};
use crate::shaping::TypeNamespace;
use crate::transfer::TransferType;
use crate::types::ValueMap;
use async_trait::async_trait;
use rat_logger::debug;
use std::sync::Arc;

/// 普通记录适配器
///
/// 记录字段只声明类型，约束不会出现在传输类型上
#[derive(Debug, Default)]
pub struct RecordAdapter {
    cache: TransferTypeCache,
}

impl RecordAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 本适配器缓存的传输类型
    pub fn cache(&self) -> &TransferTypeCache {
        &self.cache
    }
}

/// 取出字段型模型的字段描述符
pub(crate) fn model_fields(model: &ModelType) -> DtoResult<&[FieldDescriptor]> {
    model.fields().ok_or_else(|| {
        crate::dto_error!(
            config,
            tf("error.not_field_model", &[("model", model.name())])
        )
    })
}

/// 按用途选择源字段，入站用途去掉只读字段
pub(crate) fn source_fields(fields: &[FieldDescriptor], purpose: Purpose) -> Vec<FieldDescriptor> {
    fields
        .iter()
        .filter(|field| purpose == Purpose::Outbound || !field.read_only)
        .cloned()
        .collect()
}

#[async_trait]
impl ModelAdapter for RecordAdapter {
    fn name(&self) -> &str {
        "record"
    }

    fn is_supported(&self, type_ref: &TypeRef) -> bool {
        type_ref
            .model()
            .is_some_and(|model| model.family() == ModelFamily::Record)
    }

    fn extraction_mode(&self) -> ExtractionMode {
        ExtractionMode::Sync
    }

    fn build_transfer_type(
        &self,
        model: &Arc<ModelType>,
        config: &DtoConfig,
        namespace: &TypeNamespace,
    ) -> DtoResult<Arc<TransferType>> {
        cached_transfer_type(&self.cache, model, config, namespace, || {
            let fields: Vec<FieldDescriptor> = source_fields(model_fields(model)?, config.purpose)
                .into_iter()
                .map(|mut field| {
                    field.outer_type = field.outer_type.without_constraints();
                    field.inner_type = field.inner_type.without_constraints();
                    field
                })
                .collect();
            debug!("为记录模型 {} 构建传输类型 ({:?})", model.name(), config.purpose);
            synthesize_transfer_type(model, &fields, config, namespace, &self.cache)
        })
    }

    fn construct_model(&self, model: &ModelType, values: ValueMap) -> DtoResult<Box<AnyModel>> {
        let prepared = prepare_field_values(model, model_fields(model)?, values, false)?;
        let instance = model.construct(&prepared)?;
        model.validate_instance(instance.as_ref())?;
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DtoModel, FieldType, integer_field, string_field};
    use crate::types::DataValue;

    crate::define_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Badge {
            id: i64,
            code: String,
        }

        name = "Badge",
        fields = {
            id: integer_field(Some(1), None).required().read_only(),
            code: string_field(Some(3), None, None).required(),
        }
    }

    #[test]
    fn test_record_transfer_type_drops_constraints() {
        let adapter = RecordAdapter::new();
        let model = Badge::model_type();
        let transfer = adapter
            .build_transfer_type(&model, &DtoConfig::default(), &TypeNamespace::new())
            .unwrap();
        assert_eq!(transfer.field_names(), vec!["id", "code"]);
        assert_eq!(transfer.field("code").unwrap().field_type, FieldType::string());
    }

    #[test]
    fn test_inbound_drops_read_only_fields() {
        let adapter = RecordAdapter::new();
        let model = Badge::model_type();
        let inbound = DtoConfig::default().with_purpose(Purpose::Inbound);
        let transfer = adapter
            .build_transfer_type(&model, &inbound, &TypeNamespace::new())
            .unwrap();
        assert_eq!(transfer.name(), "BadgeInbound");
        assert_eq!(transfer.field_names(), vec!["code"]);
    }

    #[test]
    fn test_construct_and_extract() {
        let adapter = RecordAdapter::new();
        let model = Badge::model_type();
        let values = ValueMap::from([
            ("id".to_string(), DataValue::Int(0)),
            ("code".to_string(), DataValue::String("ABCDE".to_string())),
        ]);

        let instance = adapter.construct_model(&model, values).unwrap();
        let badge = instance.downcast_ref::<Badge>().unwrap();
        assert_eq!(badge.code, "ABCDE");

        let extracted = adapter.extract_values(&model, instance.as_ref()).unwrap();
        assert_eq!(extracted.get("id"), Some(&DataValue::Int(0)));
    }

    #[test]
    fn test_only_record_family_supported() {
        let adapter = RecordAdapter::new();
        assert!(adapter.is_supported(&TypeRef::of::<Badge>()));
        assert!(!adapter.is_supported(&TypeRef::Scalar("String".to_string())));
    }
}
