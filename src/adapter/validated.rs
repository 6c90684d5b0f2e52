//! 带验证模型适配器

use crate::adapter::record::{model_fields, source_fields};
use crate::adapter::{
    ExtractionMode, ModelAdapter, TransferTypeCache, TypeRef, cached_transfer_type,
    prepare_field_values, synthesize_transfer_type,
};
use crate::config::DtoConfig;
use crate::error::DtoResult;
use crate::model::{AnyModel, ModelFamily, ModelType};
use crate::shaping::TypeNamespace;
use crate::transfer::TransferType;
use crate::types::ValueMap;
use async_trait::async_trait;
use rat_logger::debug;
use std::sync::Arc;

/// 带验证模型适配器
///
/// 字段约束保留在传输类型上，构造时再次检查并调用模型自身的验证
#[derive(Debug, Default)]
pub struct ValidatedAdapter {
    cache: TransferTypeCache,
}

impl ValidatedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &TransferTypeCache {
        &self.cache
    }
}

#[async_trait]
impl ModelAdapter for ValidatedAdapter {
    fn name(&self) -> &str {
        "validated"
    }

    fn is_supported(&self, type_ref: &TypeRef) -> bool {
        type_ref
            .model()
            .is_some_and(|model| model.family() == ModelFamily::Validated)
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
            let fields = source_fields(model_fields(model)?, config.purpose);
            debug!("为验证模型 {} 构建传输类型 ({:?})", model.name(), config.purpose);
            synthesize_transfer_type(model, &fields, config, namespace, &self.cache)
        })
    }

    fn construct_model(&self, model: &ModelType, values: ValueMap) -> DtoResult<Box<AnyModel>> {
        let prepared = prepare_field_values(model, model_fields(model)?, values, true)?;
        let instance = model.construct(&prepared)?;
        model.validate_instance(instance.as_ref())?;
        Ok(instance)
    }
}
