//! # 模型注解
//!
//! 在特化时把配置附加到模型类型上

use crate::config::core::DtoConfig;
use crate::error::DtoResult;
use crate::i18n::tf;
use std::any::{Any, type_name};
use std::marker::PhantomData;

/// 带元数据的模型类型引用
///
/// 特化时只接受恰好一个 `DtoConfig` 元数据项
pub struct Annotated<M> {
    metadata: Vec<Box<dyn Any + Send + Sync>>,
    metadata_names: Vec<&'static str>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Annotated<M> {
    /// 不带任何元数据的注解
    pub fn new() -> Self {
        Self {
            metadata: Vec::new(),
            metadata_names: Vec::new(),
            _model: PhantomData,
        }
    }

    /// 携带单个配置的注解
    pub fn config(config: DtoConfig) -> Self {
        Self::new().with(config)
    }

    /// 追加任意元数据项
    pub fn with<T: Any + Send + Sync>(mut self, item: T) -> Self {
        self.metadata.push(Box::new(item));
        self.metadata_names.push(type_name::<T>());
        self
    }

    /// 取出唯一的 `DtoConfig`
    pub fn resolve_config(&self) -> DtoResult<DtoConfig> {
        match self.metadata.as_slice() {
            [single] => (**single).downcast_ref::<DtoConfig>().cloned().ok_or_else(|| self.invalid()),
            _ => Err(self.invalid()),
        }
    }

    fn invalid(&self) -> crate::error::DtoError {
        let count = self.metadata.len().to_string();
        let detail = self.metadata_names.join(", ");
        crate::dto_error!(
            config,
            tf(
                "error.invalid_annotation",
                &[("count", count.as_str()), ("detail", detail.as_str())]
            )
        )
    }
}

impl<M> Default for Annotated<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for Annotated<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotated")
            .field("model", &type_name::<M>())
            .field("metadata", &self.metadata_names)
            .finish()
    }
}
