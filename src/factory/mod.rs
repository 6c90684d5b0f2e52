//! DTO工厂模块
//!
//! 未特化的工厂按目标模型类型特化为 `DtoType<M>`，
//! 特化时选择适配器、构建传输类型并计算字段映射

mod dto_type;

pub use dto_type::{Dto, DtoType};

use crate::adapter::{ModelAdapter, TypeRef};
use crate::config::{Annotated, DtoConfig};
use crate::error::DtoResult;
use crate::i18n::tf;
use crate::manager;
use crate::model::DtoModel;
use crate::shaping::{TypeNamespace, reverse_field_mapping};
use rat_logger::info;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// 特化参数
pub enum TypeArg<M> {
    /// 类型变量，工厂保持未特化
    Var(String),
    /// 具体模型类型
    Model(PhantomData<fn() -> M>),
    /// 带配置注解的模型类型
    Annotated(Annotated<M>),
}

impl<M> TypeArg<M> {
    pub fn var(name: &str) -> Self {
        TypeArg::Var(name.to_string())
    }

    pub fn model() -> Self {
        TypeArg::Model(PhantomData)
    }

    pub fn annotated(annotated: Annotated<M>) -> Self {
        TypeArg::Annotated(annotated)
    }
}

/// 参数化结果
pub enum Parametrized<M> {
    /// 参数是类型变量，返回原工厂
    Generic(DtoFactory),
    /// 已特化的DTO类型
    Specialized(DtoType<M>),
}

impl<M> Parametrized<M> {
    pub fn is_specialized(&self) -> bool {
        matches!(self, Parametrized::Specialized(_))
    }

    /// 取出特化结果
    pub fn into_specialized(self) -> Option<DtoType<M>> {
        match self {
            Parametrized::Specialized(dto_type) => Some(dto_type),
            Parametrized::Generic(_) => None,
        }
    }
}

/// DTO工厂
///
/// 可以固定使用某个适配器，否则在特化时从全局注册表中查找
#[derive(Clone)]
pub struct DtoFactory {
    name: String,
    adapter: Option<Arc<dyn ModelAdapter>>,
    default_config: DtoConfig,
    namespace: TypeNamespace,
}

impl DtoFactory {
    /// 创建从注册表查找适配器的工厂
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            adapter: None,
            default_config: DtoConfig::default(),
            namespace: TypeNamespace::new(),
        }
    }

    /// 固定使用内置普通记录适配器的工厂
    pub fn records() -> Self {
        Self::new("RecordDto").with_adapter(manager::record_adapter())
    }

    /// 固定使用内置验证模型适配器的工厂
    pub fn validated() -> Self {
        Self::new("ValidatedDto").with_adapter(manager::validated_adapter())
    }

    /// 固定使用内置表模型适配器的工厂
    pub fn tables() -> Self {
        Self::new("TableDto").with_adapter(manager::table_adapter())
    }

    /// 固定适配器
    pub fn with_adapter(mut self, adapter: Arc<dyn ModelAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// 未提供配置时使用的默认配置
    pub fn with_default_config(mut self, config: DtoConfig) -> Self {
        self.default_config = config;
        self
    }

    /// 前向引用优先解析的命名空间
    pub fn with_namespace(mut self, namespace: TypeNamespace) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter(&self) -> Option<&Arc<dyn ModelAdapter>> {
        self.adapter.as_ref()
    }

    pub fn default_config(&self) -> &DtoConfig {
        &self.default_config
    }

    /// 按参数特化
    ///
    /// 类型变量返回工厂本身；模型或注解返回特化后的DTO类型
    pub fn parametrize<M: DtoModel>(&self, arg: TypeArg<M>) -> DtoResult<Parametrized<M>> {
        match arg {
            TypeArg::Var(name) => {
                crate::debug_log!("工厂 {} 以类型变量 {} 参数化，保持未特化", self.name, name);
                Ok(Parametrized::Generic(self.clone()))
            }
            TypeArg::Model(_) => self.specialize::<M>().map(Parametrized::Specialized),
            TypeArg::Annotated(annotated) => self
                .specialize_annotated(&annotated)
                .map(Parametrized::Specialized),
        }
    }

    /// 使用默认配置特化
    pub fn specialize<M: DtoModel>(&self) -> DtoResult<DtoType<M>> {
        self.specialize_with::<M>(self.default_config.clone())
    }

    /// 使用注解中唯一的配置特化
    pub fn specialize_annotated<M: DtoModel>(
        &self,
        annotated: &Annotated<M>,
    ) -> DtoResult<DtoType<M>> {
        let config = annotated.resolve_config()?;
        self.specialize_with::<M>(config)
    }

    /// 使用给定配置特化
    pub fn specialize_with<M: DtoModel>(&self, config: DtoConfig) -> DtoResult<DtoType<M>> {
        let model_type = manager::register_model::<M>();
        let adapter = self.resolve_adapter(&TypeRef::Model(Arc::clone(&model_type)))?;

        let transfer_type = adapter.build_transfer_type(&model_type, &config, &self.namespace)?;
        let reverse = reverse_field_mapping(&config)?;
        let forward: BTreeMap<String, String> = reverse
            .iter()
            .map(|(transfer_name, model_name)| (model_name.clone(), transfer_name.clone()))
            .collect();
        let synthetic = config.extra_field_names();
        let excluded = config.exclude.clone();

        info!(
            "特化 {}[{}]，适配器: {}，传输字段: {:?}",
            self.name,
            model_type.name(),
            adapter.name(),
            transfer_type.field_names()
        );

        Ok(DtoType::new(dto_type::DtoSpec {
            model_type,
            configs: vec![config],
            adapter,
            transfer_type,
            forward,
            reverse,
            excluded,
            synthetic,
        }))
    }

    fn resolve_adapter(&self, type_ref: &TypeRef) -> DtoResult<Arc<dyn ModelAdapter>> {
        let model_name = type_ref.model().map(|m| m.name().to_string()).unwrap_or_default();
        match &self.adapter {
            Some(adapter) if adapter.is_supported(type_ref) => Ok(Arc::clone(adapter)),
            Some(adapter) => Err(crate::dto_error!(
                config,
                tf(
                    "error.adapter_mismatch",
                    &[("adapter", adapter.name()), ("model", model_name.as_str())]
                )
            )),
            None => manager::find_registered_adapter(type_ref).ok_or_else(|| {
                crate::dto_error!(
                    config,
                    tf("error.no_adapter", &[("model", model_name.as_str())])
                )
            }),
        }
    }
}

impl std::fmt::Debug for DtoFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DtoFactory")
            .field("name", &self.name)
            .field("adapter", &self.adapter.as_ref().map(|a| a.name().to_string()))
            .field("default_config", &self.default_config)
            .finish()
    }
}
