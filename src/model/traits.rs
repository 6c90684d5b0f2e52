//! Model trait 定义模块
//!
//! 定义三类模型族的反射接口，以及类型擦除后的运行时模型描述 `ModelType`

use crate::error::{DtoError, DtoResult, FieldError};
use crate::model::data_conversion::{create_model_from_values, model_to_values};
use crate::model::field_types::{FieldDefinition, FieldDescriptor};
use crate::table::{ColumnDescriptor, RelationDescriptor};
use crate::types::ValueMap;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// 类型擦除后的模型实例
pub type AnyModel = dyn Any + Send + Sync;

/// 同步提取函数
pub type SyncExtractFn = fn(&AnyModel) -> DtoResult<ValueMap>;
/// 异步提取函数
pub type AsyncExtractFn = for<'a> fn(&'a AnyModel) -> BoxFuture<'a, DtoResult<ValueMap>>;
/// 从值映射构造模型实例
pub type ConstructFn = fn(&ValueMap) -> DtoResult<Box<AnyModel>>;
/// 模型实例级验证
pub type ValidateFn = fn(&AnyModel) -> DtoResult<()>;

/// DTO模型特征
///
/// 所有可以被DTO工厂特化的模型都必须实现这个特征，通常由 `impl_dto_model!` 生成
pub trait DtoModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 获取运行时模型描述
    fn model_type() -> Arc<ModelType>;
}

/// 普通记录模型
pub trait RecordModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 模型名称，前向引用按此名称解析
    fn record_name() -> &'static str;

    /// 按声明顺序排列的字段定义
    fn fields() -> Vec<(&'static str, FieldDefinition)>;
}

/// 带约束与自定义验证的模型
pub trait ValidatedModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 模型名称
    fn model_name() -> &'static str;

    /// 按声明顺序排列的字段定义，约束会保留在传输类型上
    fn fields() -> Vec<(&'static str, FieldDefinition)>;

    /// 构造后的实例级验证
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Ok(())
    }
}

/// 表映射模型
///
/// 关系是惰性加载的，因此值提取只能异步完成
#[async_trait]
pub trait TableModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 表名，同时作为模型名称
    fn table_name() -> &'static str;

    /// 列定义
    fn columns() -> Vec<ColumnDescriptor>;

    /// 关系定义
    fn relations() -> Vec<RelationDescriptor> {
        Vec::new()
    }

    /// 加载列值与关系值
    async fn load_values(&self) -> anyhow::Result<ValueMap>;
}

/// 模型族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    Record,
    Validated,
    Table,
}

/// 模型结构
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSchema {
    /// 按声明顺序排列的字段描述符
    Fields(Vec<FieldDescriptor>),
    /// 表的列与关系
    Table {
        table_name: String,
        columns: Vec<ColumnDescriptor>,
        relations: Vec<RelationDescriptor>,
    },
}

/// 值提取方式
#[derive(Clone, Copy)]
pub enum Extraction {
    Sync(SyncExtractFn),
    Async(AsyncExtractFn),
}

/// 运行时模型描述
///
/// 以 `TypeId` 标识模型类型，携带结构元数据与类型擦除后的操作
pub struct ModelType {
    type_id: TypeId,
    name: String,
    family: ModelFamily,
    schema: ModelSchema,
    extraction: Extraction,
    construct: ConstructFn,
    validate: Option<ValidateFn>,
}

impl ModelType {
    /// 描述普通记录模型
    pub fn record<T: RecordModel>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::record_name().to_string(),
            family: ModelFamily::Record,
            schema: ModelSchema::Fields(descriptors(T::fields())),
            extraction: Extraction::Sync(extract_serde::<T>),
            construct: construct_serde::<T>,
            validate: None,
        }
    }

    /// 描述带验证的模型
    pub fn validated<T: ValidatedModel>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::model_name().to_string(),
            family: ModelFamily::Validated,
            schema: ModelSchema::Fields(descriptors(T::fields())),
            extraction: Extraction::Sync(extract_serde::<T>),
            construct: construct_serde::<T>,
            validate: Some(validate_model::<T>),
        }
    }

    /// 描述表映射模型
    pub fn table<T: TableModel>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::table_name().to_string(),
            family: ModelFamily::Table,
            schema: ModelSchema::Table {
                table_name: T::table_name().to_string(),
                columns: T::columns(),
                relations: T::relations(),
            },
            extraction: Extraction::Async(extract_table::<T>),
            construct: construct_serde::<T>,
            validate: None,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// 字段描述符，表模型返回 None
    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        match &self.schema {
            ModelSchema::Fields(fields) => Some(fields),
            ModelSchema::Table { .. } => None,
        }
    }

    /// 模型上的全部字段名，按声明顺序
    pub fn field_names(&self) -> Vec<&str> {
        match &self.schema {
            ModelSchema::Fields(fields) => fields.iter().map(|f| f.name.as_str()).collect(),
            ModelSchema::Table {
                columns, relations, ..
            } => columns
                .iter()
                .map(|c| c.name.as_str())
                .chain(relations.iter().map(|r| r.name.as_str()))
                .collect(),
        }
    }

    pub fn is<M: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    pub fn extraction(&self) -> Extraction {
        self.extraction
    }

    /// 同步提取，模型只支持异步提取时返回 None
    pub fn extract_sync(&self, instance: &AnyModel) -> Option<DtoResult<ValueMap>> {
        match self.extraction {
            Extraction::Sync(extract) => Some(extract(instance)),
            Extraction::Async(_) => None,
        }
    }

    /// 提取值，同步提取的模型直接返回结果
    pub async fn extract(&self, instance: &AnyModel) -> DtoResult<ValueMap> {
        match self.extraction {
            Extraction::Sync(extract) => extract(instance),
            Extraction::Async(extract) => extract(instance).await,
        }
    }

    /// 从值映射构造模型实例
    pub fn construct(&self, values: &ValueMap) -> DtoResult<Box<AnyModel>> {
        (self.construct)(values)
    }

    /// 运行模型自身的实例验证
    pub fn validate_instance(&self, instance: &AnyModel) -> DtoResult<()> {
        match self.validate {
            Some(validate) => validate(instance),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("schema", &self.schema)
            .finish()
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

fn descriptors(fields: Vec<(&'static str, FieldDefinition)>) -> Vec<FieldDescriptor> {
    fields
        .into_iter()
        .map(|(name, definition)| FieldDescriptor::from_definition(name, definition))
        .collect()
}

/// 将类型擦除的实例还原为具体模型
pub fn downcast_model<T: 'static>(instance: &AnyModel) -> DtoResult<&T> {
    instance.downcast_ref::<T>().ok_or_else(|| {
        crate::dto_error!(
            config,
            format!("模型实例类型不匹配，期望 {}", std::any::type_name::<T>())
        )
    })
}

fn extract_serde<T: Serialize + 'static>(instance: &AnyModel) -> DtoResult<ValueMap> {
    model_to_values(downcast_model::<T>(instance)?)
}

fn construct_serde<T: DeserializeOwned + Send + Sync + 'static>(
    values: &ValueMap,
) -> DtoResult<Box<AnyModel>> {
    let model: T = create_model_from_values(values)?;
    Ok(Box::new(model))
}

fn validate_model<T: ValidatedModel>(instance: &AnyModel) -> DtoResult<()> {
    downcast_model::<T>(instance)?
        .validate()
        .map_err(|errors| DtoError::ValidationError { errors })
}

fn extract_table<T: TableModel>(instance: &AnyModel) -> BoxFuture<'_, DtoResult<ValueMap>> {
    Box::pin(async move {
        let model = downcast_model::<T>(instance)?;
        // 适配器内部错误原样透传
        model.load_values().await.map_err(DtoError::from)
    })
}
