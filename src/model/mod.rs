//! 模型定义系统模块
//!
//! 三类模型族（普通记录、带验证模型、表映射模型）的字段反射与运行时描述

pub mod convenience;
pub mod data_conversion;
pub mod field_types;
pub mod macros;
pub mod traits;

pub use convenience::*;
pub use data_conversion::{create_model_from_values, model_to_values};
pub use field_types::{DefaultSpec, FieldDefinition, FieldDescriptor, FieldShape, FieldType};
pub use traits::{
    AnyModel, DtoModel, Extraction, ModelFamily, ModelSchema, ModelType, RecordModel, TableModel,
    ValidatedModel, downcast_model,
};
pub use crate::table::{ColumnDescriptor, ColumnType, RelationDescriptor};
