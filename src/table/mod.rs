//! 表映射模块
//!
//! 提供表映射模型的列与关系描述

pub mod schema;

pub use schema::{ColumnDescriptor, ColumnType, RelationDescriptor};
