//! # 配置管理模块
//!
//! 提供DTO整形配置，支持构建器模式和链式配置

pub mod annotated;
pub mod builders;
pub mod core;

pub use annotated::Annotated;
pub use builders::DtoConfigBuilder;
pub use self::core::{DtoConfig, ExtraField, FieldMapping, Purpose, UnknownFields};
