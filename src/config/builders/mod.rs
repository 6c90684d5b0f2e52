//! # 配置构建器模块

pub mod dto_config_builder;

pub use dto_config_builder::DtoConfigBuilder;
