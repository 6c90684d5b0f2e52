//! rat_quickdto - 数据传输对象工厂
//!
//! 从领域模型（普通记录、带验证模型、表映射模型）派生传输类型，
//! 支持字段排除、重命名、重定型与附加，并在模型、传输实例与线上字节之间双向转换。
//! 不同模型族通过可插拔的适配器接入，工厂逻辑只写一次

// 导出所有公共模块
pub mod error;
pub mod types;
pub mod i18n;
pub mod model;
pub mod table;
pub mod transfer;
pub mod config;
pub mod shaping;
pub mod adapter;
pub mod manager;
pub mod factory;

// 重新导出常用类型和函数
pub use error::{DtoError, DtoResult, FieldError};
pub use types::{DataValue, Encoding, ValueMap, decode_payload, encode_payload};
pub use model::{
    DtoModel, FieldDefinition, FieldType, ModelFamily, ModelType, RecordModel, TableModel,
    ValidatedModel, array_field, binary_field, boolean_field, datetime_field, float_field,
    integer_field, json_field, list_field, model_field, model_list_field, string_field,
    uuid_field,
};
pub use table::{ColumnDescriptor, ColumnType, RelationDescriptor};
pub use transfer::{TransferField, TransferInstance, TransferType, TransferTypeBuilder};
pub use config::{
    Annotated, DtoConfig, DtoConfigBuilder, ExtraField, FieldMapping, Purpose, UnknownFields,
};
pub use shaping::TypeNamespace;
pub use adapter::{
    ExtractionMode, ModelAdapter, RecordAdapter, TableAdapter, TypeRef, ValidatedAdapter,
    find_adapter,
};
pub use manager::{
    find_registered_adapter, get_registered_model, register_adapter, register_model,
    registered_adapters,
};
pub use factory::{Dto, DtoFactory, DtoType, Parametrized, TypeArg};

// 宏内部使用的依赖
#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}

// 条件编译调试宏 - 只有在 debug 模式下才输出调试信息
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {{
        rat_logger::debug!($($arg)*);
    }};
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {{}};
}

/// 初始化rat_quickdto库
///
/// 注册多语言错误消息并按 RAT_LANG/LANG 选择语言
///
/// 注意：日志系统由调用者自行初始化，本库不初始化日志
pub fn init() {
    i18n::ErrorMessageI18n::init();
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
