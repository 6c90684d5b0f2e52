//! 适配器注册表模块
//!
//! 进程级的适配器列表与模型注册表，首次访问时创建并带有三个内置适配器

mod model_ops;
mod registry;

// 重新导出主要类型
pub use registry::AdapterRegistry;

use crate::adapter::{ModelAdapter, RecordAdapter, TableAdapter, TypeRef, ValidatedAdapter};
use crate::model::{DtoModel, ModelType};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// 全局适配器注册表实例
pub static GLOBAL_ADAPTER_REGISTRY: Lazy<AdapterRegistry> = Lazy::new(|| {
    crate::i18n::ensure_registered();
    AdapterRegistry::new()
});

/// 获取全局适配器注册表
pub(crate) fn get_global_registry() -> &'static AdapterRegistry {
    &GLOBAL_ADAPTER_REGISTRY
}

/// 便捷函数 - 追加适配器
///
/// 应在启动时注册，已完成的特化不受影响
pub fn register_adapter(adapter: Arc<dyn ModelAdapter>) {
    get_global_registry().register_adapter(adapter)
}

/// 便捷函数 - 当前注册的适配器，按注册顺序
pub fn registered_adapters() -> Arc<Vec<Arc<dyn ModelAdapter>>> {
    get_global_registry().adapters()
}

/// 便捷函数 - 查找支持该类型的第一个适配器
pub fn find_registered_adapter(type_ref: &TypeRef) -> Option<Arc<dyn ModelAdapter>> {
    get_global_registry().find_adapter(type_ref)
}

/// 便捷函数 - 注册模型类型，返回其描述
pub fn register_model<M: DtoModel>() -> Arc<ModelType> {
    let model_type = M::model_type();
    // 通过宏实现的模型在首次访问时已经注册，手写实现在这里补上
    register_model_type(Arc::clone(&model_type));
    model_type
}

/// 便捷函数 - 注册模型描述
pub fn register_model_type(model_type: Arc<ModelType>) {
    get_global_registry().register_model_type(model_type)
}

/// 便捷函数 - 按模型名获取已注册的模型
pub fn get_registered_model(name: &str) -> Option<Arc<ModelType>> {
    get_global_registry().get_model(name)
}

/// 便捷函数 - 检查模型是否已注册
pub fn has_registered_model(name: &str) -> bool {
    get_global_registry().has_model(name)
}

/// 内置普通记录适配器
pub fn record_adapter() -> Arc<RecordAdapter> {
    Arc::clone(&get_global_registry().record)
}

/// 内置验证模型适配器
pub fn validated_adapter() -> Arc<ValidatedAdapter> {
    Arc::clone(&get_global_registry().validated)
}

/// 内置表模型适配器，自定义列类型提供者注册在它上面
pub fn table_adapter() -> Arc<TableAdapter> {
    Arc::clone(&get_global_registry().table)
}
