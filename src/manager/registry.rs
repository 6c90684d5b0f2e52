//! 适配器注册表核心定义

use crate::adapter::{
    ModelAdapter, RecordAdapter, TableAdapter, TypeRef, ValidatedAdapter, find_adapter,
};
use crate::model::ModelType;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use rat_logger::info;
use std::sync::Arc;

/// 适配器注册表 - 管理适配器列表与已注册的模型
///
/// 适配器列表以快照方式发布，只允许追加；读取不加锁
pub struct AdapterRegistry {
    /// 按注册顺序排列的适配器
    pub(crate) adapters: ArcSwap<Vec<Arc<dyn ModelAdapter>>>,
    /// 内置普通记录适配器
    pub(crate) record: Arc<RecordAdapter>,
    /// 内置验证模型适配器
    pub(crate) validated: Arc<ValidatedAdapter>,
    /// 内置表模型适配器
    pub(crate) table: Arc<TableAdapter>,
    /// 模型注册表 (模型名 -> 模型描述)
    pub(crate) models: DashMap<String, Arc<ModelType>>,
}

impl AdapterRegistry {
    /// 创建带三个内置适配器的注册表
    pub fn new() -> Self {
        info!("创建适配器注册表");

        let record = Arc::new(RecordAdapter::new());
        let validated = Arc::new(ValidatedAdapter::new());
        let table = Arc::new(TableAdapter::new());
        let builtin: Vec<Arc<dyn ModelAdapter>> = vec![
            record.clone() as Arc<dyn ModelAdapter>,
            validated.clone() as Arc<dyn ModelAdapter>,
            table.clone() as Arc<dyn ModelAdapter>,
        ];

        Self {
            adapters: ArcSwap::from_pointee(builtin),
            record,
            validated,
            table,
            models: DashMap::new(),
        }
    }

    /// 追加适配器
    pub fn register_adapter(&self, adapter: Arc<dyn ModelAdapter>) {
        info!("注册适配器: {}", adapter.name());
        self.adapters.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&adapter));
            next
        });
    }

    /// 当前适配器列表快照
    pub fn adapters(&self) -> Arc<Vec<Arc<dyn ModelAdapter>>> {
        self.adapters.load_full()
    }

    /// 按注册顺序查找适配器
    pub fn find_adapter(&self, type_ref: &TypeRef) -> Option<Arc<dyn ModelAdapter>> {
        find_adapter(type_ref, &self.adapters.load())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let adapters: Vec<String> = self
            .adapters
            .load()
            .iter()
            .map(|adapter| adapter.name().to_string())
            .collect();
        f.debug_struct("AdapterRegistry")
            .field("adapters", &adapters)
            .field("models", &self.models.len())
            .finish()
    }
}
