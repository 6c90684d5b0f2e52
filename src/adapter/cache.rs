//! 传输类型缓存
//!
//! 每个适配器实例持有一个缓存，键为 (模型 TypeId, 用途) 加上结构相等的配置。
//! 并发首次构建时允许重复构建，后写入者覆盖先写入者

use crate::config::{DtoConfig, Purpose};
use crate::debug_log;
use crate::model::ModelType;
use crate::transfer::TransferType;
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

type CacheKey = (TypeId, Purpose);

/// 传输类型缓存
#[derive(Debug, Default)]
pub struct TransferTypeCache {
    entries: DashMap<CacheKey, Vec<(DtoConfig, Arc<TransferType>)>>,
    by_name: DashMap<(String, Purpose), Arc<TransferType>>,
}

impl TransferTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找已构建的传输类型
    pub fn get(&self, model: &ModelType, config: &DtoConfig) -> Option<Arc<TransferType>> {
        let hit = self
            .entries
            .get(&(model.type_id(), config.purpose))
            .and_then(|list| {
                list.iter()
                    .find(|(cached, _)| cached == config)
                    .map(|(_, transfer)| Arc::clone(transfer))
            });
        match &hit {
            Some(_) => debug_log!("✅ 传输类型缓存命中: {} ({:?})", model.name(), config.purpose),
            None => debug_log!("传输类型缓存未命中: {} ({:?})", model.name(), config.purpose),
        }
        hit
    }

    /// 写入传输类型，相同键与配置的旧条目被替换
    ///
    /// 无整形规则的配置同时按模型名登记，供前向引用解析使用
    pub fn insert(
        &self,
        model: &ModelType,
        config: &DtoConfig,
        transfer: Arc<TransferType>,
    ) -> Arc<TransferType> {
        {
            let mut list = self
                .entries
                .entry((model.type_id(), config.purpose))
                .or_default();
            match list.iter_mut().find(|(cached, _)| cached == config) {
                Some(entry) => entry.1 = Arc::clone(&transfer),
                None => list.push((config.clone(), Arc::clone(&transfer))),
            }
        }

        if config.is_empty() && config.unknown_fields == Default::default() {
            self.by_name.insert(
                (model.name().to_string(), config.purpose),
                Arc::clone(&transfer),
            );
        }
        transfer
    }

    /// 按模型名查找无整形规则的传输类型
    pub fn get_by_name(&self, name: &str, purpose: Purpose) -> Option<Arc<TransferType>> {
        self.by_name
            .get(&(name.to_string(), purpose))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// 缓存的传输类型总数
    pub fn len(&self) -> usize {
        self.entries.iter().map(|entry| entry.value().len()).sum()
    }

    /// 某个模型在指定用途下缓存的配置数
    pub fn len_for(&self, model: &ModelType, purpose: Purpose) -> usize {
        self.entries
            .get(&(model.type_id(), purpose))
            .map_or(0, |list| list.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
