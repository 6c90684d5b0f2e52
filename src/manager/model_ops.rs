//! 模型注册操作

use super::registry::AdapterRegistry;
use crate::model::ModelType;
use rat_logger::{debug, warn};
use std::sync::Arc;

impl AdapterRegistry {
    /// 注册模型描述，前向引用按模型名解析到它
    ///
    /// 同名的不同模型类型会替换旧的注册
    pub fn register_model_type(&self, model_type: Arc<ModelType>) {
        let name = model_type.name().to_string();
        if let Some(previous) = self.models.insert(name.clone(), model_type.clone()) {
            if previous.type_id() != model_type.type_id() {
                warn!("模型名 '{}' 被另一个模型类型重新注册", name);
            }
        } else {
            debug!("注册模型: {} ({:?})", name, model_type.family());
        }
    }

    /// 按模型名获取已注册的模型
    pub fn get_model(&self, name: &str) -> Option<Arc<ModelType>> {
        self.models.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// 检查模型是否已注册
    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// 已注册的模型名，按字母排序
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}
