//! 模型便捷函数模块
//!
//! 提供创建各种字段定义的便捷函数

use crate::model::field_types::{FieldDefinition, FieldType};

/// 便捷函数：创建数组字段
pub fn array_field(
    item_type: FieldType,
    max_items: Option<usize>,
    min_items: Option<usize>,
) -> FieldDefinition {
    FieldDefinition::new(FieldType::Array {
        item_type: Box::new(item_type),
        max_items,
        min_items,
    })
}

/// 便捷函数：创建列表字段（array_field 的别名）
pub fn list_field(
    item_type: FieldType,
    max_items: Option<usize>,
    min_items: Option<usize>,
) -> FieldDefinition {
    array_field(item_type, max_items, min_items)
}

/// 便捷函数：创建字符串字段
pub fn string_field(
    max_length: Option<usize>,
    min_length: Option<usize>,
    regex: Option<String>,
) -> FieldDefinition {
    FieldDefinition::new(FieldType::String {
        max_length,
        min_length,
        regex,
    })
}

/// 便捷函数：创建整数字段
pub fn integer_field(min_value: Option<i64>, max_value: Option<i64>) -> FieldDefinition {
    FieldDefinition::new(FieldType::Integer {
        min_value,
        max_value,
    })
}

/// 便捷函数：创建浮点数字段
pub fn float_field(min_value: Option<f64>, max_value: Option<f64>) -> FieldDefinition {
    FieldDefinition::new(FieldType::Float {
        min_value,
        max_value,
    })
}

/// 便捷函数：创建布尔字段
pub fn boolean_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Boolean)
}

/// 便捷函数：创建日期时间字段
pub fn datetime_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::DateTime)
}

/// 便捷函数：创建UUID字段
pub fn uuid_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Uuid)
}

/// 便捷函数：创建JSON字段
pub fn json_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Json)
}

/// 便捷函数：创建二进制字段
pub fn binary_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Binary)
}

/// 便捷函数：创建嵌套模型字段，目标按模型名称延迟解析
///
/// 引用自身或相互引用的模型（如树节点）在特化时报循环引用配置错误
pub fn model_field(target: &str) -> FieldDefinition {
    FieldDefinition::new(FieldType::ForwardRef(target.to_string()))
}

/// 便捷函数：创建嵌套模型列表字段
///
/// 与 [`model_field`] 相同，循环引用在特化时报配置错误
pub fn model_list_field(target: &str) -> FieldDefinition {
    array_field(FieldType::ForwardRef(target.to_string()), None, None)
}
