//! 模型相关的宏定义
//!
//! 提供便捷的宏来定义模型和字段类型

/// 便捷宏：定义模型字段类型
#[macro_export]
macro_rules! field_types {
    (string) => {
        $crate::model::field_types::FieldType::String {
            max_length: None,
            min_length: None,
            regex: None,
        }
    };
    (string, max_length = $max:expr) => {
        $crate::model::field_types::FieldType::String {
            max_length: Some($max),
            min_length: None,
            regex: None,
        }
    };
    (string, min_length = $min:expr) => {
        $crate::model::field_types::FieldType::String {
            max_length: None,
            min_length: Some($min),
            regex: None,
        }
    };
    (string, max_length = $max:expr, min_length = $min:expr) => {
        $crate::model::field_types::FieldType::String {
            max_length: Some($max),
            min_length: Some($min),
            regex: None,
        }
    };
    (string, regex = $pattern:expr) => {
        $crate::model::field_types::FieldType::String {
            max_length: None,
            min_length: None,
            regex: Some($pattern.to_string()),
        }
    };
    (integer) => {
        $crate::model::field_types::FieldType::Integer {
            min_value: None,
            max_value: None,
        }
    };
    (integer, min = $min:expr) => {
        $crate::model::field_types::FieldType::Integer {
            min_value: Some($min),
            max_value: None,
        }
    };
    (integer, max = $max:expr) => {
        $crate::model::field_types::FieldType::Integer {
            min_value: None,
            max_value: Some($max),
        }
    };
    (integer, min = $min:expr, max = $max:expr) => {
        $crate::model::field_types::FieldType::Integer {
            min_value: Some($min),
            max_value: Some($max),
        }
    };
    (float) => {
        $crate::model::field_types::FieldType::Float {
            min_value: None,
            max_value: None,
        }
    };
    (float, min = $min:expr) => {
        $crate::model::field_types::FieldType::Float {
            min_value: Some($min),
            max_value: None,
        }
    };
    (float, min = $min:expr, max = $max:expr) => {
        $crate::model::field_types::FieldType::Float {
            min_value: Some($min),
            max_value: Some($max),
        }
    };
    (boolean) => {
        $crate::model::field_types::FieldType::Boolean
    };
    (datetime) => {
        $crate::model::field_types::FieldType::DateTime
    };
    (uuid) => {
        $crate::model::field_types::FieldType::Uuid
    };
    (json) => {
        $crate::model::field_types::FieldType::Json
    };
    (binary) => {
        $crate::model::field_types::FieldType::Binary
    };
    (array, $item_type:expr) => {
        $crate::model::field_types::FieldType::Array {
            item_type: Box::new($item_type),
            max_items: None,
            min_items: None,
        }
    };
    (model, $target:expr) => {
        $crate::model::field_types::FieldType::ForwardRef($target.to_string())
    };
}

/// 便捷宏：为模型实现 `DtoModel`
///
/// 模型描述在首次访问时构建一次，并自动注册到全局模型注册表，
/// 之后其他模型的前向引用可以按名称解析到它
#[macro_export]
macro_rules! impl_dto_model {
    ($name:ty => record) => {
        $crate::impl_dto_model!(@impl $name, record);
    };
    ($name:ty => validated) => {
        $crate::impl_dto_model!(@impl $name, validated);
    };
    ($name:ty => table) => {
        $crate::impl_dto_model!(@impl $name, table);
    };
    (@impl $name:ty, $ctor:ident) => {
        impl $crate::model::traits::DtoModel for $name {
            fn model_type() -> std::sync::Arc<$crate::model::traits::ModelType> {
                static MODEL_TYPE: $crate::__private::Lazy<
                    std::sync::Arc<$crate::model::traits::ModelType>,
                > = $crate::__private::Lazy::new(|| {
                    let model_type =
                        std::sync::Arc::new($crate::model::traits::ModelType::$ctor::<$name>());
                    $crate::manager::register_model_type(std::sync::Arc::clone(&model_type));
                    model_type
                });
                std::sync::Arc::clone(&MODEL_TYPE)
            }
        }
    };
}

/// 便捷宏：定义普通记录模型
#[macro_export]
macro_rules! define_record {
    (
        $(#[$meta:meta])*
        struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $field_type:ty,
            )*
        }

        name = $record_name:expr,
        fields = {
            $(
                $field_name:ident: $field_def:expr,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(serde::Serialize, serde::Deserialize)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $field_type,
            )*
        }

        impl $crate::model::traits::RecordModel for $name {
            fn record_name() -> &'static str {
                $record_name
            }

            fn fields() -> Vec<(&'static str, $crate::model::field_types::FieldDefinition)> {
                vec![
                    $(
                        (stringify!($field_name), $field_def),
                    )*
                ]
            }
        }

        $crate::impl_dto_model!($name => record);
    };
}
