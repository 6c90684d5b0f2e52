//! 模型数据转换模块
//!
//! 提供模型实例与DataValue映射之间的双向转换

use crate::debug_log;
use crate::error::DtoResult;
use crate::types::{DataValue, ValueMap};
use serde::de::IntoDeserializer;

/// 从DataValue映射直接创建模型实例
///
/// 直接从值映射反序列化，避免JSON中转；缺失的字段交给模型自身的
/// serde 属性处理（`Option` 为 None，`#[serde(default)]` 使用默认值）
pub fn create_model_from_values<T>(values: &ValueMap) -> DtoResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let deserializer = DataValueDeserializer::new(values);

    T::deserialize(deserializer).map_err(|e| {
        crate::dto_error!(
            serialization,
            format!("无法从DataValue映射创建模型实例 {}: {}", std::any::type_name::<T>(), e)
        )
    })
}

/// 将模型实例转换为DataValue映射
///
/// 通过 serde_json 序列化，模型必须序列化为对象
pub fn model_to_values<T: serde::Serialize>(model: &T) -> DtoResult<ValueMap> {
    let json_value = serde_json::to_value(model)
        .map_err(|e| crate::dto_error!(serialization, format!("序列化失败: {}", e)))?;

    match DataValue::from_json(json_value) {
        DataValue::Object(map) => {
            debug_log!("🔍 模型 {} 提取了 {} 个字段", std::any::type_name::<T>(), map.len());
            Ok(map)
        }
        other => Err(crate::dto_error!(
            serialization,
            format!(
                "模型 {} 没有序列化为对象，而是 {}",
                std::any::type_name::<T>(),
                other.type_name()
            )
        )),
    }
}

/// DataValue映射的反序列化器
///
/// 实现serde::de::Deserializer trait，直接从DataValue读取数据
struct DataValueDeserializer<'a> {
    data_map: &'a ValueMap,
}

impl<'a> DataValueDeserializer<'a> {
    fn new(data_map: &'a ValueMap) -> Self {
        Self { data_map }
    }
}

impl<'a, 'de> serde::de::Deserializer<'de> for DataValueDeserializer<'a> {
    type Error = serde_json::Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        visitor.visit_map(DataValueMapDeserializer::new(self.data_map))
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string bytes
        byte_buf unit unit_struct seq tuple tuple_struct enum identifier ignored_any
        newtype_struct map struct
    }
}

/// 用于Map访问的反序列化器
///
/// 只遍历实际存在的键，缺失字段由 serde 派生代码报告或补默认值
struct DataValueMapDeserializer<'a> {
    entries: std::collections::hash_map::Iter<'a, String, DataValue>,
    pending: Option<&'a DataValue>,
}

impl<'a> DataValueMapDeserializer<'a> {
    fn new(data: &'a ValueMap) -> Self {
        Self {
            entries: data.iter(),
            pending: None,
        }
    }
}

impl<'a, 'de> serde::de::MapAccess<'de> for DataValueMapDeserializer<'a> {
    type Error = serde_json::Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: serde::de::DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                let key_deserializer: serde::de::value::StrDeserializer<'_, Self::Error> =
                    key.as_str().into_deserializer();
                seed.deserialize(key_deserializer).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::DeserializeSeed<'de>,
    {
        match self.pending.take() {
            Some(value) => seed.deserialize(DataValueSingleDeserializer::new(value)),
            None => Err(serde::de::Error::custom("键访问错误")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// 单个DataValue的反序列化器
struct DataValueSingleDeserializer<'a> {
    data_value: &'a DataValue,
}

impl<'a> DataValueSingleDeserializer<'a> {
    fn new(data_value: &'a DataValue) -> Self {
        Self { data_value }
    }
}

impl<'a, 'de> serde::de::Deserializer<'de> for DataValueSingleDeserializer<'a> {
    type Error = serde_json::Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        match self.data_value {
            DataValue::Null => visitor.visit_unit(),
            DataValue::Bool(b) => visitor.visit_bool(*b),
            DataValue::Int(i) => visitor.visit_i64(*i),
            DataValue::UInt(u) => visitor.visit_u64(*u),
            DataValue::Float(f) => visitor.visit_f64(*f),
            DataValue::String(s) => visitor.visit_str(s),
            DataValue::Array(arr) => visitor.visit_seq(DataValueArrayDeserializer::new(arr)),
            DataValue::Object(obj) => visitor.visit_map(DataValueMapDeserializer::new(obj)),
            DataValue::Bytes(bytes) => {
                // Vec<u8> 按序列反序列化
                let seq = serde::de::value::SeqDeserializer::<_, Self::Error>::new(
                    bytes.iter().copied(),
                );
                visitor.visit_seq(seq)
            }
            DataValue::DateTime(dt) => visitor.visit_str(&dt.to_rfc3339()),
            DataValue::Uuid(u) => visitor.visit_str(&u.to_string()),
            // JSON值交给 serde_json 自己的反序列化器
            DataValue::Json(json) => serde::Deserializer::deserialize_any(json.clone(), visitor),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        match self.data_value {
            DataValue::Null => visitor.visit_none(),
            DataValue::Json(serde_json::Value::Null) => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        match self.data_value {
            DataValue::Bytes(bytes) => visitor.visit_bytes(bytes),
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: serde::de::Visitor<'de>,
    {
        // 单元变体以字符串表示，其余形式按JSON外部标记解析
        match self.data_value {
            DataValue::String(s) => {
                let variant: serde::de::value::StrDeserializer<'_, Self::Error> =
                    s.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            other => serde::Deserializer::deserialize_enum(
                other.to_json_value(),
                name,
                variants,
                visitor,
            ),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct seq map tuple tuple_struct
        ignored_any identifier struct newtype_struct
    }
}

/// DataValue数组的反序列化器
struct DataValueArrayDeserializer<'a> {
    items: std::slice::Iter<'a, DataValue>,
}

impl<'a> DataValueArrayDeserializer<'a> {
    fn new(array: &'a [DataValue]) -> Self {
        Self {
            items: array.iter(),
        }
    }
}

impl<'a, 'de> serde::de::SeqAccess<'de> for DataValueArrayDeserializer<'a> {
    type Error = serde_json::Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: serde::de::DeserializeSeed<'de>,
    {
        match self.items.next() {
            Some(data_value) => seed
                .deserialize(DataValueSingleDeserializer::new(data_value))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}
