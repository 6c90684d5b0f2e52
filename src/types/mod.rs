//! 通用数据类型
//!
//! 定义模型无关的数据值与载荷编码

pub mod data_value;
pub mod encoding;

pub use data_value::{DataValue, ValueMap, json_value_to_data_value, value_map_to_json};
pub use encoding::{Encoding, decode_payload, encode_payload};
