//! 表映射模型适配器
//!
//! 列类型通过提供者表映射为字段类型，关系映射为嵌套模型字段

use crate::adapter::{
    ExtractionMode, ModelAdapter, Purpose, TransferTypeCache, TypeRef, cached_transfer_type,
    prepare_field_values, synthesize_transfer_type,
};
use crate::config::DtoConfig;
use crate::error::DtoResult;
use crate::i18n::tf;
use crate::model::{
    AnyModel, DefaultSpec, FieldDescriptor, FieldShape, FieldType, ModelFamily, ModelSchema,
    ModelType,
};
use crate::shaping::TypeNamespace;
use crate::table::{ColumnDescriptor, ColumnType, RelationDescriptor};
use crate::transfer::TransferType;
use crate::types::{DataValue, ValueMap};
use async_trait::async_trait;
use dashmap::DashMap;
use rat_logger::{debug, info};
use std::sync::Arc;

/// 列类型到字段类型的提供者
pub type ColumnTypeProvider = Arc<dyn Fn(&ColumnType) -> FieldType + Send + Sync>;

/// 表映射模型适配器
pub struct TableAdapter {
    cache: TransferTypeCache,
    providers: DashMap<String, ColumnTypeProvider>,
}

impl TableAdapter {
    /// 创建带内置列类型提供者的适配器
    pub fn new() -> Self {
        let adapter = Self {
            cache: TransferTypeCache::new(),
            providers: DashMap::new(),
        };
        adapter.register_builtin_providers();
        adapter
    }

    pub fn cache(&self) -> &TransferTypeCache {
        &self.cache
    }

    /// 注册列类型提供者，同名提供者被替换
    ///
    /// 应在首次构建传输类型之前注册，已缓存的传输类型不会重新计算
    pub fn register_column_type<F>(&self, type_key: &str, provider: F)
    where
        F: Fn(&ColumnType) -> FieldType + Send + Sync + 'static,
    {
        info!("注册列类型提供者: {}", type_key);
        self.providers.insert(type_key.to_string(), Arc::new(provider));
    }

    /// 是否有该类型键的提供者
    pub fn has_column_type(&self, type_key: &str) -> bool {
        self.providers.contains_key(type_key)
    }

    fn register_builtin_providers(&self) {
        self.register_column_type("small_integer", |_| FieldType::Integer {
            min_value: Some(i16::MIN as i64),
            max_value: Some(i16::MAX as i64),
        });
        self.register_column_type("integer", |_| FieldType::Integer {
            min_value: Some(i32::MIN as i64),
            max_value: Some(i32::MAX as i64),
        });
        self.register_column_type("big_integer", |_| FieldType::integer());
        self.register_column_type("float", |_| FieldType::float());
        self.register_column_type("double", |_| FieldType::float());
        self.register_column_type("numeric", |_| FieldType::float());
        self.register_column_type("string", |column_type| match column_type {
            ColumnType::String { length } => FieldType::String {
                max_length: *length,
                min_length: None,
                regex: None,
            },
            _ => FieldType::string(),
        });
        self.register_column_type("text", |_| FieldType::string());
        self.register_column_type("boolean", |_| FieldType::Boolean);
        self.register_column_type("datetime", |_| FieldType::DateTime);
        self.register_column_type("date", |_| pattern(r"^\d{4}-\d{2}-\d{2}$".to_string()));
        self.register_column_type("time", |_| {
            pattern(r"^\d{2}:\d{2}(:\d{2}(\.\d+)?)?$".to_string())
        });
        self.register_column_type("uuid", |_| FieldType::Uuid);
        self.register_column_type("json", |_| FieldType::Json);
        self.register_column_type("large_binary", |_| FieldType::Binary);
        self.register_column_type("enum", |column_type| match column_type {
            ColumnType::Enum(choices) => {
                let alternatives: Vec<String> =
                    choices.iter().map(|choice| regex::escape(choice)).collect();
                pattern(format!("^(?:{})$", alternatives.join("|")))
            }
            _ => FieldType::string(),
        });
    }

    /// 列类型对应的字段类型，没有提供者时返回 `ConfigurationError`
    pub fn field_type_for(&self, column: &str, column_type: &ColumnType) -> DtoResult<FieldType> {
        if let ColumnType::Array(item) = column_type {
            return Ok(FieldType::array(self.field_type_for(column, item)?));
        }

        let type_key = column_type.type_key();
        // 克隆提供者后立即释放分片锁，提供者内部可能再次访问适配器
        let provider = self
            .providers
            .get(&type_key)
            .map(|entry| Arc::clone(entry.value()));
        match provider {
            Some(provider) => Ok(provider(column_type)),
            None => Err(crate::dto_error!(
                config,
                tf(
                    "error.unknown_column_type",
                    &[("column", column), ("column_type", type_key.as_str())]
                )
            )),
        }
    }

    fn column_descriptor(&self, column: &ColumnDescriptor) -> DtoResult<FieldDescriptor> {
        let field_type = self.field_type_for(&column.name, &column.column_type)?;
        let default = match (&column.default, column.nullable) {
            (Some(value), _) => DefaultSpec::Value(value.clone()),
            (None, true) => DefaultSpec::Value(DataValue::Null),
            (None, false) => DefaultSpec::Required,
        };
        Ok(descriptor(&column.name, field_type, column.nullable, default))
    }

    fn relation_descriptor(relation: &RelationDescriptor) -> FieldDescriptor {
        let target = FieldType::ForwardRef(relation.target.clone());
        if relation.many {
            descriptor(
                &relation.name,
                FieldType::array(target),
                false,
                DefaultSpec::Value(DataValue::Array(Vec::new())),
            )
        } else {
            descriptor(&relation.name, target, true, DefaultSpec::Value(DataValue::Null))
        }
    }

    /// 表模型的字段描述符
    ///
    /// 入站用途去掉主键与关系；`construct` 为真时主键缺失按空值处理
    fn table_fields(
        &self,
        model: &ModelType,
        purpose: Purpose,
        construct: bool,
    ) -> DtoResult<Vec<FieldDescriptor>> {
        let ModelSchema::Table {
            columns, relations, ..
        } = model.schema()
        else {
            return Err(crate::dto_error!(
                config,
                tf("error.not_table_model", &[("model", model.name())])
            ));
        };

        let mut fields = Vec::with_capacity(columns.len() + relations.len());
        for column in columns {
            if column.primary_key && purpose == Purpose::Inbound {
                continue;
            }
            let mut field = self.column_descriptor(column)?;
            if column.primary_key && construct && field.default.is_required() {
                field.nullable = true;
                field.default = DefaultSpec::Value(DataValue::Null);
            }
            fields.push(field);
        }
        if purpose == Purpose::Outbound {
            fields.extend(relations.iter().map(Self::relation_descriptor));
        }
        Ok(fields)
    }
}

impl Default for TableAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TableAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        f.debug_struct("TableAdapter")
            .field("cache", &self.cache)
            .field("providers", &keys)
            .finish()
    }
}

fn pattern(regex: String) -> FieldType {
    FieldType::String {
        max_length: None,
        min_length: None,
        regex: Some(regex),
    }
}

fn descriptor(name: &str, field_type: FieldType, nullable: bool, default: DefaultSpec) -> FieldDescriptor {
    let (inner_type, shape) = match &field_type {
        FieldType::Array { item_type, .. } => ((**item_type).clone(), FieldShape::Sequence),
        other => (other.clone(), FieldShape::Singleton),
    };
    FieldDescriptor {
        name: name.to_string(),
        outer_type: field_type,
        inner_type,
        shape,
        nullable,
        default,
        read_only: false,
        description: None,
    }
}

#[async_trait]
impl ModelAdapter for TableAdapter {
    fn name(&self) -> &str {
        "table"
    }

    fn is_supported(&self, type_ref: &TypeRef) -> bool {
        type_ref
            .model()
            .is_some_and(|model| model.family() == ModelFamily::Table)
    }

    fn extraction_mode(&self) -> ExtractionMode {
        ExtractionMode::AsyncOnly
    }

    fn build_transfer_type(
        &self,
        model: &Arc<ModelType>,
        config: &DtoConfig,
        namespace: &TypeNamespace,
    ) -> DtoResult<Arc<TransferType>> {
        cached_transfer_type(&self.cache, model, config, namespace, || {
            let fields = self.table_fields(model, config.purpose, false)?;
            debug!("为表模型 {} 构建传输类型 ({:?})", model.name(), config.purpose);
            synthesize_transfer_type(model, &fields, config, namespace, &self.cache)
        })
    }

    fn construct_model(&self, model: &ModelType, values: ValueMap) -> DtoResult<Box<AnyModel>> {
        let fields = self.table_fields(model, Purpose::Outbound, true)?;
        let prepared = prepare_field_values(model, &fields, values, true)?;
        model.construct(&prepared)
    }
}
