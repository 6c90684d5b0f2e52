//! 适配器与注册表集成测试

use async_trait::async_trait;
use rat_quickdto::adapter::{ExtractionMode, ModelAdapter, RecordAdapter, TypeRef};
use rat_quickdto::manager;
use rat_quickdto::model::{AnyModel, ModelType, model_to_values};
use rat_quickdto::shaping::TypeNamespace;
use rat_quickdto::{
    ColumnDescriptor, ColumnType, DataValue, DtoConfig, DtoError, DtoFactory, DtoResult,
    Encoding, FieldType, Purpose, RelationDescriptor, TableModel, TransferType, ValueMap,
    define_record, impl_dto_model, string_field,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Book {
        title: String,
    }

    name = "Book",
    fields = {
        title: string_field(None, None, None).required(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Author {
    id: Option<i64>,
    name: String,
    born: Option<String>,
    books: Vec<Book>,
}

#[async_trait]
impl TableModel for Author {
    fn table_name() -> &'static str {
        "author"
    }

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", ColumnType::BigInteger).primary_key(),
            ColumnDescriptor::new("name", ColumnType::String { length: Some(40) }),
            ColumnDescriptor::new("born", ColumnType::Date).nullable(),
        ]
    }

    fn relations() -> Vec<RelationDescriptor> {
        vec![RelationDescriptor::many("books", "Book")]
    }

    async fn load_values(&self) -> anyhow::Result<ValueMap> {
        // 模拟惰性加载关系
        tokio::task::yield_now().await;
        Ok(model_to_values(self)?)
    }
}

impl_dto_model!(Author => table);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SlowRow {
    id: i64,
}

#[async_trait]
impl TableModel for SlowRow {
    fn table_name() -> &'static str {
        "slow_row"
    }

    fn columns() -> Vec<ColumnDescriptor> {
        vec![ColumnDescriptor::new("id", ColumnType::Integer).primary_key()]
    }

    async fn load_values(&self) -> anyhow::Result<ValueMap> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(model_to_values(self)?)
    }
}

impl_dto_model!(SlowRow => table);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BrokenRow {
    id: i64,
}

#[async_trait]
impl TableModel for BrokenRow {
    fn table_name() -> &'static str {
        "broken_row"
    }

    fn columns() -> Vec<ColumnDescriptor> {
        vec![ColumnDescriptor::new("id", ColumnType::Integer).primary_key()]
    }

    async fn load_values(&self) -> anyhow::Result<ValueMap> {
        Err(anyhow::anyhow!("connection reset by peer"))
    }
}

impl_dto_model!(BrokenRow => table);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Parcel {
    id: i64,
    area: serde_json::Value,
}

#[async_trait]
impl TableModel for Parcel {
    fn table_name() -> &'static str {
        "parcel"
    }

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", ColumnType::Integer).primary_key(),
            ColumnDescriptor::new("area", ColumnType::Custom("geometry".to_string())),
        ]
    }

    async fn load_values(&self) -> anyhow::Result<ValueMap> {
        Ok(model_to_values(self)?)
    }
}

impl_dto_model!(Parcel => table);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Ledger {
    amount: String,
}

#[async_trait]
impl TableModel for Ledger {
    fn table_name() -> &'static str {
        "ledger"
    }

    fn columns() -> Vec<ColumnDescriptor> {
        vec![ColumnDescriptor::new("amount", ColumnType::Custom("money".to_string()))]
    }

    async fn load_values(&self) -> anyhow::Result<ValueMap> {
        Ok(model_to_values(self)?)
    }
}

impl_dto_model!(Ledger => table);

fn author() -> Author {
    Author {
        id: Some(3),
        name: "Ursula".to_string(),
        born: Some("1929-10-21".to_string()),
        books: vec![Book {
            title: "The Dispossessed".to_string(),
        }],
    }
}

#[tokio::test]
async fn test_table_model_async_round_trip() {
    manager::register_model::<Book>();
    let dto_type = DtoFactory::tables().specialize::<Author>().unwrap();
    assert_eq!(
        dto_type.transfer_type().field_names(),
        vec!["id", "name", "born", "books"]
    );

    let dto = dto_type.from_model_async(&author()).await.unwrap();
    assert_eq!(dto.get("id"), Some(&DataValue::Int(3)));
    assert_eq!(dto.to_model().unwrap(), author());
}

#[test]
fn test_table_model_sync_extraction_fails() {
    manager::register_model::<Book>();
    let dto_type = DtoFactory::new("Dto").specialize::<Author>().unwrap();
    assert_eq!(dto_type.adapter().extraction_mode(), ExtractionMode::AsyncOnly);
    let err = dto_type.from_model(&author()).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_table_inbound_payload() {
    manager::register_model::<Book>();
    let inbound = DtoConfig::default().with_purpose(Purpose::Inbound);
    let dto_type = DtoFactory::tables().specialize_with::<Author>(inbound).unwrap();
    assert_eq!(dto_type.transfer_type().field_names(), vec!["name", "born"]);

    let dto = dto_type
        .from_buffer(br#"{"name": "Ursula"}"#, Encoding::Json)
        .unwrap();
    assert_eq!(dto.get("born"), Some(&DataValue::Null));
    let created = dto.to_model().unwrap();
    assert_eq!(created.id, None);
    assert!(created.books.is_empty());

    let bad_date = dto_type
        .from_buffer(br#"{"name": "Ursula", "born": "yesterday"}"#, Encoding::Json)
        .unwrap_err();
    assert_eq!(bad_date.field_errors()[0].path, "born");

    let too_long = format!(r#"{{"name": "{}"}}"#, "x".repeat(41));
    assert!(dto_type
        .from_buffer(too_long.as_bytes(), Encoding::Json)
        .unwrap_err()
        .is_validation());
}

#[tokio::test]
async fn test_cancellation_propagates() {
    let dto_type = DtoFactory::tables().specialize::<SlowRow>().unwrap();
    let row = SlowRow { id: 1 };
    let result =
        tokio::time::timeout(Duration::from_millis(20), dto_type.from_model_async(&row)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_adapter_errors_pass_through() {
    let dto_type = DtoFactory::tables().specialize::<BrokenRow>().unwrap();
    let err = dto_type.from_model_async(&BrokenRow { id: 1 }).await.unwrap_err();
    assert!(matches!(err, DtoError::AdapterError(_)));
    assert_eq!(err.to_string(), "connection reset by peer");
}

#[test]
fn test_custom_column_type_provider() {
    let err = DtoFactory::tables().specialize::<Ledger>().unwrap_err();
    assert!(err.is_configuration());

    manager::table_adapter().register_column_type("geometry", |_| FieldType::Json);
    let dto_type = DtoFactory::tables().specialize::<Parcel>().unwrap();
    assert_eq!(
        dto_type.transfer_type().field("area").unwrap().field_type,
        FieldType::Json
    );
}

/// 只处理 `Book` 的自定义适配器，标题统一转为大写
struct ShoutingAdapter {
    inner: RecordAdapter,
}

#[async_trait]
impl ModelAdapter for ShoutingAdapter {
    fn name(&self) -> &str {
        "shouting"
    }

    fn is_supported(&self, type_ref: &TypeRef) -> bool {
        type_ref.model().is_some_and(|model| model.is::<Book>())
    }

    fn extraction_mode(&self) -> ExtractionMode {
        ExtractionMode::Sync
    }

    fn build_transfer_type(
        &self,
        model: &Arc<ModelType>,
        config: &DtoConfig,
        namespace: &TypeNamespace,
    ) -> DtoResult<Arc<TransferType>> {
        self.inner.build_transfer_type(model, config, namespace)
    }

    fn extract_values(&self, model: &ModelType, instance: &AnyModel) -> DtoResult<ValueMap> {
        let mut values = self.inner.extract_values(model, instance)?;
        if let Some(DataValue::String(title)) = values.get_mut("title") {
            *title = title.to_uppercase();
        }
        Ok(values)
    }

    fn construct_model(&self, model: &ModelType, values: ValueMap) -> DtoResult<Box<AnyModel>> {
        self.inner.construct_model(model, values)
    }
}

#[test]
fn test_custom_adapter_registration_order() {
    manager::register_adapter(Arc::new(ShoutingAdapter {
        inner: RecordAdapter::new(),
    }));

    // 内置适配器先注册，先匹配
    let found = manager::find_registered_adapter(&TypeRef::of::<Book>()).unwrap();
    assert_eq!(found.name(), "record");

    let pinned = DtoFactory::new("Shout").with_adapter(Arc::new(ShoutingAdapter {
        inner: RecordAdapter::new(),
    }));
    let dto_type = pinned.specialize::<Book>().unwrap();
    let dto = dto_type
        .from_model(&Book {
            title: "quiet".to_string(),
        })
        .unwrap();
    assert_eq!(dto.get("title"), Some(&DataValue::String("QUIET".to_string())));

    let err = pinned.specialize::<Author>().unwrap_err();
    assert!(err.is_configuration());
}
