//! DTO工厂端到端测试

use rat_quickdto::{
    DataValue, DtoConfig, DtoFactory, DtoModel, Encoding, ExtraField, FieldError, FieldType,
    Purpose, UnknownFields, ValidatedModel, ValueMap, binary_field, define_record, float_field,
    impl_dto_model, integer_field, list_field, manager, model_list_field, string_field,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Company {
        id: i64,
        name: String,
        worth: f64,
    }

    name = "Company",
    fields = {
        id: integer_field(None, None).required(),
        name: string_field(None, None, None).required(),
        worth: float_field(None, None).required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Branch {
        id: i64,
        city: String,
    }

    name = "Branch",
    fields = {
        id: integer_field(None, None).required(),
        city: string_field(None, None, None).required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Attachment {
        id: i64,
        data: Vec<u8>,
    }

    name = "Attachment",
    fields = {
        id: integer_field(None, None).required(),
        data: binary_field().required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Memo {
        id: i64,
        score: Option<i64>,
        tags: Vec<String>,
    }

    name = "Memo",
    fields = {
        id: integer_field(None, None).required(),
        score: integer_field(None, None),
        tags: list_field(FieldType::string(), None, None).required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Office {
        id: i64,
        city: String,
    }

    name = "Office",
    fields = {
        id: integer_field(None, None).default_value(0i64),
        city: string_field(None, None, None).required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Measure {
        first: i64,
        second: i64,
    }

    name = "Measure",
    fields = {
        first: integer_field(None, None).required(),
        second: integer_field(None, None).required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Employee {
        name: String,
        title: Option<String>,
    }

    name = "Employee",
    fields = {
        name: string_field(None, None, None).required(),
        title: string_field(None, None, None),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Department {
        name: String,
        staff: Vec<Employee>,
    }

    name = "Department",
    fields = {
        name: string_field(None, None, None).required(),
        staff: model_list_field("Employee").required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct LoopA {
        peers: Vec<LoopB>,
    }

    name = "LoopA",
    fields = {
        peers: model_list_field("LoopB").required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct LoopB {
        peers: Vec<LoopA>,
    }

    name = "LoopB",
    fields = {
        peers: model_list_field("LoopA").required(),
    }
}

define_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct TreeNode {
        label: String,
        children: Vec<TreeNode>,
    }

    name = "TreeNode",
    fields = {
        label: string_field(None, None, None).required(),
        children: model_list_field("TreeNode").required(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Signup {
    username: String,
    password: String,
    age: i64,
}

impl ValidatedModel for Signup {
    fn model_name() -> &'static str {
        "Signup"
    }

    fn fields() -> Vec<(&'static str, rat_quickdto::FieldDefinition)> {
        vec![
            ("username", string_field(Some(12), Some(3), None).required()),
            ("password", string_field(None, Some(8), None).required()),
            ("age", integer_field(Some(18), None).required()),
        ]
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        if self.password.contains(&self.username) {
            return Err(vec![FieldError::new("password", "密码不能包含用户名")]);
        }
        Ok(())
    }
}

impl_dto_model!(Signup => validated);

fn acme() -> Company {
    Company {
        id: 1,
        name: "Acme".to_string(),
        worth: 100.0,
    }
}

#[test]
fn test_round_trip_identity() {
    println!("🔍 测试模型 -> DTO -> 模型往返");
    let dto_type = DtoFactory::new("Dto").specialize::<Company>().unwrap();
    assert_eq!(dto_type.transfer_type().field_names(), vec!["id", "name", "worth"]);
    assert_eq!(
        dto_type.transfer_type().field("worth").unwrap().field_type,
        FieldType::float()
    );

    let dto = dto_type.from_model(&acme()).unwrap();
    assert_eq!(dto.get("worth"), Some(&DataValue::Float(100.0)));
    assert_eq!(dto.to_model().unwrap(), acme());

    let bytes = dto.to_bytes(Encoding::Json).unwrap();
    let parsed = dto_type.from_buffer(&bytes, Encoding::Json).unwrap();
    assert_eq!(parsed.to_model().unwrap(), acme());
}

#[test]
fn test_excluded_id_is_ignored_by_default() {
    let config = DtoConfig::builder().exclude("id").build().unwrap();
    let dto_type = DtoFactory::new("Dto").specialize_with::<Company>(config).unwrap();
    assert_eq!(dto_type.transfer_type().field_names(), vec!["name", "worth"]);

    let dto = dto_type
        .from_buffer(br#"{"name":"Acme","worth":100.0}"#, Encoding::Json)
        .unwrap();
    assert_eq!(dto.get("worth"), Some(&DataValue::Float(100.0)));

    let payload = br#"{"id": 1, "name": "Acme", "worth": 10.5}"#;
    let dto = dto_type.from_buffer(payload, Encoding::Json).unwrap();
    assert!(dto.get("id").is_none());

    // 模型的 id 必填且没有默认值，构造失败
    let err = dto.to_model().unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_excluded_id_is_rejected_under_forbid() {
    let config = DtoConfig::builder()
        .exclude("id")
        .unknown_fields(UnknownFields::Forbid)
        .build()
        .unwrap();
    let dto_type = DtoFactory::new("Dto").specialize_with::<Company>(config).unwrap();

    let payload = br#"{"id": 1, "name": "Acme", "worth": 100.0}"#;
    let err = dto_type.from_buffer(payload, Encoding::Json).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.field_errors()[0].path, "id");
}

#[test]
fn test_excluded_field_with_model_default() {
    let config = DtoConfig::builder().exclude("id").build().unwrap();
    let dto_type = DtoFactory::records().specialize_with::<Office>(config).unwrap();
    let dto = dto_type
        .from_buffer(br#"{"city": "Oslo"}"#, Encoding::Json)
        .unwrap();
    assert_eq!(
        dto.to_model().unwrap(),
        Office {
            id: 0,
            city: "Oslo".to_string()
        }
    );
}

#[test]
fn test_rename_and_retype() {
    println!("🔍 测试 first/second -> third/fourth");
    let config = DtoConfig::builder()
        .rename("first", "third")
        .retype("second", "fourth", FieldType::float())
        .build()
        .unwrap();
    let dto_type = DtoFactory::new("Dto").specialize_with::<Measure>(config).unwrap();
    assert_eq!(dto_type.transfer_type().field_names(), vec!["third", "fourth"]);
    assert_eq!(
        dto_type.transfer_type().field("fourth").unwrap().field_type,
        FieldType::float()
    );

    let dto = dto_type.from_model(&Measure { first: 1, second: 2 }).unwrap();
    assert_eq!(dto.get("third"), Some(&DataValue::Int(1)));
    assert_eq!(dto.get("fourth"), Some(&DataValue::Float(2.0)));
    assert!(dto.get("first").is_none());

    let incoming = dto_type
        .from_buffer(br#"{"third": 5, "fourth": 6.0}"#, Encoding::Json)
        .unwrap();
    assert_eq!(incoming.to_model().unwrap(), Measure { first: 5, second: 6 });

    // 非整数的浮点数无法回到整数字段
    let lossy = dto_type
        .from_buffer(br#"{"third": 5, "fourth": 6.5}"#, Encoding::Json)
        .unwrap();
    assert!(lossy.to_model().unwrap_err().is_validation());
}

#[test]
fn test_additive_fields_and_collisions() {
    let config = DtoConfig::builder()
        .field(ExtraField::with_default("source", FieldType::string(), "api"))
        .field(ExtraField::optional("note", FieldType::string()))
        .build()
        .unwrap();
    let dto_type = DtoFactory::new("Dto").specialize_with::<Company>(config).unwrap();
    assert_eq!(
        dto_type.transfer_type().field_names(),
        vec!["id", "name", "worth", "source", "note"]
    );

    let dto = dto_type.from_model(&acme()).unwrap();
    assert_eq!(dto.get("source"), Some(&DataValue::String("api".to_string())));
    // 附加字段在构造模型前被去掉
    assert_eq!(dto.to_model().unwrap(), acme());

    let clash = DtoConfig::builder()
        .field(ExtraField::optional("name", FieldType::string()))
        .build()
        .unwrap();
    let err = DtoFactory::new("Dto").specialize_with::<Company>(clash).unwrap_err();
    assert!(err.is_configuration());

    let clash_after_rename = DtoConfig::builder()
        .rename("first", "third")
        .field(ExtraField::optional("third", FieldType::string()))
        .build()
        .unwrap();
    assert!(DtoFactory::new("Dto")
        .specialize_with::<Measure>(clash_after_rename)
        .unwrap_err()
        .is_configuration());
}

#[test]
fn test_specialization_is_cached() {
    let factory = DtoFactory::new("Dto");
    let config = || DtoConfig::builder().exclude("worth").build().unwrap();

    let first = factory.specialize_with::<Company>(config()).unwrap();
    let second = factory.specialize_with::<Company>(config()).unwrap();
    assert!(Arc::ptr_eq(first.transfer_type(), second.transfer_type()));

    let other = factory.specialize_with::<Company>(DtoConfig::default()).unwrap();
    assert!(!Arc::ptr_eq(first.transfer_type(), other.transfer_type()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_specialization_is_consistent() {
    // 所有任务在屏障处汇合后同时首次特化
    let barrier = Arc::new(tokio::sync::Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let config = DtoConfig::builder().rename("city", "location").build().unwrap();
            DtoFactory::new("Dto")
                .specialize_with::<Branch>(config)
                .map(|dto_type| Arc::clone(dto_type.transfer_type()))
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }
    for transfer in &results[1..] {
        assert_eq!(**transfer, *results[0]);
    }
    assert_eq!(results[0].field_names(), vec!["id", "location"]);

    let adapter = manager::record_adapter();
    assert_eq!(adapter.cache().len_for(&Branch::model_type(), Purpose::Outbound), 1);
}

#[tokio::test]
async fn test_sync_and_async_extraction_agree() {
    let dto_type = DtoFactory::new("Dto").specialize::<Company>().unwrap();
    let sync_dto = dto_type.from_model(&acme()).unwrap();
    let async_dto = dto_type.from_model_async(&acme()).await.unwrap();
    assert_eq!(sync_dto, async_dto);
}

#[test]
fn test_array_from_buffer_reports_indexed_paths() {
    let dto_type = DtoFactory::new("Dto").specialize::<Company>().unwrap();
    let payload = br#"[
        {"id": 1, "name": "A", "worth": 1.5},
        {"id": 2, "name": "B", "worth": "many"}
    ]"#;
    let err = dto_type.array_from_buffer(payload, Encoding::Json).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.field_errors()[0].path, "1.worth");

    let good = br#"[{"id": 1, "name": "A", "worth": 1}, {"id": 2, "name": "B", "worth": "3.5"}]"#;
    let companies = dto_type.models_from_buffer(good, Encoding::Json).unwrap();
    assert_eq!(companies.len(), 2);
    assert_eq!(companies[1].worth, 3.5);
}

#[test]
fn test_form_encoded_payload() {
    let dto_type = DtoFactory::new("Dto").specialize::<Company>().unwrap();
    let dto = dto_type
        .from_buffer(b"id=7&name=Acme+Corp&worth=12.5", Encoding::UrlEncoded)
        .unwrap();
    let company = dto.to_model().unwrap();
    assert_eq!(company.id, 7);
    assert_eq!(company.name, "Acme Corp");
    assert_eq!(company.worth, 12.5);
}

#[test]
fn test_form_output_round_trips() {
    let dto_type = DtoFactory::records().specialize::<Memo>().unwrap();
    let memo = Memo {
        id: 1,
        score: None,
        tags: vec![],
    };
    let bytes = dto_type.from_model(&memo).unwrap().to_bytes(Encoding::UrlEncoded).unwrap();
    assert_eq!(bytes, b"id=1".to_vec());
    let parsed = dto_type.from_buffer(&bytes, Encoding::UrlEncoded).unwrap();
    assert_eq!(parsed.to_model().unwrap(), memo);

    let tagged = Memo {
        id: 2,
        score: Some(7),
        tags: vec!["red".to_string(), "dark blue".to_string()],
    };
    let bytes = dto_type.from_model(&tagged).unwrap().to_bytes(Encoding::UrlEncoded).unwrap();
    let parsed = dto_type.from_buffer(&bytes, Encoding::UrlEncoded).unwrap();
    assert_eq!(parsed.to_model().unwrap(), tagged);
}

#[test]
fn test_binary_field_round_trip() {
    let dto_type = DtoFactory::records().specialize::<Attachment>().unwrap();
    let attachment = Attachment {
        id: 1,
        data: vec![1, 2, 3],
    };
    let dto = dto_type.from_model(&attachment).unwrap();
    assert_eq!(dto.get("data"), Some(&DataValue::Bytes(vec![1, 2, 3])));
    assert_eq!(dto.to_model().unwrap(), attachment);

    let bytes = dto.to_bytes(Encoding::Json).unwrap();
    let parsed = dto_type.from_buffer(&bytes, Encoding::Json).unwrap();
    assert_eq!(parsed.to_model().unwrap(), attachment);
}

#[test]
fn test_from_values_validates() {
    let dto_type = DtoFactory::new("Dto").specialize::<Company>().unwrap();
    let missing = dto_type
        .from_values(ValueMap::from([("name".to_string(), DataValue::from("x"))]))
        .unwrap_err();
    assert!(missing.is_validation());
    let paths: Vec<&str> = missing.field_errors().iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["id", "worth"]);
}

#[test]
fn test_nested_forward_references() {
    rat_quickdto::register_model::<Employee>();
    let dto_type = DtoFactory::new("Dto").specialize::<Department>().unwrap();

    let department = Department {
        name: "R&D".to_string(),
        staff: vec![Employee {
            name: "Ada".to_string(),
            title: Some("Lead".to_string()),
        }],
    };
    let dto = dto_type.from_model(&department).unwrap();
    assert_eq!(dto.to_model().unwrap(), department);

    let bad = br#"{"name": "R&D", "staff": [{"title": "Lead"}]}"#;
    let err = dto_type.from_buffer(bad, Encoding::Json).unwrap_err();
    assert_eq!(err.field_errors()[0].path, "staff.0.name");
}

#[test]
fn test_cyclic_references_are_rejected() {
    rat_quickdto::register_model::<LoopA>();
    rat_quickdto::register_model::<LoopB>();
    let err = DtoFactory::new("Dto").specialize::<LoopA>().unwrap_err();
    assert!(err.is_configuration());

    // 引用自身的模型同样是循环
    rat_quickdto::register_model::<TreeNode>();
    let err = DtoFactory::new("Dto").specialize::<TreeNode>().unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_validated_model_constraints() {
    let inbound = DtoConfig::default().with_purpose(Purpose::Inbound);
    let dto_type = DtoFactory::validated().specialize_with::<Signup>(inbound).unwrap();

    let err = dto_type
        .from_buffer(br#"{"username": "al", "password": "short", "age": 12}"#, Encoding::Json)
        .unwrap_err();
    let mut paths: Vec<&str> = err.field_errors().iter().map(|e| e.path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["age", "password", "username"]);

    let dto = dto_type
        .from_buffer(
            br#"{"username": "alice", "password": "alice-secret", "age": 30}"#,
            Encoding::Json,
        )
        .unwrap();
    let err = dto.to_model().unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.field_errors()[0].path, "password");
}
