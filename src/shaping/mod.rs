//! 字段整形模块
//!
//! 根据模型字段描述符与整形配置（排除、重命名、重定型、附加）计算传输字段，
//! 并解析前向引用

use crate::config::{DtoConfig, ExtraField, FieldMapping};
use crate::debug_log;
use crate::error::DtoResult;
use crate::i18n::tf;
use crate::model::{FieldDescriptor, FieldShape, FieldType};
use crate::transfer::{TransferField, TransferType};
use rat_logger::warn;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

/// 推导字段的可用类型
///
/// 声明类型不含前向引用时直接使用；否则单值字段取内层类型，
/// 序列字段把内层类型包装为数组。前向引用嵌套超过一层容器时不做猜测，
/// 返回 `ConfigurationError`
pub fn derive_field_type(field: &FieldDescriptor) -> DtoResult<FieldType> {
    if !field.outer_type.has_forward_ref() {
        return Ok(field.outer_type.clone());
    }

    if let FieldType::Array { .. } = field.inner_type {
        return Err(crate::dto_error!(
            config,
            tf("error.nested_forward_ref", &[("field", field.name.as_str())])
        ));
    }

    match field.shape {
        FieldShape::Singleton => Ok(field.inner_type.clone()),
        FieldShape::Sequence => match &field.outer_type {
            // 保留外层数组的数量约束
            FieldType::Array {
                max_items,
                min_items,
                ..
            } => Ok(FieldType::Array {
                item_type: Box::new(field.inner_type.clone()),
                max_items: *max_items,
                min_items: *min_items,
            }),
            _ => Ok(FieldType::array(field.inner_type.clone())),
        },
    }
}

/// 按映射替换字段名与类型
pub fn remap_field(
    field_mapping: &BTreeMap<String, FieldMapping>,
    name: &str,
    field_type: FieldType,
) -> (String, FieldType) {
    match field_mapping.get(name) {
        Some(FieldMapping::Rename(new_name)) => (new_name.clone(), field_type),
        Some(FieldMapping::Retype(new_name, new_type)) => (new_name.clone(), new_type.clone()),
        None => (name.to_string(), field_type),
    }
}

/// 计算传输字段定义
///
/// 保持声明顺序；先排除再映射，排除优先于映射；
/// 字段保留原有的默认值与必填性
pub fn compute_field_definitions(
    exclude: &BTreeSet<String>,
    field_mapping: &BTreeMap<String, FieldMapping>,
    source_fields: &[FieldDescriptor],
) -> DtoResult<Vec<TransferField>> {
    let source_names: HashSet<&str> = source_fields.iter().map(|f| f.name.as_str()).collect();
    for key in field_mapping.keys() {
        if !source_names.contains(key.as_str()) {
            return Err(crate::dto_error!(
                config,
                tf("error.mapping_field_not_found", &[("field", key.as_str())])
            ));
        }
    }

    let mut seen = HashSet::new();
    let mut definitions = Vec::with_capacity(source_fields.len());

    for field in source_fields {
        if exclude.contains(&field.name) {
            if field_mapping.contains_key(&field.name) {
                warn!("字段 '{}' 同时被排除和映射，排除优先", field.name);
            }
            continue;
        }

        let field_type = derive_field_type(field)?;
        let (name, field_type) = remap_field(field_mapping, &field.name, field_type);

        if !seen.insert(name.clone()) {
            return Err(crate::dto_error!(
                config,
                tf("error.rename_collision", &[("field", name.as_str())])
            ));
        }

        definitions.push(TransferField {
            name,
            field_type,
            nullable: field.nullable,
            default: field.default.clone(),
            description: field.description.clone(),
        });
    }

    debug_log!(
        "字段整形完成: {} 个源字段 -> {} 个传输字段",
        source_fields.len(),
        definitions.len()
    );
    Ok(definitions)
}

/// 追加附加字段，与已有字段重名时返回 `ConfigurationError`
pub fn append_extra_fields(
    definitions: &mut Vec<TransferField>,
    extras: &[ExtraField],
) -> DtoResult<()> {
    for extra in extras {
        if definitions.iter().any(|d| d.name == extra.name) {
            return Err(crate::dto_error!(
                config,
                tf("error.extra_field_collision", &[("field", extra.name.as_str())])
            ));
        }
        definitions.push(extra.to_transfer_field());
    }
    Ok(())
}

/// 计算反向字段映射（传输字段名 -> 模型字段名）
///
/// 被排除的字段不参与；映射不是单射时返回 `ConfigurationError`
pub fn reverse_field_mapping(config: &DtoConfig) -> DtoResult<BTreeMap<String, String>> {
    let mut reverse = BTreeMap::new();
    for (model_name, mapping) in &config.field_mapping {
        if config.exclude.contains(model_name) {
            continue;
        }
        let target = mapping.target_name().to_string();
        if reverse.insert(target.clone(), model_name.clone()).is_some() {
            return Err(crate::dto_error!(
                config,
                tf("error.rename_collision", &[("field", target.as_str())])
            ));
        }
    }
    Ok(reverse)
}

/// 把字段类型中的前向引用替换为已解析的传输类型
///
/// `resolver` 对无法解析的名称返回 `Ok(None)`
pub fn resolve_field_type<F>(
    field_name: &str,
    field_type: &FieldType,
    resolver: &mut F,
) -> DtoResult<FieldType>
where
    F: FnMut(&str) -> DtoResult<Option<Arc<TransferType>>>,
{
    match field_type {
        FieldType::ForwardRef(target) => match resolver(target)? {
            Some(transfer) => Ok(FieldType::Model(transfer)),
            None => Err(crate::dto_error!(
                config,
                tf(
                    "error.unresolved_forward_ref",
                    &[("field", field_name), ("target", target.as_str())]
                )
            )),
        },
        FieldType::Array {
            item_type,
            max_items,
            min_items,
        } => Ok(FieldType::Array {
            item_type: Box::new(resolve_field_type(field_name, item_type, resolver)?),
            max_items: *max_items,
            min_items: *min_items,
        }),
        other => Ok(other.clone()),
    }
}

/// 前向引用的命名空间
///
/// 名称到已构建传输类型的映射，并记录正在解析的模型名以检测循环引用
#[derive(Debug, Clone, Default)]
pub struct TypeNamespace {
    types: BTreeMap<String, Arc<TransferType>>,
    resolving: Vec<String>,
}

impl TypeNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个名称绑定
    pub fn with(mut self, name: &str, transfer: Arc<TransferType>) -> Self {
        self.insert(name, transfer);
        self
    }

    pub fn insert(&mut self, name: &str, transfer: Arc<TransferType>) {
        self.types.insert(name.to_string(), transfer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<TransferType>> {
        self.types.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// 是否正在解析该模型
    pub fn is_resolving(&self, model_name: &str) -> bool {
        self.resolving.iter().any(|n| n == model_name)
    }

    /// 进入模型的解析过程，返回子命名空间
    ///
    /// 模型已经在解析栈上时说明存在循环引用
    pub fn enter(&self, model_name: &str) -> DtoResult<TypeNamespace> {
        if self.is_resolving(model_name) {
            let path = self
                .resolving
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(model_name))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(crate::dto_error!(
                config,
                tf("error.cyclic_reference", &[("path", path.as_str())])
            ));
        }
        let mut child = self.clone();
        child.resolving.push(model_name.to_string());
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DefaultSpec, FieldDefinition};
    use crate::transfer::TransferTypeBuilder;

    fn descriptor(name: &str, field_type: FieldType) -> FieldDescriptor {
        FieldDescriptor::from_definition(name, FieldDefinition::new(field_type).required())
    }

    #[test]
    fn test_derive_field_type() {
        let plain = descriptor("id", FieldType::integer());
        assert_eq!(derive_field_type(&plain).unwrap(), FieldType::integer());

        let single = descriptor("owner", FieldType::ForwardRef("Person".to_string()));
        assert_eq!(
            derive_field_type(&single).unwrap(),
            FieldType::ForwardRef("Person".to_string())
        );

        let many = descriptor(
            "staff",
            FieldType::Array {
                item_type: Box::new(FieldType::ForwardRef("Person".to_string())),
                max_items: Some(10),
                min_items: None,
            },
        );
        assert_eq!(
            derive_field_type(&many).unwrap(),
            FieldType::Array {
                item_type: Box::new(FieldType::ForwardRef("Person".to_string())),
                max_items: Some(10),
                min_items: None,
            }
        );
    }

    #[test]
    fn test_doubly_nested_forward_ref_is_rejected() {
        let nested = descriptor(
            "grid",
            FieldType::array(FieldType::array(FieldType::ForwardRef("Cell".to_string()))),
        );
        assert!(derive_field_type(&nested).unwrap_err().is_configuration());

        // 不含前向引用的多层数组不受影响
        let plain = descriptor("matrix", FieldType::array(FieldType::array(FieldType::integer())));
        assert!(derive_field_type(&plain).is_ok());
    }

    #[test]
    fn test_exclude_then_remap_keeps_order() {
        let source = vec![
            descriptor("id", FieldType::integer()),
            descriptor("first", FieldType::integer()),
            descriptor("second", FieldType::integer()),
        ];
        let exclude = BTreeSet::from(["id".to_string()]);
        let mapping = BTreeMap::from([
            ("first".to_string(), FieldMapping::from("third")),
            ("second".to_string(), FieldMapping::from(("fourth", FieldType::float()))),
        ]);

        let defs = compute_field_definitions(&exclude, &mapping, &source).unwrap();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["third", "fourth"]);
        assert_eq!(defs[0].field_type, FieldType::integer());
        assert_eq!(defs[1].field_type, FieldType::float());
        assert_eq!(defs[1].default, DefaultSpec::Required);
    }

    #[test]
    fn test_exclusion_wins_over_mapping() {
        let source = vec![descriptor("a", FieldType::integer()), descriptor("b", FieldType::integer())];
        let exclude = BTreeSet::from(["a".to_string()]);
        let mapping = BTreeMap::from([("a".to_string(), FieldMapping::from("renamed"))]);

        let defs = compute_field_definitions(&exclude, &mapping, &source).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "b");
    }

    #[test]
    fn test_mapping_errors() {
        let source = vec![descriptor("a", FieldType::integer()), descriptor("b", FieldType::integer())];

        let unknown = BTreeMap::from([("zzz".to_string(), FieldMapping::from("x"))]);
        assert!(compute_field_definitions(&BTreeSet::new(), &unknown, &source)
            .unwrap_err()
            .is_configuration());

        let collision = BTreeMap::from([("a".to_string(), FieldMapping::from("b"))]);
        assert!(compute_field_definitions(&BTreeSet::new(), &collision, &source)
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_extra_field_collision() {
        let mut defs = vec![TransferField::new("name", FieldType::string())];
        let ok = [ExtraField::optional("note", FieldType::string())];
        append_extra_fields(&mut defs, &ok).unwrap();
        assert_eq!(defs.len(), 2);

        let clash = [ExtraField::optional("name", FieldType::string())];
        assert!(append_extra_fields(&mut defs, &clash).unwrap_err().is_configuration());
    }

    #[test]
    fn test_reverse_mapping() {
        let config = DtoConfig::builder()
            .rename("first", "third")
            .retype("second", "fourth", FieldType::float())
            .build()
            .unwrap();
        let reverse = reverse_field_mapping(&config).unwrap();
        assert_eq!(reverse.get("third").map(String::as_str), Some("first"));
        assert_eq!(reverse.get("fourth").map(String::as_str), Some("second"));
    }

    #[test]
    fn test_resolve_forward_refs() {
        let person = TransferTypeBuilder::new("Person")
            .field(TransferField::new("name", FieldType::string()))
            .build()
            .unwrap();
        let namespace = TypeNamespace::new().with("Person", person.clone());

        let mut resolver =
            |name: &str| -> DtoResult<Option<Arc<TransferType>>> { Ok(namespace.get(name)) };
        let resolved = resolve_field_type(
            "staff",
            &FieldType::array(FieldType::ForwardRef("Person".to_string())),
            &mut resolver,
        )
        .unwrap();
        assert_eq!(resolved, FieldType::array(FieldType::Model(person)));

        let err = resolve_field_type("boss", &FieldType::ForwardRef("Ghost".to_string()), &mut resolver)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_cycle_detection() {
        let root = TypeNamespace::new();
        let company = root.enter("Company").unwrap();
        let employee = company.enter("Employee").unwrap();
        assert!(employee.is_resolving("Company"));
        assert!(employee.enter("Company").unwrap_err().is_configuration());
        assert!(!root.is_resolving("Company"));
    }
}
