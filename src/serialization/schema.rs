//! Declarative field layouts keyed by type name

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::{
    error::{Error, Result},
    version::UnityVersion,
};

/// Longest base-class chain followed before assuming a cycle
const MAX_BASE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl Primitive {
    pub fn size(self) -> usize {
        use Primitive::*;
        match self {
            Bool | I8 | U8 => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 => 4,
            I64 | U64 | F64 => 8,
        }
    }

    pub fn default_value(self) -> Value {
        match self {
            Primitive::Bool => Value::Bool(false),
            Primitive::I8 => Value::I8(0),
            Primitive::U8 => Value::U8(0),
            Primitive::I16 => Value::I16(0),
            Primitive::U16 => Value::U16(0),
            Primitive::I32 => Value::I32(0),
            Primitive::U32 => Value::U32(0),
            Primitive::I64 => Value::I64(0),
            Primitive::U64 => Value::U64(0),
            Primitive::F32 => Value::F32(0.0),
            Primitive::F64 => Value::F64(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum FieldType {
    Primitive(Primitive),
    /// Stored as its underlying integer
    Enum(Primitive),
    String,
    /// Length-prefixed run of primitives
    ValueArray(Primitive),
    Array(Box<FieldType>),
    List(Box<FieldType>),
    /// Nested instance of another schema
    Object(String),
}

impl FieldType {
    pub fn array(element: FieldType) -> Self {
        FieldType::Array(Box::new(element))
    }

    pub fn object(schema: impl Into<String>) -> Self {
        FieldType::Object(schema.into())
    }

    /// Primitive element type for arrays that are read without per-element alignment
    pub fn value_element(&self) -> Option<Primitive> {
        match self {
            FieldType::Primitive(p) | FieldType::Enum(p) => Some(*p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<UnityVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version: Option<UnityVersion>,
    /// Skip the alignment that normally precedes a primitive
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_align: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            min_version: None,
            max_version: None,
            no_align: false,
        }
    }

    pub fn primitive(name: impl Into<String>, ty: Primitive) -> Self {
        Self::new(name, FieldType::Primitive(ty))
    }

    pub fn since(mut self, version: UnityVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    pub fn until(mut self, version: UnityVersion) -> Self {
        self.max_version = Some(version);
        self
    }

    pub fn unaligned(mut self) -> Self {
        self.no_align = true;
        self
    }

    /// Whether the field is stored by the given engine version
    pub fn is_present(&self, version: UnityVersion) -> bool {
        self.min_version.is_none_or(|min| min <= version)
            && self.max_version.is_none_or(|max| max >= version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Engine class this schema decodes by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i32>,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            class_id: None,
            fields: vec![],
        }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn class_id(mut self, class_id: i32) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    schemas: Vec<Schema>,
}

/// Registry of decodable types
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, Schema>,
    classes: HashMap<i32, String>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `{"schemas": [...]}` document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for schema in document.schemas {
            catalog.register(schema);
        }

        Ok(catalog)
    }

    /// Add a schema, replacing any with the same name
    pub fn register(&mut self, schema: Schema) -> &mut Self {
        if let Some(class_id) = schema.class_id {
            self.classes.insert(class_id, schema.name.clone());
        }
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    pub fn extend(&mut self, other: SchemaCatalog) -> &mut Self {
        for schema in other.schemas.into_values() {
            self.register(schema);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| Error::UnknownSchema(name.to_owned()))
    }

    /// Schema registered for an engine class
    pub fn for_class(&self, class_id: i32) -> Result<&Schema> {
        let name = self
            .classes
            .get(&class_id)
            .ok_or(Error::UnknownClass(class_id))?;
        self.get(name)
    }

    /// Every field of a schema, base class fields first
    pub fn fields(&self, name: &str) -> Result<Vec<&Field>> {
        let mut chain = vec![self.get(name)?];
        while let Some(base) = chain.last().and_then(|s| s.base.as_deref()) {
            if chain.len() > MAX_BASE_DEPTH {
                return Err(Error::SchemaMismatch {
                    schema: name.to_owned(),
                    field: base.to_owned(),
                    reason: "base class chain is cyclic".to_owned(),
                });
            }
            chain.push(self.get(base)?);
        }

        Ok(chain
            .iter()
            .rev()
            .flat_map(|schema| schema.fields.iter())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_gate() {
        let field = Field::primitive("m_Flag", Primitive::Bool)
            .since(UnityVersion::new(2017, 3, 0, 0))
            .until(UnityVersion::new(2020, 1, 0, 0));

        assert!(!field.is_present(UnityVersion::new(5, 6, 0, 0)));
        assert!(field.is_present(UnityVersion::new(2017, 3, 0, 0)));
        assert!(field.is_present(UnityVersion::new(2019, 4, 3, 1)));
        assert!(!field.is_present(UnityVersion::new(2020, 1, 0, 1)));
    }

    #[test]
    fn test_fields_base_first() {
        let mut catalog = SchemaCatalog::new();
        catalog
            .register(Schema::new("Base").field(Field::primitive("a", Primitive::I32)))
            .register(
                Schema::new("Derived")
                    .base("Base")
                    .class_id(1000)
                    .field(Field::primitive("b", Primitive::I32)),
            );

        let names: Vec<_> = catalog
            .fields("Derived")
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(catalog.for_class(1000).unwrap().name, "Derived");
        assert!(matches!(
            catalog.for_class(1),
            Err(Error::UnknownClass(1))
        ));
    }

    #[test]
    fn test_cyclic_base() {
        let mut catalog = SchemaCatalog::new();
        catalog
            .register(Schema::new("A").base("B"))
            .register(Schema::new("B").base("A"));
        assert!(catalog.fields("A").is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "schemas": [
                {
                    "name": "Rectf",
                    "fields": [
                        {"name": "x", "type": {"kind": "primitive", "of": "f32"}},
                        {"name": "tags", "type": {"kind": "array", "of": {"kind": "string"}}},
                        {"name": "flag", "type": {"kind": "primitive", "of": "bool"}, "noAlign": true,
                         "minVersion": "2018.1.0f1"}
                    ]
                }
            ]
        }"#;

        let catalog = SchemaCatalog::from_json(json).unwrap();
        let schema = catalog.get("Rectf").unwrap();
        assert_eq!(schema.fields[0].ty, FieldType::Primitive(Primitive::F32));
        assert_eq!(schema.fields[1].ty, FieldType::array(FieldType::String));
        assert!(schema.fields[2].no_align);
        assert_eq!(
            schema.fields[2].min_version,
            Some(UnityVersion::new(2018, 1, 0, 1))
        );

        assert!(matches!(
            SchemaCatalog::from_json("{\"schemas\": 5}"),
            Err(Error::SchemaDocument(_))
        ));
    }
}
