//! Schema-driven object decoding

pub mod schema;
pub mod serializer;
pub mod value;

pub use schema::{Field, FieldType, Primitive, Schema, SchemaCatalog};
pub use serializer::{Serializer, MAX_ARRAY_LENGTH};
pub use value::{Object, Value};

/// Controls how object payloads are decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeserializeOptions {
    /// Require the decode to consume exactly the object's declared size
    pub full_deserialize: bool,
}

impl Default for DeserializeOptions {
    fn default() -> Self {
        Self {
            full_deserialize: true,
        }
    }
}
