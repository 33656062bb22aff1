//! Schema-driven decoding and encoding of object payloads

use super::{
    schema::{Field, FieldType, Primitive, SchemaCatalog},
    value::{Object, Value},
};
use crate::{
    error::{Error, Result},
    io::{Reader, Writer},
    version::UnityVersion,
};

/// Longest array or list accepted while decoding
pub const MAX_ARRAY_LENGTH: usize = 0x40000;

/// Deepest nesting of objects, guards against schemas that contain themselves
const MAX_NESTING: usize = 32;

/// Decodes and encodes objects for one engine version.
///
/// Every primitive field is preceded by alignment to 4 unless marked `no_align`. Arrays and
/// strings align before their length. Nested objects align to 4 once fully read.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'c> {
    catalog: &'c SchemaCatalog,
    version: UnityVersion,
}

impl<'c> Serializer<'c> {
    pub fn new(catalog: &'c SchemaCatalog, version: UnityVersion) -> Self {
        Self { catalog, version }
    }

    pub fn version(&self) -> UnityVersion {
        self.version
    }

    /// Decode one instance of `schema` at the reader's position
    pub fn deserialize(&self, schema: &str, reader: &mut Reader) -> Result<Object> {
        self.deserialize_at(schema, reader, 0)
    }

    fn deserialize_at(&self, schema: &str, reader: &mut Reader, depth: usize) -> Result<Object> {
        if depth > MAX_NESTING {
            return Err(nested_too_deep(schema));
        }

        let fields = self.catalog.fields(schema)?;
        let mut object = Object::new(schema);
        for field in fields {
            let value = if field.is_present(self.version) {
                self.read_field(field, reader, depth)?
            } else {
                self.default_value(&field.ty, depth)?
            };
            object.push(field.name.clone(), value);
        }
        reader.align(4);

        Ok(object)
    }

    fn read_field(&self, field: &Field, reader: &mut Reader, depth: usize) -> Result<Value> {
        match &field.ty {
            FieldType::Primitive(p) | FieldType::Enum(p) => {
                if !field.no_align {
                    reader.align(4);
                }
                read_primitive(*p, reader)
            }
            ty => self.read_value(ty, reader, depth),
        }
    }

    /// Anything that isn't a bare primitive field
    fn read_value(&self, ty: &FieldType, reader: &mut Reader, depth: usize) -> Result<Value> {
        match ty {
            FieldType::Primitive(p) | FieldType::Enum(p) => read_primitive(*p, reader),
            FieldType::String => {
                reader.align(4);
                Ok(Value::String(reader.read_aligned_string()?))
            }
            FieldType::ValueArray(p) => read_values(*p, reader),
            FieldType::Array(element) | FieldType::List(element) => match element.value_element()
            {
                Some(p) => read_values(p, reader),
                None => {
                    let length = read_array_length(reader)?;
                    let values = (0..length)
                        .map(|_| self.read_value(element, reader, depth))
                        .collect::<Result<_>>()?;
                    Ok(Value::Array(values))
                }
            },
            FieldType::Object(name) => {
                Ok(Value::Object(self.deserialize_at(name, reader, depth + 1)?))
            }
        }
    }

    /// Encode `object` according to its schema at the writer's position
    pub fn serialize(&self, object: &Object, writer: &mut Writer) -> Result<()> {
        let fields = self.catalog.fields(&object.schema)?;
        if fields.len() != object.fields.len() {
            return Err(Error::SchemaMismatch {
                schema: object.schema.clone(),
                field: String::new(),
                reason: format!(
                    "schema has {} fields, object has {}",
                    fields.len(),
                    object.fields.len()
                ),
            });
        }

        for (field, (name, value)) in fields.into_iter().zip(&object.fields) {
            let mismatch = |reason: String| Error::SchemaMismatch {
                schema: object.schema.clone(),
                field: field.name.clone(),
                reason,
            };
            if *name != field.name {
                return Err(mismatch(format!("found field {name:?}")));
            }
            if !field.is_present(self.version) {
                continue;
            }

            match &field.ty {
                FieldType::Primitive(p) | FieldType::Enum(p) => {
                    if !field.no_align {
                        writer.align(4);
                    }
                    write_primitive(*p, value, writer).map_err(mismatch)?;
                }
                ty => self.write_value(ty, value, writer).map_err(|e| match e {
                    WriteError::Mismatch(reason) => mismatch(reason),
                    WriteError::Nested(e) => e,
                })?,
            }
        }
        writer.align(4);

        Ok(())
    }

    fn write_value(&self, ty: &FieldType, value: &Value, writer: &mut Writer) -> WriteResult {
        match (ty, value) {
            (FieldType::Primitive(p) | FieldType::Enum(p), value) => {
                write_primitive(*p, value, writer).map_err(WriteError::Mismatch)
            }
            (FieldType::String, Value::String(s)) => {
                writer.align(4);
                writer.write_aligned_string(s).map_err(WriteError::Nested)
            }
            (FieldType::ValueArray(p), value) => write_values(*p, value, writer),
            (FieldType::Array(element) | FieldType::List(element), value) => {
                match element.value_element() {
                    Some(p) => write_values(p, value, writer),
                    None => {
                        let Value::Array(values) = value else {
                            return Err(expected("array", value));
                        };
                        writer.align(4);
                        writer.write_length(values.len()).map_err(WriteError::Nested)?;
                        values
                            .iter()
                            .try_for_each(|v| self.write_value(element, v, writer))
                    }
                }
            }
            (FieldType::Object(name), Value::Object(object)) => {
                if object.schema != *name {
                    return Err(WriteError::Mismatch(format!(
                        "expected {name} object, found {}",
                        object.schema
                    )));
                }
                self.serialize(object, writer).map_err(WriteError::Nested)
            }
            (FieldType::String, value) => Err(expected("string", value)),
            (FieldType::Object(name), value) => Err(expected(name, value)),
        }
    }

    /// Fresh instance with every field at its default
    pub fn default_object(&self, schema: &str) -> Result<Object> {
        self.default_object_at(schema, 0)
    }

    fn default_object_at(&self, schema: &str, depth: usize) -> Result<Object> {
        if depth > MAX_NESTING {
            return Err(nested_too_deep(schema));
        }

        let mut object = Object::new(schema);
        for field in self.catalog.fields(schema)? {
            object.push(field.name.clone(), self.default_value(&field.ty, depth)?);
        }

        Ok(object)
    }

    fn default_value(&self, ty: &FieldType, depth: usize) -> Result<Value> {
        let value = match ty {
            FieldType::Primitive(p) | FieldType::Enum(p) => p.default_value(),
            FieldType::String => Value::String(String::new()),
            FieldType::ValueArray(Primitive::U8) => Value::Bytes(vec![]),
            FieldType::ValueArray(_) => Value::Array(vec![]),
            FieldType::Array(element) | FieldType::List(element) => {
                match element.value_element() {
                    Some(Primitive::U8) => Value::Bytes(vec![]),
                    _ => Value::Array(vec![]),
                }
            }
            FieldType::Object(name) => Value::Object(self.default_object_at(name, depth + 1)?),
        };

        Ok(value)
    }
}

enum WriteError {
    /// Value doesn't fit the field, reported against the enclosing field
    Mismatch(String),
    /// Already attributed to a nested schema
    Nested(Error),
}

type WriteResult = std::result::Result<(), WriteError>;

fn expected(what: &str, found: &Value) -> WriteError {
    WriteError::Mismatch(format!("expected {what}, found {}", found.kind_name()))
}

fn nested_too_deep(schema: &str) -> Error {
    Error::SchemaMismatch {
        schema: schema.to_owned(),
        field: String::new(),
        reason: format!("objects nested deeper than {MAX_NESTING}, schema contains itself"),
    }
}

fn read_array_length(reader: &mut Reader) -> Result<usize> {
    reader.align(4);
    reader.read_length(MAX_ARRAY_LENGTH)
}

fn read_primitive(p: Primitive, reader: &mut Reader) -> Result<Value> {
    let value = match p {
        Primitive::Bool => Value::Bool(reader.read_bool()?),
        Primitive::I8 => Value::I8(reader.read_i8()?),
        Primitive::U8 => Value::U8(reader.read_u8()?),
        Primitive::I16 => Value::I16(reader.read_i16()?),
        Primitive::U16 => Value::U16(reader.read_u16()?),
        Primitive::I32 => Value::I32(reader.read_i32()?),
        Primitive::U32 => Value::U32(reader.read_u32()?),
        Primitive::I64 => Value::I64(reader.read_i64()?),
        Primitive::U64 => Value::U64(reader.read_u64()?),
        Primitive::F32 => Value::F32(reader.read_f32()?),
        Primitive::F64 => Value::F64(reader.read_f64()?),
    };

    Ok(value)
}

/// Length-prefixed primitives: bytes as one block, anything else one at a time, then a single
/// alignment at the end
fn read_values(p: Primitive, reader: &mut Reader) -> Result<Value> {
    let length = read_array_length(reader)?;
    let value = match p {
        Primitive::U8 => Value::Bytes(reader.read_bytes(length)?.to_vec()),
        p => {
            let needed = length * p.size();
            if needed > reader.remaining() {
                return Err(Error::UnexpectedEof {
                    offset: reader.position(),
                    wanted: needed,
                });
            }
            Value::Array(
                (0..length)
                    .map(|_| read_primitive(p, reader))
                    .collect::<Result<_>>()?,
            )
        }
    };
    reader.align(4);

    Ok(value)
}

fn write_primitive(
    p: Primitive,
    value: &Value,
    writer: &mut Writer,
) -> std::result::Result<(), String> {
    match (p, value) {
        (Primitive::Bool, Value::Bool(v)) => writer.write_bool(*v),
        (Primitive::I8, Value::I8(v)) => writer.write_i8(*v),
        (Primitive::U8, Value::U8(v)) => writer.write_u8(*v),
        (Primitive::I16, Value::I16(v)) => writer.write_i16(*v),
        (Primitive::U16, Value::U16(v)) => writer.write_u16(*v),
        (Primitive::I32, Value::I32(v)) => writer.write_i32(*v),
        (Primitive::U32, Value::U32(v)) => writer.write_u32(*v),
        (Primitive::I64, Value::I64(v)) => writer.write_i64(*v),
        (Primitive::U64, Value::U64(v)) => writer.write_u64(*v),
        (Primitive::F32, Value::F32(v)) => writer.write_f32(*v),
        (Primitive::F64, Value::F64(v)) => writer.write_f64(*v),
        (p, value) => {
            return Err(format!(
                "expected {p:?}, found {}",
                value.kind_name()
            ))
        }
    }

    Ok(())
}

fn write_values(p: Primitive, value: &Value, writer: &mut Writer) -> WriteResult {
    writer.align(4);
    match (p, value) {
        (Primitive::U8, Value::Bytes(bytes)) => {
            writer.write_length(bytes.len()).map_err(WriteError::Nested)?;
            writer.write_bytes(bytes);
        }
        (Primitive::U8, value) => return Err(expected("bytes", value)),
        (p, Value::Array(values)) => {
            writer.write_length(values.len()).map_err(WriteError::Nested)?;
            for v in values {
                write_primitive(p, v, writer).map_err(WriteError::Mismatch)?;
            }
        }
        (_, value) => return Err(expected("array", value)),
    }
    writer.align(4);

    Ok(())
}
