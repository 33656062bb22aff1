//! Small value structs shared by the engine classes

use crate::serialization::{Field, FieldType, Primitive, Schema};

pub fn pptr() -> Schema {
    Schema::new("PPtr")
        .field(Field::primitive("m_FileID", Primitive::I32))
        .field(Field::primitive("m_PathID", Primitive::I64))
}

pub fn rectf() -> Schema {
    Schema::new("Rectf")
        .field(Field::primitive("x", Primitive::F32))
        .field(Field::primitive("y", Primitive::F32))
        .field(Field::primitive("width", Primitive::F32))
        .field(Field::primitive("height", Primitive::F32))
}

pub fn streaming_info() -> Schema {
    Schema::new("StreamingInfo")
        .field(Field::primitive("offset", Primitive::U32))
        .field(Field::primitive("size", Primitive::U32))
        .field(Field::new("path", FieldType::String))
}

pub fn hash128() -> Schema {
    Schema::new("Hash128")
        .field(Field::primitive("bytes[0]", Primitive::U32))
        .field(Field::primitive("bytes[1]", Primitive::U32))
        .field(Field::primitive("bytes[2]", Primitive::U32))
        .field(Field::primitive("bytes[3]", Primitive::U32))
}

pub fn gl_texture_settings() -> Schema {
    Schema::new("GLTextureSettings")
        .field(Field::primitive("m_FilterMode", Primitive::I32))
        .field(Field::primitive("m_Aniso", Primitive::I32))
        .field(Field::primitive("m_MipBias", Primitive::F32))
        .field(Field::primitive("m_WrapU", Primitive::I32))
        .field(Field::primitive("m_WrapV", Primitive::I32))
        .field(Field::primitive("m_WrapW", Primitive::I32))
}
