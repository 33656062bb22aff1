//! Engine classes with a fixed layout

use crate::{
    assets::ClassId,
    serialization::{Field, FieldType, Primitive, Schema},
    version::UnityVersion,
};

fn string(name: &str) -> Field {
    Field::new(name, FieldType::String)
}

fn pptr(name: &str) -> Field {
    Field::new(name, FieldType::object("PPtr"))
}

fn bytes(name: &str) -> Field {
    Field::new(name, FieldType::ValueArray(Primitive::U8))
}

pub fn game_object() -> Schema {
    Schema::new("GameObject")
        .class_id(ClassId::GameObject as i32)
        .field(Field::new("m_Component", FieldType::array(FieldType::object("PPtr"))))
        .field(Field::primitive("m_Layer", Primitive::U32))
        .field(string("m_Name"))
        .field(Field::primitive("m_Tag", Primitive::U16))
        .field(Field::primitive("m_IsActive", Primitive::Bool).unaligned())
}

pub fn mono_behaviour() -> Schema {
    Schema::new("MonoBehaviour")
        .class_id(ClassId::MonoBehaviour as i32)
        .field(pptr("m_GameObject"))
        .field(Field::primitive("m_Enabled", Primitive::U8))
        .field(pptr("m_Script"))
        .field(string("m_Name"))
}

pub fn mono_script() -> Schema {
    Schema::new("MonoScript")
        .class_id(ClassId::MonoScript as i32)
        .field(string("m_Name"))
        .field(Field::primitive("m_ExecutionOrder", Primitive::I32))
        .field(Field::new("m_PropertiesHash", FieldType::object("Hash128")))
        .field(string("m_ClassName"))
        .field(string("m_Namespace"))
        .field(string("m_AssemblyName"))
}

pub fn text_asset() -> Schema {
    Schema::new("TextAsset")
        .class_id(ClassId::TextAsset as i32)
        .field(string("m_Name"))
        .field(bytes("m_Script"))
}

pub fn texture_2d() -> Schema {
    let v2017_3 = UnityVersion::new(2017, 3, 0, 0);

    Schema::new("Texture2D")
        .class_id(ClassId::Texture2D as i32)
        .field(string("m_Name"))
        .field(Field::primitive("m_ForcedFallbackFormat", Primitive::I32).since(v2017_3))
        .field(Field::primitive("m_DownscaleFallback", Primitive::Bool).since(v2017_3))
        .field(Field::primitive("m_Width", Primitive::I32))
        .field(Field::primitive("m_Height", Primitive::I32))
        .field(Field::primitive("m_CompleteImageSize", Primitive::I32))
        .field(Field::new("m_TextureFormat", FieldType::Enum(Primitive::I32)))
        .field(Field::primitive("m_MipCount", Primitive::I32))
        .field(Field::primitive("m_IsReadable", Primitive::Bool))
        .field(Field::primitive("m_ImageCount", Primitive::I32))
        .field(Field::primitive("m_TextureDimension", Primitive::I32))
        .field(Field::new("m_TextureSettings", FieldType::object("GLTextureSettings")))
        .field(Field::primitive("m_LightmapFormat", Primitive::I32))
        .field(Field::primitive("m_ColorSpace", Primitive::I32))
        .field(bytes("image data"))
        .field(
            Field::new("m_StreamData", FieldType::object("StreamingInfo"))
                .since(UnityVersion::new(5, 3, 0, 0)),
        )
}

fn character_info() -> Schema {
    Schema::new("CharacterInfo")
        .field(Field::primitive("index", Primitive::U32))
        .field(Field::new("uv", FieldType::object("Rectf")))
        .field(Field::new("vert", FieldType::object("Rectf")))
        .field(Field::primitive("advance", Primitive::F32))
        .field(Field::primitive("flipped", Primitive::Bool))
}

/// Two packed glyph indices followed by the adjustment
fn kerning_pair() -> Schema {
    Schema::new("KerningPair")
        .field(Field::primitive("firstGlyph", Primitive::U16))
        .field(Field::primitive("secondGlyph", Primitive::U16).unaligned())
        .field(Field::primitive("adjustment", Primitive::F32))
}

pub fn font() -> Schema {
    Schema::new("Font")
        .class_id(ClassId::Font as i32)
        .field(string("m_Name"))
        .field(Field::primitive("m_LineSpacing", Primitive::F32))
        .field(pptr("m_DefaultMaterial"))
        .field(Field::primitive("m_FontSize", Primitive::F32))
        .field(pptr("m_Texture"))
        .field(Field::primitive("m_AsciiStartOffset", Primitive::I32))
        .field(Field::primitive("m_Tracking", Primitive::F32))
        .field(Field::primitive("m_CharacterSpacing", Primitive::I32))
        .field(Field::primitive("m_CharacterPadding", Primitive::I32))
        .field(Field::primitive("m_ConvertCase", Primitive::I32))
        .field(Field::new("m_CharacterRects", FieldType::array(FieldType::object("CharacterInfo"))))
        .field(Field::new("m_KerningValues", FieldType::array(FieldType::object("KerningPair"))))
        .field(Field::primitive("m_PixelScale", Primitive::F32))
        .field(bytes("m_FontData"))
        .field(Field::primitive("m_Ascent", Primitive::F32))
        .field(Field::primitive("m_Descent", Primitive::F32))
        .field(Field::primitive("m_DefaultStyle", Primitive::U32))
        .field(Field::new("m_FontNames", FieldType::array(FieldType::String)))
        .field(Field::new("m_FallbackFonts", FieldType::array(FieldType::object("PPtr"))))
        .field(Field::primitive("m_FontRenderingMode", Primitive::I32))
        .field(Field::primitive("m_UseLegacyBoundsCalculation", Primitive::Bool))
        .field(Field::primitive("m_ShouldRoundAdvanceValue", Primitive::Bool))
}

pub fn font_parts() -> [Schema; 2] {
    [character_info(), kerning_pair()]
}
