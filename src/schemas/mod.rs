//! Schemas shipped with the crate

mod common;
mod objects;

use crate::{error::Result, serialization::SchemaCatalog};

/// Third-party MonoBehaviour layouts
const EXTERNAL_SCHEMAS: &str = include_str!("external.json");

impl SchemaCatalog {
    /// Common value structs and the engine classes with a fixed layout
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for schema in [
            common::pptr(),
            common::rectf(),
            common::streaming_info(),
            common::hash128(),
            common::gl_texture_settings(),
            objects::game_object(),
            objects::mono_behaviour(),
            objects::mono_script(),
            objects::text_asset(),
            objects::texture_2d(),
            objects::font(),
        ]
        .into_iter()
        .chain(objects::font_parts())
        {
            catalog.register(schema);
        }

        catalog
    }

    /// Builtin catalog plus the bundled third-party MonoBehaviour schemas
    pub fn with_external() -> Result<Self> {
        let mut catalog = Self::builtin();
        catalog.extend(Self::from_json(EXTERNAL_SCHEMAS)?);
        Ok(catalog)
    }
}
