use bytes::Bytes;
use tracing::warn;

use super::{types::*, AssetsFile};
use crate::{
    error::{Error, Result},
    io::{align_up, Reader},
    serialization::{DeserializeOptions, Object, SchemaCatalog, Serializer},
};

/// Longest name accepted by the name lookup
const MAX_NAME_LENGTH: i32 = 128;

/// One object of an assets file: its index entry plus access to its payload
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    file: &'a AssetsFile,
    info: &'a AssetInfo,
}

impl<'a> ObjectRef<'a> {
    pub(super) fn new(file: &'a AssetsFile, info: &'a AssetInfo) -> Self {
        Self { file, info }
    }

    pub fn info(&self) -> &'a AssetInfo {
        self.info
    }

    pub fn path_id(&self) -> i64 {
        self.info.path_id
    }

    pub fn class(&self) -> Option<ClassId> {
        self.info.class()
    }

    /// Absolute offset of the payload within the file, `None` if it overflows
    pub fn real_offset(&self) -> Option<i64> {
        self.file
            .header()
            .data_offset
            .checked_add(self.info.data_offset)
    }

    fn payload(&self) -> Result<&'a [u8]> {
        let file: &'a AssetsFile = self.file;
        let size = self.info.size as usize;
        let start = self.real_offset().and_then(|o| usize::try_from(o).ok());
        start
            .and_then(|start| file.data().get(start..start.checked_add(size)?))
            .ok_or_else(|| {
                Error::UnexpectedEof {
                    offset: start.unwrap_or(file.data().len()),
                    wanted: size,
                }
                .in_object(self.info.path_id)
            })
    }

    /// Original payload bytes, shared with the file
    pub fn data(&self) -> Result<Bytes> {
        let payload = self.payload()?;
        Ok(self.file.data_bytes().slice_ref(payload))
    }

    /// Cursor over the payload alone, so positions are relative to the object start
    pub fn reader(&self) -> Result<Reader<'a>> {
        Ok(Reader::new(self.payload()?, self.file.header().endian))
    }

    /// Best-effort name lookup for classes that start with a known name layout. Never fails;
    /// anything unexpected means no name.
    pub fn try_get_name(&self) -> Option<String> {
        let class = self.class()?;
        match self.read_name(class) {
            Ok(name) => name,
            Err(e) => {
                warn!(path_id = self.info.path_id, "Failed to read object name: {e}");
                None
            }
        }
    }

    fn read_name(&self, class: ClassId) -> Result<Option<String>> {
        let mut reader = self.reader()?;

        let offset = match class {
            ClassId::GameObject => {
                // Skip the component list and layer
                let count = reader.read_length(usize::MAX / 16)?;
                count * 12 + 4
            }
            ClassId::MonoBehaviour => 0x1C,
            ClassId::TextAsset | ClassId::MonoScript | ClassId::Font | ClassId::Texture2D => 0,
            _ => return Ok(None),
        };
        reader.skip(offset)?;

        let length = reader.read_i32()?;
        if !(0..=MAX_NAME_LENGTH).contains(&length) {
            return Ok(None);
        }

        let name_offset = reader.position();
        let bytes = reader.read_bytes(length as usize)?;
        let name = std::str::from_utf8(bytes).map_err(|source| Error::Utf8 {
            offset: name_offset,
            source,
        })?;

        Ok(Some(name.to_owned()))
    }

    /// Decode with the schema registered for the object's class
    pub fn deserialize(
        &self,
        catalog: &SchemaCatalog,
        options: DeserializeOptions,
    ) -> Result<Object> {
        let schema = catalog
            .for_class(self.info.class_id)
            .map_err(|e| e.in_object(self.info.path_id))?;
        self.deserialize_as(&schema.name, catalog, options)
    }

    /// Decode with a caller-chosen schema, for scripted objects
    pub fn deserialize_as(
        &self,
        schema: &str,
        catalog: &SchemaCatalog,
        options: DeserializeOptions,
    ) -> Result<Object> {
        let path_id = self.info.path_id;
        let mut reader = self.reader()?;
        let serializer = Serializer::new(catalog, self.file.header().version);
        let object = serializer
            .deserialize(schema, &mut reader)
            .map_err(|e| e.in_object(path_id))?;

        let consumed = reader.position();
        let expected = align_up(self.info.size as usize, 4);
        if consumed != expected {
            if options.full_deserialize {
                return Err(Error::IncompleteDecode {
                    schema: schema.to_owned(),
                    consumed,
                    expected: self.info.size as usize,
                }
                .in_object(path_id));
            }
            warn!(
                path_id,
                consumed,
                size = self.info.size,
                "Object not fully deserialized as {schema}"
            );
        }

        Ok(object)
    }
}
