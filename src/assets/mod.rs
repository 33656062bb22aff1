//! Serialized assets files: header, type metadata, object index and external references

use std::{collections::HashMap, fs, path::Path};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    io::{Endianness, Reader, Writer},
    serialization::{DeserializeOptions, Object, SchemaCatalog, Serializer},
    version::UnityVersion,
};

mod object;
mod save;
pub mod type_metadata;
pub mod type_tree;
pub mod types;

pub use object::ObjectRef;
use type_metadata::TypeMetadata;
pub use types::{AssetInfo, AssetReference, AssetsFileHeader, ClassId, ScriptType};

const MAX_OBJECTS: usize = 0x1000000;
const MAX_REFERENCES: usize = 0x100000;

#[derive(Debug, Clone)]
pub struct AssetsFile {
    data: Bytes,
    header: AssetsFileHeader,
    type_metadata: TypeMetadata,
    long_object_ids: bool,
    /// Object index in file order
    objects: Vec<AssetInfo>,
    /// pathID -> index into `objects`
    lut: HashMap<i64, usize>,
    /// Absolute offset of the first object index entry
    object_index_offset: usize,
    script_types: Vec<ScriptType>,
    references: Vec<AssetReference>,
    /// Payloads swapped in by `replace_object`, only used when saving
    replacements: HashMap<i64, Bytes>,
}

impl AssetsFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read(path.as_ref())?;
        Self::from_bytes(contents.into())
    }

    pub fn from_bytes(data: Bytes) -> Result<Self> {
        let mut reader = Reader::new(&data, Endianness::Big);
        let header = read_header(&mut reader)?;
        debug!(
            format = header.format,
            version = %header.engine_version,
            endian = ?header.endian,
            "Read assets file header"
        );

        let format = header.format;
        let type_metadata = TypeMetadata::read(format, &mut reader)?;
        trace!(
            types = type_metadata.types.len(),
            has_type_trees = type_metadata.has_type_trees,
            "Read type metadata"
        );

        let long_object_ids = if (7..14).contains(&format) {
            reader.read_i32()? != 0
        } else {
            false
        };

        let count = reader.read_length(MAX_OBJECTS)?;
        let object_index_offset = reader.position();
        let mut objects = Vec::with_capacity(count);
        let mut lut = HashMap::with_capacity(count);
        for i in 0..count {
            let info = read_asset_info(format, long_object_ids, &type_metadata, &mut reader)?;
            if lut.insert(info.path_id, i).is_some() {
                warn!(path_id = info.path_id, "Duplicate pathID in object index");
            }
            objects.push(info);
        }

        let mut script_types = vec![];
        if format >= 11 {
            let count = reader.read_length(MAX_REFERENCES)?;
            for _ in 0..count {
                let local_file_index = reader.read_i32()?;
                let path_id = read_path_id(format, long_object_ids, &mut reader)?;
                script_types.push(ScriptType {
                    local_file_index,
                    path_id,
                });
            }
        }

        let mut references = vec![];
        if format >= 6 {
            let count = reader.read_length(MAX_REFERENCES)?;
            for _ in 0..count {
                let asset_path = reader.read_cstring()?;
                let guid = reader
                    .read_bytes(16)?
                    .try_into()
                    .map_err(|_| Error::invalid(reader.position(), "Bad GUID"))?;
                let kind = reader.read_i32()?;
                let file_path = reader.read_cstring()?;
                references.push(AssetReference {
                    asset_path,
                    guid,
                    kind,
                    file_path,
                });
            }
        }

        debug!(
            objects = objects.len(),
            script_types = script_types.len(),
            references = references.len(),
            "Read object index"
        );

        Ok(Self {
            data,
            header,
            type_metadata,
            long_object_ids,
            objects,
            lut,
            object_index_offset,
            script_types,
            references,
            replacements: HashMap::new(),
        })
    }

    pub fn header(&self) -> &AssetsFileHeader {
        &self.header
    }

    pub fn format(&self) -> u32 {
        self.header.format
    }

    pub fn version(&self) -> UnityVersion {
        self.header.version
    }

    pub fn type_metadata(&self) -> &TypeMetadata {
        &self.type_metadata
    }

    pub fn long_object_ids(&self) -> bool {
        self.long_object_ids
    }

    pub fn script_types(&self) -> &[ScriptType] {
        &self.script_types
    }

    pub fn references(&self) -> &[AssetReference] {
        &self.references
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Objects in index order
    pub fn objects(&self) -> impl Iterator<Item = ObjectRef<'_>> {
        self.objects.iter().map(|info| ObjectRef::new(self, info))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object(&self, path_id: i64) -> Option<ObjectRef<'_>> {
        self.lut
            .get(&path_id)
            .map(|&i| ObjectRef::new(self, &self.objects[i]))
    }

    /// First object with the given name, optionally restricted to one class
    pub fn get_asset_by_name(&self, name: &str, class: Option<ClassId>) -> Option<ObjectRef<'_>> {
        self.objects()
            .filter(|o| class.is_none_or(|c| o.class() == Some(c)))
            .find(|o| o.try_get_name().as_deref() == Some(name))
    }

    /// Swap in a new payload for an object, applied by the next save
    pub fn replace_object(&mut self, path_id: i64, data: impl Into<Bytes>) -> Result<()> {
        if !self.lut.contains_key(&path_id) {
            return Err(Error::ObjectNotFound(path_id));
        }
        self.replacements.insert(path_id, data.into());
        Ok(())
    }

    pub fn replacement(&self, path_id: i64) -> Option<&Bytes> {
        self.replacements.get(&path_id)
    }

    pub fn deserialize(
        &self,
        path_id: i64,
        catalog: &SchemaCatalog,
        options: DeserializeOptions,
    ) -> Result<Object> {
        self.object(path_id)
            .ok_or(Error::ObjectNotFound(path_id))?
            .deserialize(catalog, options)
    }

    pub fn deserialize_as(
        &self,
        path_id: i64,
        schema: &str,
        catalog: &SchemaCatalog,
        options: DeserializeOptions,
    ) -> Result<Object> {
        self.object(path_id)
            .ok_or(Error::ObjectNotFound(path_id))?
            .deserialize_as(schema, catalog, options)
    }

    /// Encode an object for this file's engine version and byte order
    pub fn serialize(&self, object: &Object, catalog: &SchemaCatalog) -> Result<Vec<u8>> {
        let mut writer = Writer::new(self.header.endian);
        Serializer::new(catalog, self.header.version).serialize(object, &mut writer)?;
        Ok(writer.into_inner())
    }
}

fn read_header(reader: &mut Reader) -> Result<AssetsFileHeader> {
    let mut metadata_size = reader.read_u32()?;
    let mut file_size = i64::from(reader.read_u32()?);
    let format = reader.read_u32()?;
    let mut data_offset = i64::from(reader.read_u32()?);

    let big_endian = if format >= 9 {
        reader.read_u32()? != 0
    } else {
        // Metadata sits at the end of the file, after the endianness byte
        let start = file_size - i64::from(metadata_size);
        let start = usize::try_from(start)
            .map_err(|_| Error::invalid(4, format!("Bad metadata start {start}")))?;
        reader.seek(start)?;
        reader.read_u8()? != 0
    };

    if format >= 22 {
        metadata_size = reader.read_u32()?;
        file_size = reader.read_i64()?;
        data_offset = reader.read_i64()?;
        // Reserved
        reader.skip(8)?;
    }

    reader.endian = if big_endian {
        Endianness::Big
    } else {
        Endianness::Little
    };

    let engine_version = if format >= 7 {
        reader.read_cstring()?
    } else {
        String::new()
    };
    let version = if engine_version.is_empty() {
        UnityVersion::default()
    } else {
        engine_version.parse()?
    };
    let platform = if format >= 8 { reader.read_i32()? } else { 0 };

    Ok(AssetsFileHeader {
        metadata_size,
        file_size,
        format,
        data_offset,
        endian: reader.endian,
        engine_version,
        version,
        platform,
    })
}

/// Width of a pathID in the object index and script table
fn read_path_id(format: u32, long_object_ids: bool, reader: &mut Reader) -> Result<i64> {
    if format >= 14 {
        reader.align(4);
        reader.read_i64()
    } else if long_object_ids {
        reader.read_i64()
    } else {
        Ok(reader.read_i32()?.into())
    }
}

fn read_asset_info(
    format: u32,
    long_object_ids: bool,
    type_metadata: &TypeMetadata,
    reader: &mut Reader,
) -> Result<AssetInfo> {
    let path_id = read_path_id(format, long_object_ids, reader)?;
    let data_offset = if format >= 22 {
        reader.read_i64()?
    } else {
        reader.read_u32()?.into()
    };
    let size = reader.read_u32()?;
    let type_id = reader.read_i32()?;

    let class_id = if format < 16 {
        reader.read_u16()?.into()
    } else {
        type_metadata
            .get(type_id)
            .map(|t| t.class_id)
            .ok_or_else(|| {
                Error::invalid(
                    reader.position(),
                    format!("Type index {type_id} out of range"),
                )
                .in_object(path_id)
            })?
    };

    let is_destroyed = if format < 16 {
        reader.read_u16()? != 0
    } else {
        false
    };
    let stripped = if format == 15 || format == 16 {
        reader.read_u8()? != 0
    } else {
        false
    };

    Ok(AssetInfo {
        path_id,
        data_offset,
        size,
        type_id,
        class_id,
        is_destroyed,
        stripped,
    })
}
