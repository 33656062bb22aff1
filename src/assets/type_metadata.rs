use serde::Serialize;
use tracing::trace;

use super::type_tree::TypeTree;
use crate::{error::Result, io::Reader};

const MAX_TYPES: usize = 0x10000;

/// MonoBehaviour class ID, whose entries carry a second hash for the script
const MONO_BEHAVIOUR: i32 = 114;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeEntry {
    pub class_id: i32,
    pub is_stripped: bool,
    /// `-1 - index` from format 17, the class ID before that
    pub script_id: i32,
    pub hash: Vec<u8>,
    pub type_tree: Option<TypeTree>,
    pub type_dependencies: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeMetadata {
    pub has_type_trees: bool,
    pub types: Vec<TypeEntry>,
}

impl TypeMetadata {
    pub fn read(format: u32, reader: &mut Reader) -> Result<Self> {
        if format < 13 {
            return Self::read_legacy(format, reader);
        }

        let has_type_trees = reader.read_bool()?;
        let count = reader.read_length(MAX_TYPES)?;
        let types = (0..count)
            .map(|_| read_entry(format, has_type_trees, reader))
            .collect::<Result<_>>()?;

        Ok(Self {
            has_type_trees,
            types,
        })
    }

    fn read_legacy(format: u32, reader: &mut Reader) -> Result<Self> {
        let count = reader.read_length(MAX_TYPES)?;
        let mut types = Vec::with_capacity(count);
        for _ in 0..count {
            let class_id = reader.read_i32()?;
            let type_tree = TypeTree::read(format, reader)?;
            trace!(class_id, nodes = type_tree.node_count(), "Read type tree");
            types.push(TypeEntry {
                class_id,
                is_stripped: false,
                script_id: class_id,
                hash: vec![],
                type_tree: Some(type_tree),
                type_dependencies: vec![],
            });
        }

        Ok(Self {
            has_type_trees: true,
            types,
        })
    }

    /// Entry at an object's type index
    pub fn get(&self, type_id: i32) -> Option<&TypeEntry> {
        usize::try_from(type_id).ok().and_then(|i| self.types.get(i))
    }

    /// First stored tree for a class
    pub fn type_tree(&self, class_id: i32) -> Option<&TypeTree> {
        self.types
            .iter()
            .filter(|t| t.class_id == class_id)
            .find_map(|t| t.type_tree.as_ref())
    }
}

fn hash_len(format: u32, class_id: i32) -> usize {
    let is_script = if format < 16 {
        class_id < 0
    } else {
        class_id == MONO_BEHAVIOUR
    };

    if is_script {
        0x20
    } else {
        0x10
    }
}

fn read_entry(format: u32, has_type_trees: bool, reader: &mut Reader) -> Result<TypeEntry> {
    let class_id = reader.read_i32()?;

    let (is_stripped, script_id) = if format >= 17 {
        let is_stripped = reader.read_bool()?;
        let script_index = reader.read_i16()?;
        (is_stripped, -1 - i32::from(script_index))
    } else {
        (false, class_id)
    };

    let hash = reader.read_bytes(hash_len(format, class_id))?.to_vec();

    let mut type_tree = None;
    let mut type_dependencies = vec![];
    if has_type_trees {
        let tree = TypeTree::read(format, reader)?;
        trace!(class_id, nodes = tree.node_count(), "Read type tree");
        type_tree = Some(tree);
        if format >= 21 {
            let count = reader.read_length(MAX_TYPES)?;
            type_dependencies = (0..count)
                .map(|_| reader.read_i32())
                .collect::<Result<_>>()?;
        }
    }

    Ok(TypeEntry {
        class_id,
        is_stripped,
        script_id,
        hash,
        type_tree,
        type_dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Endianness, Writer};

    #[test]
    fn test_hash_len() {
        assert_eq!(hash_len(15, -3), 0x20);
        assert_eq!(hash_len(15, 114), 0x10);
        assert_eq!(hash_len(17, 114), 0x20);
        assert_eq!(hash_len(17, -3), 0x10);
        assert_eq!(hash_len(22, 1), 0x10);
    }

    #[test]
    fn test_without_type_trees() {
        let mut w = Writer::new(Endianness::Little);
        w.write_bool(false);
        w.write_i32(2);

        w.write_i32(1);
        w.write_u8(0);
        w.write_i16(-1);
        w.write_bytes(&[0x11; 16]);

        w.write_i32(114);
        w.write_u8(0);
        w.write_i16(2);
        w.write_bytes(&[0x22; 32]);
        w.write_u32(0xDEADBEEF);

        let bytes = w.into_inner();
        let mut reader = Reader::new(&bytes, Endianness::Little);
        let metadata = TypeMetadata::read(17, &mut reader).unwrap();

        assert!(!metadata.has_type_trees);
        assert_eq!(metadata.types.len(), 2);
        assert_eq!(metadata.types[0].script_id, 0);
        assert_eq!(metadata.types[1].script_id, -3);
        assert_eq!(metadata.types[1].hash.len(), 32);
        assert!(metadata.types[1].type_tree.is_none());
        assert_eq!(metadata.get(1).unwrap().class_id, 114);
        assert!(metadata.get(2).is_none());
        assert!(metadata.get(-1).is_none());

        // Reader stops right after the metadata
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_type_dependencies() {
        let mut w = Writer::new(Endianness::Little);
        w.write_bool(true);
        w.write_i32(1);
        w.write_i32(49);
        w.write_u8(0);
        w.write_i16(-1);
        w.write_bytes(&[0; 16]);
        // Empty flat tree
        w.write_i32(0);
        w.write_i32(0);
        // Dependencies
        w.write_i32(2);
        w.write_i32(5);
        w.write_i32(6);

        let bytes = w.into_inner();
        let mut reader = Reader::new(&bytes, Endianness::Little);
        let metadata = TypeMetadata::read(21, &mut reader).unwrap();
        assert_eq!(reader.remaining(), 0);
        assert_eq!(metadata.types[0].type_dependencies, vec![5, 6]);
        assert!(metadata.type_tree(49).is_some());
        assert!(metadata.type_tree(1).is_none());
    }
}
