//! Synthesizes bundles and assets files for the integration tests
#![allow(dead_code)]

use std::io::Write;

use unity_asset_tools::{
    compression::CompressionKind,
    io::{align_up, Endianness, Writer},
};
use xz2::{
    stream::{LzmaOptions, Stream},
    write::XzEncoder,
};

pub const ENGINE_VERSION: &str = "2019.4.3f1";

pub fn compress(kind: CompressionKind, data: &[u8]) -> Vec<u8> {
    match kind {
        CompressionKind::None => data.to_vec(),
        CompressionKind::Lz4 | CompressionKind::Lz4Hc => lz4_flex::block::compress(data),
        CompressionKind::Lzma => {
            let options = LzmaOptions::new_preset(6).unwrap();
            let stream = Stream::new_lzma_encoder(&options).unwrap();
            let mut encoder = XzEncoder::new_stream(Vec::new(), stream);
            encoder.write_all(data).unwrap();
            let encoded = encoder.finish().unwrap();

            // Drop the size field, bundles only store the properties
            let mut out = encoded[..5].to_vec();
            out.extend_from_slice(&encoded[13..]);
            out
        }
    }
}

fn kind_flag(kind: CompressionKind) -> u32 {
    match kind {
        CompressionKind::None => 0,
        CompressionKind::Lzma => 1,
        CompressionKind::Lz4 => 2,
        CompressionKind::Lz4Hc => 3,
    }
}

pub struct BundleBuilder {
    pub version: u32,
    pub directory_kind: CompressionKind,
    pub block_kind: CompressionKind,
    pub directory_at_end: bool,
    pub padding: bool,
    pub block_size: Option<usize>,
    pub entries: Vec<(String, Vec<u8>, u32)>,
}

impl BundleBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            directory_kind: CompressionKind::None,
            block_kind: CompressionKind::None,
            directory_at_end: false,
            padding: false,
            block_size: None,
            entries: vec![],
        }
    }

    pub fn entry(mut self, path: &str, data: &[u8], flags: u32) -> Self {
        self.entries.push((path.to_owned(), data.to_vec(), flags));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![];
        let mut entries = vec![];
        for (path, contents, flags) in &self.entries {
            entries.push((data.len() as i64, contents.len() as i64, *flags, path));
            data.extend_from_slice(contents);
        }

        let block_size = self.block_size.unwrap_or(data.len().max(1));
        let blocks: Vec<(usize, Vec<u8>)> = data
            .chunks(block_size)
            .map(|chunk| (chunk.len(), compress(self.block_kind, chunk)))
            .collect();

        let mut directory = Writer::new(Endianness::Big);
        directory.write_bytes(&[0x5A; 16]);
        directory.write_i32(blocks.len() as i32);
        for (size, compressed) in &blocks {
            directory.write_u32(*size as u32);
            directory.write_u32(compressed.len() as u32);
            directory.write_u16(kind_flag(self.block_kind) as u16 | 0x40);
        }
        directory.write_i32(entries.len() as i32);
        for (offset, size, flags, path) in &entries {
            directory.write_i64(*offset);
            directory.write_i64(*size);
            directory.write_u32(*flags);
            directory.write_cstring(path);
        }
        let directory = directory.into_inner();
        let compressed_directory = compress(self.directory_kind, &directory);

        let mut flags = kind_flag(self.directory_kind) | 0x40;
        if self.directory_at_end {
            flags |= 0x80;
        }
        if self.padding {
            flags |= 0x200;
        }

        let mut w = Writer::new(Endianness::Big);
        w.write_cstring("UnityFS");
        w.write_u32(self.version);
        w.write_cstring("5.x.x");
        w.write_cstring(ENGINE_VERSION);
        let total_size_at = w.position();
        w.write_i64(0);
        w.write_u32(compressed_directory.len() as u32);
        w.write_u32(directory.len() as u32);
        w.write_u32(flags);
        if self.version >= 7 {
            w.align(16);
        }
        if !self.directory_at_end {
            w.write_bytes(&compressed_directory);
        }
        if self.padding {
            w.align(16);
        }
        for (_, compressed) in &blocks {
            w.write_bytes(compressed);
        }
        if self.directory_at_end {
            w.write_bytes(&compressed_directory);
        }

        let total = w.len() as i64;
        w.seek(total_size_at).unwrap();
        w.write_i64(total);
        w.into_inner()
    }
}

pub struct TestObject {
    pub path_id: i64,
    pub class_id: i32,
    pub data: Vec<u8>,
}

pub struct AssetsBuilder {
    pub format: u32,
    pub endian: Endianness,
    pub long_object_ids: bool,
    /// Embed a small type tree for every class
    pub type_trees: bool,
    pub version: String,
    pub objects: Vec<TestObject>,
    pub references: Vec<String>,
}

impl AssetsBuilder {
    pub fn new(format: u32) -> Self {
        Self {
            format,
            endian: Endianness::Little,
            long_object_ids: false,
            type_trees: false,
            version: ENGINE_VERSION.to_owned(),
            objects: vec![],
            references: vec![],
        }
    }

    pub fn object(mut self, path_id: i64, class_id: i32, data: &[u8]) -> Self {
        self.objects.push(TestObject {
            path_id,
            class_id,
            data: data.to_vec(),
        });
        self
    }

    fn classes(&self) -> Vec<i32> {
        let mut classes = vec![];
        for object in &self.objects {
            if !classes.contains(&object.class_id) {
                classes.push(object.class_id);
            }
        }
        classes
    }

    /// Relative offsets, each object 8-byte aligned
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = vec![];
        let mut pos = 0;
        for object in &self.objects {
            pos = align_up(pos, 8);
            offsets.push(pos);
            pos += object.data.len();
        }
        offsets
    }

    pub fn build(&self) -> Vec<u8> {
        let format = self.format;
        let header_len = if format >= 22 {
            48
        } else if format >= 9 {
            20
        } else {
            16
        };

        let metadata = self.metadata();

        let mut w = Writer::new(Endianness::Big);
        w.write_bytes(&vec![0; header_len]);
        if format >= 9 {
            w.write_bytes(&metadata);
            w.align(16);
        }
        let data_offset = w.position();
        for (object, offset) in self.objects.iter().zip(self.offsets()) {
            w.align(8);
            assert_eq!(w.position(), data_offset + offset);
            w.write_bytes(&object.data);
        }
        if format < 9 {
            w.write_bytes(&metadata);
        }
        let file_size = w.len();

        w.seek(0).unwrap();
        w.write_u32(metadata.len() as u32);
        w.write_u32(file_size as u32);
        w.write_u32(format);
        w.write_u32(data_offset as u32);
        if format >= 9 {
            w.write_u32(matches!(self.endian, Endianness::Big) as u32);
        }
        if format >= 22 {
            w.write_u32(metadata.len() as u32);
            w.write_i64(file_size as i64);
            w.write_i64(data_offset as i64);
        }

        w.into_inner()
    }

    /// Everything after the fixed header. Before format 9 this starts with the endianness byte and
    /// is placed after the objects.
    fn metadata(&self) -> Vec<u8> {
        let format = self.format;
        let mut w = Writer::new(self.endian);
        if format < 9 {
            w.write_u8(matches!(self.endian, Endianness::Big) as u8);
        }
        if format >= 7 {
            w.write_cstring(&self.version);
        }
        if format >= 8 {
            w.write_i32(5);
        }

        let classes = self.classes();
        if format >= 13 {
            w.write_bool(self.type_trees);
            w.write_i32(classes.len() as i32);
            for &class_id in &classes {
                w.write_i32(class_id);
                if format >= 17 {
                    w.write_u8(0);
                    w.write_i16(-1);
                }
                let script = if format < 16 { class_id < 0 } else { class_id == 114 };
                w.write_bytes(&vec![0; if script { 32 } else { 16 }]);
                if self.type_trees {
                    write_type_tree(&mut w, format, class_id);
                    if format >= 21 {
                        w.write_i32(0);
                    }
                }
            }
        } else if self.type_trees {
            w.write_i32(classes.len() as i32);
            for &class_id in &classes {
                w.write_i32(class_id);
                write_type_tree(&mut w, format, class_id);
            }
        } else {
            w.write_i32(0);
        }

        if (7..14).contains(&format) {
            w.write_i32(self.long_object_ids as i32);
        }

        w.write_i32(self.objects.len() as i32);
        for (object, offset) in self.objects.iter().zip(self.offsets()) {
            if format >= 14 {
                // The fixed headers are multiples of 4, so this matches file alignment
                w.align(4);
                w.write_i64(object.path_id);
            } else if self.long_object_ids {
                w.write_i64(object.path_id);
            } else {
                w.write_i32(object.path_id as i32);
            }
            if format >= 22 {
                w.write_i64(offset as i64);
            } else {
                w.write_u32(offset as u32);
            }
            w.write_u32(object.data.len() as u32);
            let type_id = classes.iter().position(|c| *c == object.class_id).unwrap();
            w.write_i32(type_id as i32);
            if format < 16 {
                w.write_u16(object.class_id as u16);
                w.write_u16(0);
            }
            if format == 15 || format == 16 {
                w.write_u8(0);
            }
        }

        if format >= 11 {
            w.write_i32(0);
        }
        if format >= 6 {
            w.write_i32(self.references.len() as i32);
            for path in &self.references {
                w.write_cstring("");
                w.write_bytes(&[0x11; 16]);
                w.write_i32(0);
                w.write_cstring(path);
            }
        }

        w.into_inner()
    }
}

pub fn class_name(class_id: i32) -> String {
    match class_id {
        1 => "GameObject".to_owned(),
        49 => "TextAsset".to_owned(),
        114 => "MonoBehaviour".to_owned(),
        _ => format!("Class{class_id}"),
    }
}

/// Root named "Base" with an `m_Name` string and an `m_Value` int
fn write_type_tree(w: &mut Writer, format: u32, class_id: i32) {
    let root = class_name(class_id);
    // (depth, type, name, size, flags)
    let nodes = [
        (0u8, root.as_str(), "Base", -1, 0),
        (1, "string", "m_Name", -1, 0x8000),
        (1, "int", "m_Value", 4, 0),
    ];

    if format == 10 || format >= 12 {
        // "Base" and "int" come from the shared table, the rest from the local buffer
        let mut strings = Writer::new(w.endian);
        let mut string_ref = |s: &str| match s {
            "Base" => (55u16, 0x8000u16),
            "int" => (222, 0x8000),
            _ => {
                let offset = strings.position() as u16;
                strings.write_cstring(s);
                (offset, 0)
            }
        };
        let refs: Vec<_> = nodes
            .iter()
            .map(|(_, type_name, name, _, _)| (string_ref(*type_name), string_ref(*name)))
            .collect();
        let strings = strings.into_inner();

        w.write_i32(nodes.len() as i32);
        w.write_i32(strings.len() as i32);
        for (i, ((depth, _, _, size, flags), (type_ref, name_ref))) in
            nodes.iter().zip(refs).enumerate()
        {
            w.write_i16(1);
            w.write_u8(*depth);
            w.write_bool(false);
            w.write_u16(type_ref.0);
            w.write_u16(type_ref.1);
            w.write_u16(name_ref.0);
            w.write_u16(name_ref.1);
            w.write_i32(*size);
            w.write_i32(i as i32);
            w.write_i32(*flags);
            if format >= 19 {
                w.write_u64(0);
            }
        }
        w.write_bytes(&strings);
    } else {
        write_legacy_node(w, nodes[0], 0, 2);
        write_legacy_node(w, nodes[1], 1, 0);
        write_legacy_node(w, nodes[2], 2, 0);
    }
}

fn write_legacy_node(
    w: &mut Writer,
    (_, type_name, name, size, flags): (u8, &str, &str, i32, i32),
    index: i32,
    children: i32,
) {
    w.write_cstring(type_name);
    w.write_cstring(name);
    w.write_i32(size);
    w.write_i32(index);
    // Not an array, version 1
    w.write_i32(0);
    w.write_i32(1);
    w.write_i32(flags);
    w.write_i32(children);
}

/// Payload for a named object of `class_id`, laid out the way name lookup expects
pub fn named_payload(class_id: i32, name: &str) -> Vec<u8> {
    let mut w = Writer::new(Endianness::Little);
    match class_id {
        // MonoBehaviour: two PPtrs and the enabled flag before the name
        114 => {
            w.write_i32(0);
            w.write_i64(1);
            w.write_u8(1);
            w.align(4);
            w.write_i32(0);
            w.write_i64(2);
        }
        // GameObject: no components, a layer
        1 => {
            w.write_i32(0);
            w.write_u32(0);
        }
        _ => {}
    }
    w.write_aligned_string(name).unwrap();
    match class_id {
        1 => {
            w.write_u16(0);
            w.write_bool(true);
            w.align(4);
        }
        49 => {
            w.write_i32(3);
            w.write_bytes(b"abc");
            w.align(4);
        }
        _ => {}
    }
    w.into_inner()
}
