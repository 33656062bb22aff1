use serde::Serialize;

use crate::{compression::CompressionKind, error::Result};

pub const SIGNATURE: &str = "UnityFS";

/// Directory and blocks are stored together
pub const FLAG_BLOCKS_AND_DIRECTORY_COMBINED: u32 = 0x40;
/// Directory is stored at the end of the file rather than after the header
pub const FLAG_BLOCKS_INFO_AT_END: u32 = 0x80;
/// Block data starts on a 16-byte boundary after the directory
pub const FLAG_BLOCK_INFO_NEEDS_PADDING: u32 = 0x200;

/// Directory entry flag marking a serialized assets file
pub const ENTRY_FLAG_SERIALIZED_FILE: u32 = 0x4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleHeader {
    pub signature: String,
    pub version: u32,
    pub min_player_version: String,
    pub engine_version: String,
    pub total_size: i64,
    /// Size of the directory as stored
    pub compressed_size: u32,
    /// Size of the directory once decompressed
    pub decompressed_size: u32,
    pub flags: u32,
}

impl BundleHeader {
    /// Codec of the directory
    pub fn compression_kind(&self) -> Result<CompressionKind> {
        CompressionKind::from_flags(self.flags)
    }

    pub fn directory_at_end(&self) -> bool {
        self.flags & FLAG_BLOCKS_INFO_AT_END != 0
    }

    pub fn needs_padding(&self) -> bool {
        self.flags & FLAG_BLOCK_INFO_NEEDS_PADDING != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub decompressed_size: u32,
    pub compressed_size: u32,
    /// Low bits select the codec
    pub flags: u16,
}

impl BlockInfo {
    pub fn compression_kind(&self) -> Result<CompressionKind> {
        CompressionKind::from_flags(self.flags.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Offset into the decompressed data space
    pub offset: i64,
    pub size: i64,
    pub flags: u32,
    pub path: String,
}

impl DirectoryEntry {
    pub fn is_serialized_file(&self) -> bool {
        self.flags & ENTRY_FLAG_SERIALIZED_FILE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    pub hash: [u8; 16],
    pub blocks: Vec<BlockInfo>,
    pub entries: Vec<DirectoryEntry>,
}
