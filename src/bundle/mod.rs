//! UnityFS asset bundles: a header, a directory of blocks and entries, and block data that
//! decompresses into one contiguous data space.

use std::{fs, path::Path};

use bytes::Bytes;
use rayon::iter::{
    IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator, ParallelIterator,
};
use tracing::{debug, trace};

use crate::{
    assets::AssetsFile,
    compression::{decompress, CompressionKind},
    error::{Error, Result},
    io::align_up,
};

pub mod parser;
pub mod types;
use parser::{check_preamble, parse_directory, parse_header};
use types::*;

#[derive(Debug, Clone)]
pub struct Bundle {
    header: BundleHeader,
    directory: Directory,
    /// Every block decompressed, back to back
    data: Bytes,
}

impl Bundle {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read(path.as_ref())?;
        Self::from_bytes(contents.into())
    }

    pub fn from_bytes(contents: Bytes) -> Result<Self> {
        check_preamble(&contents)?;
        let (header, mut pos) = parse_header(&contents)?;
        debug!(
            version = header.version,
            engine_version = %header.engine_version,
            flags = format_args!("{:#x}", header.flags),
            compression = ?header.compression_kind().ok(),
            "Read bundle header"
        );

        if header.version >= 7 {
            pos = align_up(pos, 16);
        }

        let directory_size = header.compressed_size as usize;
        let directory_start = if header.directory_at_end() {
            contents
                .len()
                .checked_sub(directory_size)
                .ok_or(Error::UnexpectedEof {
                    offset: contents.len(),
                    wanted: directory_size,
                })?
        } else {
            let start = pos;
            pos += directory_size;
            start
        };
        let directory_bytes = contents
            .get(directory_start..directory_start + directory_size)
            .ok_or(Error::UnexpectedEof {
                offset: directory_start,
                wanted: directory_size,
            })?;
        let directory_bytes = decompress(
            header.compression_kind()?,
            directory_bytes,
            header.decompressed_size as usize,
        )?;
        let directory = parse_directory(&directory_bytes, directory_start)?;
        debug!(
            blocks = directory.blocks.len(),
            entries = directory.entries.len(),
            "Read bundle directory"
        );

        if header.needs_padding() {
            pos = align_up(pos, 16);
        }
        let data = decompress_blocks(&contents, pos, &directory.blocks)?;

        Ok(Self {
            header,
            directory,
            data,
        })
    }

    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    /// Codec of the directory
    pub fn compression_kind(&self) -> Result<CompressionKind> {
        self.header.compression_kind()
    }

    pub fn blocks(&self) -> &[BlockInfo] {
        &self.directory.blocks
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.directory.entries
    }

    /// Paths of all entries, in directory order
    pub fn file_list(&self) -> Vec<&str> {
        self.directory
            .entries
            .iter()
            .map(|e| e.path.as_str())
            .collect()
    }

    pub fn entry(&self, name: &str) -> Option<&DirectoryEntry> {
        self.directory.entries.iter().find(|e| e.path == name)
    }

    /// Size of the decompressed data space
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Slice of the decompressed data space. Shares the underlying buffer.
    pub fn read_range(&self, offset: usize, len: usize) -> Result<Bytes> {
        let end = offset.checked_add(len).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => Ok(self.data.slice(offset..end)),
            None => Err(Error::UnexpectedEof {
                offset,
                wanted: len,
            }),
        }
    }

    fn read_entry(&self, entry: &DirectoryEntry) -> Result<Bytes> {
        let offset = usize::try_from(entry.offset)
            .map_err(|_| Error::invalid(0, format!("Negative offset for entry {}", entry.path)))?;
        let size = usize::try_from(entry.size)
            .map_err(|_| Error::invalid(0, format!("Negative size for entry {}", entry.path)))?;

        self.read_range(offset, size)
    }

    pub fn extract_one(&self, name: &str) -> Result<Bytes> {
        let entry = self
            .entry(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_owned()))?;
        trace!(name, offset = entry.offset, size = entry.size, "Extracting entry");

        self.read_entry(entry)
    }

    pub fn extract_all(&self) -> Result<Vec<(&str, Bytes)>> {
        self.directory
            .entries
            .iter()
            .map(|e| Ok((e.path.as_str(), self.read_entry(e)?)))
            .collect()
    }

    pub fn open_assets_file(&self, name: &str) -> Result<AssetsFile> {
        AssetsFile::from_bytes(self.extract_one(name)?)
    }

    /// Parse every entry flagged as a serialized file
    pub fn assets_files(&self) -> Vec<(&str, Result<AssetsFile>)> {
        self.directory
            .entries
            .par_iter()
            .filter(|e| e.is_serialized_file())
            .map(|e| {
                let assets = self.read_entry(e).and_then(AssetsFile::from_bytes);
                (e.path.as_str(), assets)
            })
            .collect()
    }
}

/// Decompress every block into one buffer, each block into its own region in parallel
fn decompress_blocks(contents: &[u8], start: usize, blocks: &[BlockInfo]) -> Result<Bytes> {
    let mut sources = Vec::with_capacity(blocks.len());
    let mut pos = start;
    for block in blocks {
        let size = block.compressed_size as usize;
        let source = contents.get(pos..pos + size).ok_or(Error::UnexpectedEof {
            offset: pos,
            wanted: size,
        })?;
        sources.push(source);
        pos += size;
    }

    let total = blocks
        .iter()
        .map(|b| b.decompressed_size as usize)
        .sum();
    let mut buf = vec![0; total];

    // Chunk into slices which can be written to in parallel
    let mut chunks = Vec::with_capacity(blocks.len());
    let mut rest = buf.as_mut_slice();
    for block in blocks {
        let (chunk, tail) = rest.split_at_mut(block.decompressed_size as usize);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
        .into_par_iter()
        .zip(blocks.par_iter().zip(sources))
        .try_for_each(|(chunk, (block, source))| -> Result<()> {
            let kind = block.compression_kind()?;
            let decompressed = decompress(kind, source, chunk.len())?;
            trace!(?kind, size = chunk.len(), "Decompressed block");
            chunk.copy_from_slice(&decompressed);
            Ok(())
        })?;

    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Version 6, uncompressed, directory at the end, one block holding `payload` as "CAB-0000"
    fn simple_bundle(payload: &[u8]) -> Vec<u8> {
        let mut directory = vec![0; 16];
        directory.extend_from_slice(&1i32.to_be_bytes());
        directory.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        directory.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        directory.extend_from_slice(&0u16.to_be_bytes());
        directory.extend_from_slice(&1i32.to_be_bytes());
        directory.extend_from_slice(&0i64.to_be_bytes());
        directory.extend_from_slice(&(payload.len() as i64).to_be_bytes());
        directory.extend_from_slice(&4u32.to_be_bytes());
        directory.extend_from_slice(b"CAB-0000\0");

        let mut bytes = b"UnityFS\0".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(b"5.x.x\0");
        bytes.extend_from_slice(b"2019.4.3f1\0");
        let total_size_at = bytes.len();
        bytes.extend_from_slice(&0i64.to_be_bytes());
        bytes.extend_from_slice(&(directory.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&(directory.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&FLAG_BLOCKS_INFO_AT_END.to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(&directory);

        let total = bytes.len() as i64;
        bytes[total_size_at..total_size_at + 8].copy_from_slice(&total.to_be_bytes());
        bytes
    }

    #[test]
    fn test_extract_one() {
        let payload: Vec<u8> = (0..100).collect();
        let bundle = Bundle::from_bytes(simple_bundle(&payload).into()).unwrap();

        assert_eq!(bundle.header().engine_version, "2019.4.3f1");
        assert_eq!(bundle.compression_kind().unwrap(), CompressionKind::None);
        assert_eq!(bundle.file_list(), vec!["CAB-0000"]);
        assert_eq!(bundle.data_len(), 100);
        assert_eq!(bundle.extract_one("CAB-0000").unwrap(), payload);
    }

    #[test]
    fn test_entry_not_found() {
        let bundle = Bundle::from_bytes(simple_bundle(&[1, 2, 3, 4]).into()).unwrap();
        let err = bundle.extract_one("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_read_range_bounds() {
        let bundle = Bundle::from_bytes(simple_bundle(&[1, 2, 3, 4]).into()).unwrap();
        assert_eq!(bundle.read_range(1, 2).unwrap(), vec![2, 3]);
        assert_eq!(
            bundle.read_range(3, 2).unwrap_err().kind(),
            ErrorKind::Bounds
        );
    }

    #[test]
    fn test_open_is_deterministic() {
        let bytes: Bytes = simple_bundle(b"some entry data").into();
        let a = Bundle::from_bytes(bytes.clone()).unwrap();
        let b = Bundle::from_bytes(bytes).unwrap();

        assert_eq!(a.header(), b.header());
        assert_eq!(a.entries(), b.entries());
        assert_eq!(a.extract_all().unwrap(), b.extract_all().unwrap());
    }

    #[test]
    fn test_bad_signature() {
        let mut bytes = simple_bundle(&[0; 8]);
        bytes[0] = b'X';
        let err = Bundle::from_bytes(bytes.into()).unwrap_err();
        assert!(matches!(err, Error::InvalidSignature(_)));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = simple_bundle(&[0; 8]);
        bytes[8..12].copy_from_slice(&8u32.to_be_bytes());
        assert!(matches!(
            Bundle::from_bytes(bytes.into()),
            Err(Error::UnsupportedBundleVersion(8))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = simple_bundle(&[0; 8]);
        let err = Bundle::from_bytes(bytes[..20].to_vec().into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Bounds);
        assert!(matches!(err, Error::UnexpectedEof { offset: 20, .. }));
    }
}
