use winnow::{
    Parser,
    binary::{be_i64, be_u16, be_u32, length_repeat},
    combinator::preceded,
    token::{any, take_till},
};

use super::types::*;
use crate::{
    error::{Error, Result},
    io::parsers::{TraceHelper, WinnowParser, cstring, hash16, parse_error},
};

pub fn header<'a>() -> impl WinnowParser<&'a [u8], BundleHeader> {
    (
        cstring(),
        be_u32,
        cstring(),
        cstring(),
        be_i64,
        be_u32,
        be_u32,
        be_u32,
    )
        .map(
            |(
                signature,
                version,
                min_player_version,
                engine_version,
                total_size,
                compressed_size,
                decompressed_size,
                flags,
            )| BundleHeader {
                signature,
                version,
                min_player_version,
                engine_version,
                total_size,
                compressed_size,
                decompressed_size,
                flags,
            },
        )
        .trace("header")
}

fn block_info<'a>() -> impl WinnowParser<&'a [u8], BlockInfo> {
    (be_u32, be_u32, be_u16)
        .map(|(decompressed_size, compressed_size, flags)| BlockInfo {
            decompressed_size,
            compressed_size,
            flags,
        })
        .trace("block_info")
}

fn directory_entry<'a>() -> impl WinnowParser<&'a [u8], DirectoryEntry> {
    (be_i64, be_i64, be_u32, cstring())
        .map(|(offset, size, flags, path)| DirectoryEntry {
            offset,
            size,
            flags,
            path,
        })
        .trace("directory_entry")
}

pub fn directory<'a>() -> impl WinnowParser<&'a [u8], Directory> {
    (
        hash16(),
        length_repeat(be_u32, block_info()),
        length_repeat(be_u32, directory_entry()),
    )
        .map(|(hash, blocks, entries)| Directory {
            hash,
            blocks,
            entries,
        })
        .trace("directory")
}

/// Check the signature and format version before committing to the full header layout
pub fn check_preamble(contents: &[u8]) -> Result<()> {
    let mut input = contents;
    let signature: &[u8] = take_till(0.., 0u8)
        .parse_next(&mut input)
        .map_err(|_: winnow::error::ContextError| Error::InvalidSignature(String::new()))?;
    if signature != SIGNATURE.as_bytes() {
        return Err(Error::InvalidSignature(
            String::from_utf8_lossy(signature).into_owned(),
        ));
    }

    let version = preceded(any, be_u32)
        .parse_next(&mut input)
        .map_err(|_: winnow::error::ContextError| Error::UnexpectedEof {
            offset: signature.len() + 1,
            wanted: 4,
        })?;
    if !(6..=7).contains(&version) {
        return Err(Error::UnsupportedBundleVersion(version));
    }

    Ok(())
}

pub fn parse_header(contents: &[u8]) -> Result<(BundleHeader, usize)> {
    let mut input = contents;
    let header = header()
        .parse_next(&mut input)
        .map_err(|e| parse_error(&e, 0, contents.len(), "bundle header"))?;

    Ok((header, contents.len() - input.len()))
}

pub fn parse_directory(contents: &[u8], offset: usize) -> Result<Directory> {
    let mut input = contents;
    directory()
        .parse_next(&mut input)
        .map_err(|e| parse_error(&e, offset, contents.len(), "bundle directory"))
}
