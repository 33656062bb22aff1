//! Block and directory codecs used inside bundles

use std::io::Read;

use xz2::{read::XzDecoder, stream::Stream};

use crate::error::{Error, Result};

/// Low bits of the header and block flags select the codec
pub const COMPRESSION_MASK: u32 = 0x3F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    None,
    Lzma,
    Lz4,
    Lz4Hc,
}

impl CompressionKind {
    pub fn from_flags(flags: u32) -> Result<Self> {
        Self::try_from(flags & COMPRESSION_MASK)
    }
}

impl TryFrom<u32> for CompressionKind {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        use CompressionKind::*;
        let kind = match value {
            0 => None,
            1 => Lzma,
            2 => Lz4,
            3 => Lz4Hc,
            x => return Err(Error::UnsupportedCompression(x)),
        };

        Ok(kind)
    }
}

/// Decode a compressed payload to exactly `decompressed_size` bytes
pub fn decompress(kind: CompressionKind, data: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let decompressed = match kind {
        CompressionKind::None => data.to_vec(),
        CompressionKind::Lzma => decompress_lzma(data, decompressed_size)?,
        CompressionKind::Lz4 | CompressionKind::Lz4Hc => {
            lz4_flex::block::decompress(data, decompressed_size).map_err(|e| Error::Decompress {
                kind,
                reason: e.to_string(),
            })?
        }
    };

    if decompressed.len() != decompressed_size {
        return Err(Error::Decompress {
            kind,
            reason: format!(
                "expected {decompressed_size} bytes, got {}",
                decompressed.len()
            ),
        });
    }

    Ok(decompressed)
}

/// Raw LZMA: 5 property bytes then the stream, with no size field. The decoder wants the
/// classic 13-byte header, so the size is spliced in after the properties.
fn decompress_lzma(data: &[u8], decompressed_size: usize) -> Result<Vec<u8>> {
    let err = |reason: String| Error::Decompress {
        kind: CompressionKind::Lzma,
        reason,
    };

    let (props, payload) = data
        .split_at_checked(5)
        .ok_or_else(|| err(format!("{} bytes is too short for LZMA properties", data.len())))?;

    let mut header = Vec::with_capacity(13);
    header.extend_from_slice(props);
    header.extend_from_slice(&(decompressed_size as u64).to_le_bytes());

    let stream = Stream::new_lzma_decoder(u64::MAX).map_err(|e| err(e.to_string()))?;
    let decoder = XzDecoder::new_stream(header.as_slice().chain(payload), stream);

    read_bounded(decoder, decompressed_size).map_err(|e| err(e.to_string()))
}

/// Read at most one byte past `size`, enough for the caller's length check to catch overruns
fn read_bounded(reader: impl Read, size: usize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size);
    reader.take(size as u64 + 1).read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use xz2::{
        stream::{LzmaOptions, Stream},
        write::XzEncoder,
    };

    use super::*;

    fn sample() -> Vec<u8> {
        b"m_Name m_GameObject m_Enabled m_Script "
            .iter()
            .cycle()
            .take(4096)
            .copied()
            .collect()
    }

    /// Encode the way bundles store it: properties followed by the stream, no size field
    fn compress_lzma(data: &[u8]) -> Vec<u8> {
        let options = LzmaOptions::new_preset(6).unwrap();
        let stream = Stream::new_lzma_encoder(&options).unwrap();
        let mut encoder = XzEncoder::new_stream(Vec::new(), stream);
        encoder.write_all(data).unwrap();
        let encoded = encoder.finish().unwrap();

        let mut out = encoded[..5].to_vec();
        out.extend_from_slice(&encoded[13..]);
        out
    }

    #[test]
    fn test_kind_from_flags() {
        assert_eq!(
            CompressionKind::from_flags(0x43).unwrap(),
            CompressionKind::Lz4Hc
        );
        assert_eq!(
            CompressionKind::from_flags(0x80).unwrap(),
            CompressionKind::None
        );
        assert!(matches!(
            CompressionKind::from_flags(4),
            Err(Error::UnsupportedCompression(4))
        ));
    }

    #[test]
    fn test_none() {
        let data = sample();
        assert_eq!(
            decompress(CompressionKind::None, &data, data.len()).unwrap(),
            data
        );
        assert!(decompress(CompressionKind::None, &data, data.len() + 1).is_err());
    }

    #[test]
    fn test_lz4() {
        let data = sample();
        let compressed = lz4_flex::block::compress(&data);
        assert!(compressed.len() < data.len());

        let decompressed = decompress(CompressionKind::Lz4Hc, &compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_lz4_corrupt() {
        let data = sample();
        let compressed = lz4_flex::block::compress(&data);
        let err = decompress(CompressionKind::Lz4, &compressed[..compressed.len() / 2], data.len())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decompress {
                kind: CompressionKind::Lz4,
                ..
            }
        ));
    }

    #[test]
    fn test_lzma() {
        let data = sample();
        let compressed = compress_lzma(&data);

        let decompressed = decompress(CompressionKind::Lzma, &compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_lzma_too_short() {
        assert!(decompress(CompressionKind::Lzma, &[0x5D, 0, 0], 10).is_err());
    }

    #[test]
    fn test_output_is_bounded() {
        let data = vec![0x42; 4096];
        assert_eq!(read_bounded(data.as_slice(), 100).unwrap().len(), 101);
        assert_eq!(read_bounded(&data[..50], 100).unwrap().len(), 50);
    }

    #[test]
    fn test_lzma_overrun_rejected() {
        let data = sample();
        let compressed = compress_lzma(&data);
        // Declared smaller than the stream: either stops early or fails, never overruns
        match decompress(CompressionKind::Lzma, &compressed, 64) {
            Ok(out) => assert_eq!(out, &data[..64]),
            Err(e) => assert!(matches!(e, Error::Decompress { .. })),
        }
    }
}
