use winnow::binary::Endianness;

use super::reader::align_up;
use crate::error::{Error, Result};

/// Growable byte buffer with a cursor.
///
/// Writes at the cursor overwrite existing bytes and extend the buffer past its end.
#[derive(Debug, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    pos: usize,
    pub endian: Endianness,
}

macro_rules! write_numbers {
    ($($name:ident => $ty:ty;)*) => {
        $(
            pub fn $name(&mut self, value: $ty) {
                match self.endian {
                    Endianness::Big => self.write_bytes(&value.to_be_bytes()),
                    Endianness::Little => self.write_bytes(&value.to_le_bytes()),
                    Endianness::Native => self.write_bytes(&value.to_ne_bytes()),
                }
            }
        )*
    };
}

impl Writer {
    pub fn new(endian: Endianness) -> Self {
        Self::with_capacity(0, endian)
    }

    pub fn with_capacity(capacity: usize, endian: Endianness) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            pos: 0,
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Move the cursor within the bytes written so far
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(Error::UnexpectedEof {
                offset: self.buf.len(),
                wanted: pos - self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.seek(self.pos + count)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        let overlap = self.buf.len().min(end).saturating_sub(self.pos);
        self.buf[self.pos..self.pos + overlap].copy_from_slice(&bytes[..overlap]);
        self.buf.extend_from_slice(&bytes[overlap..]);
        self.pos = end;
    }

    write_numbers! {
        write_u16 => u16;
        write_i16 => i16;
        write_u32 => u32;
        write_i32 => i32;
        write_u64 => u64;
        write_i64 => i64;
        write_f32 => f32;
        write_f64 => f64;
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn write_cstring(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
        self.write_u8(0);
    }

    /// Signed 32-bit length prefix, rejecting anything that doesn't fit
    pub fn write_length(&mut self, length: usize) -> Result<()> {
        let value = i32::try_from(length).map_err(|_| Error::LengthLimit {
            offset: self.pos,
            length: i64::try_from(length).unwrap_or(i64::MAX),
            limit: i32::MAX as usize,
        })?;
        self.write_i32(value);
        Ok(())
    }

    /// Signed 32-bit length, the UTF-8 bytes, then zero padding to 4
    pub fn write_aligned_string(&mut self, value: &str) -> Result<()> {
        self.write_length(value.len())?;
        self.write_bytes(value.as_bytes());
        self.align(4);
        Ok(())
    }

    /// Zero-pad up to the next multiple of `alignment`
    pub fn align(&mut self, alignment: usize) {
        let padding = align_up(self.pos, alignment) - self.pos;
        self.write_bytes(&vec![0; padding]);
    }
}
