use winnow::{
    Parser,
    binary::{self, Endianness},
    error::ContextError,
    token::{take, take_till},
};

use crate::error::{Error, Result};

/// Random-access reader over a byte slice.
///
/// Multi-byte values are decoded in `endian` order, which may be switched at any point. The
/// position may be aligned past the end of the data; the next read then fails with
/// [`Error::UnexpectedEof`].
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    pub endian: Endianness,
}

macro_rules! read_numbers {
    ($($name:ident => $ty:ty, $parser:ident;)*) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                let endian = self.endian;
                self.run(std::mem::size_of::<$ty>(), binary::$parser(endian))
            }
        )*
    };
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], endian: Endianness) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::UnexpectedEof {
                offset: self.data.len(),
                wanted: pos - self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        let target = self.pos.checked_add(count).ok_or(Error::UnexpectedEof {
            offset: self.pos,
            wanted: count,
        })?;
        if target > self.data.len() {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                wanted: count,
            });
        }
        self.pos = target;
        Ok(())
    }

    /// Advance to the next multiple of `alignment`
    pub fn align(&mut self, alignment: usize) {
        self.pos = align_up(self.pos, alignment);
    }

    /// Run a winnow parser at the current position, advancing past what it consumed
    pub fn run<T>(
        &mut self,
        wanted: usize,
        mut parser: impl Parser<&'a [u8], T, ContextError>,
    ) -> Result<T> {
        let data: &'a [u8] = self.data;
        let mut input = data.get(self.pos..).unwrap_or_default();
        let before = input.len();
        let value = parser
            .parse_next(&mut input)
            .map_err(|_| Error::UnexpectedEof {
                offset: self.pos,
                wanted,
            })?;
        self.pos += before - input.len();

        Ok(value)
    }

    read_numbers! {
        read_u16 => u16, u16;
        read_i16 => i16, i16;
        read_u32 => u32, u32;
        read_i32 => i32, i32;
        read_u64 => u64, u64;
        read_i64 => i64, i64;
        read_f32 => f32, f32;
        read_f64 => f64, f64;
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.run(1, binary::u8)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.run(1, binary::i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.run(count, take(count))
    }

    /// Null-terminated string. A missing terminator at end of data is tolerated.
    pub fn read_cstring(&mut self) -> Result<String> {
        let offset = self.pos;
        let bytes = self.run(1, take_till(0.., 0u8))?;
        if self.remaining() > 0 {
            self.pos += 1;
        }

        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| Error::Utf8 { offset, source })
    }

    /// Signed 32-bit length, that many UTF-8 bytes, then alignment to 4
    pub fn read_aligned_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let length = self.read_i32()?;
        let length = usize::try_from(length).map_err(|_| Error::LengthLimit {
            offset,
            length: length.into(),
            limit: self.remaining(),
        })?;
        if length > self.remaining() {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                wanted: length,
            });
        }

        let bytes = self.read_bytes(length)?;
        let string = std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| Error::Utf8 {
                offset: offset + 4,
                source,
            })?;
        self.align(4);

        Ok(string)
    }

    /// Non-negative signed 32-bit count, bounded by `limit`
    pub fn read_length(&mut self, limit: usize) -> Result<usize> {
        let offset = self.pos;
        let length = self.read_i32()?;
        match usize::try_from(length) {
            Ok(length) if length <= limit => Ok(length),
            _ => Err(Error::LengthLimit {
                offset,
                length: length.into(),
                limit,
            }),
        }
    }
}

pub fn align_up(pos: usize, alignment: usize) -> usize {
    match pos % alignment {
        0 => pos,
        rem => pos + alignment - rem,
    }
}
