//! Byte-level reading and writing with a switchable byte order

pub mod parsers;
mod reader;
mod writer;

pub use reader::{Reader, align_up};
pub use winnow::binary::Endianness;
pub use writer::Writer;
