//! Shared winnow building blocks for the fixed-layout headers

use std::fmt::Display;

use crate::error::Error;

use winnow::{
    Parser,
    combinator::{terminated, trace},
    error::{ContextError, ParserError},
    stream::Stream,
    token::{any, take, take_till},
};

/// Parser over `I` producing `T` with the default error type
pub trait WinnowParser<I, T>: Parser<I, T, ContextError> {}

impl<P, I, T> WinnowParser<I, T> for P where P: Parser<I, T, ContextError> {}

pub trait TraceHelper<I, O, E> {
    fn trace(self, name: impl Display) -> impl Parser<I, O, E>;
}

impl<P, I, O, E> TraceHelper<I, O, E> for P
where
    I: Stream,
    E: ParserError<I>,
    P: Parser<I, O, E>,
{
    fn trace(self, name: impl Display) -> impl Parser<I, O, E> {
        trace(name, self)
    }
}

/// Map a failed parse onto the crate error. These parsers only fail by running out of input or
/// by rejecting a value they did read, and only the latter carries a cause.
pub fn parse_error(e: &ContextError, offset: usize, input_len: usize, what: &str) -> Error {
    match e.cause() {
        Some(cause) => Error::invalid(offset, format!("Failed to parse {what}: {cause}")),
        None => Error::UnexpectedEof {
            offset: offset + input_len,
            wanted: 1,
        },
    }
}

/// Null-terminated UTF-8 string. The terminator must be present.
pub fn cstring<'a>() -> impl WinnowParser<&'a [u8], String> {
    terminated(take_till(0.., 0u8), any.verify(|b: &u8| *b == 0))
        .try_map(|bytes: &[u8]| String::from_utf8(bytes.to_vec()))
        .trace("cstring")
}

/// Fixed 16-byte hash or GUID
pub fn hash16<'a>() -> impl WinnowParser<&'a [u8], [u8; 16]> {
    take(16_usize)
        .try_map(<[u8; 16]>::try_from)
        .trace("hash16")
}
