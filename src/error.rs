//! Error types shared by the container, assets file and serialization readers.

use thiserror::Error;

use crate::compression::CompressionKind;

/// Broad classification of an [`Error`], used by callers that only care about what went wrong
/// rather than where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad signature, unsupported version or compression, malformed structure
    Format,
    /// Length over the sanity limit or a read past end-of-stream
    Bounds,
    /// Missing or mismatched schema catalog entry
    Schema,
    /// Object was not fully consumed by a strict decode
    Integrity,
    /// Named entry or object is absent
    NotFound,
    /// Host file system failure
    Io,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported AssetBundle signature {0:?}")]
    InvalidSignature(String),

    #[error("Unsupported AssetBundle format version {0}, only version 6 and 7 are supported")]
    UnsupportedBundleVersion(u32),

    #[error("Unsupported compression type {0}")]
    UnsupportedCompression(u32),

    #[error("Failed to decompress {kind:?} data: {reason}")]
    Decompress {
        kind: CompressionKind,
        reason: String,
    },

    #[error("Invalid engine version string {0:?}")]
    InvalidVersion(String),

    #[error("Invalid file structure at offset {offset:#x}: {reason}")]
    InvalidStructure { offset: usize, reason: String },

    #[error("Invalid UTF-8 string at offset {offset:#x}")]
    Utf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Unexpected end of stream at offset {offset:#x} (wanted {wanted} bytes)")]
    UnexpectedEof { offset: usize, wanted: usize },

    #[error("Length {length} at offset {offset:#x} exceeds limit {limit}")]
    LengthLimit {
        offset: usize,
        length: i64,
        limit: usize,
    },

    #[error("Type {0:?} is not registered as decodable")]
    UnknownSchema(String),

    #[error("No schema registered for class ID {0}")]
    UnknownClass(i32),

    #[error("Schema mismatch in {schema}.{field}: {reason}")]
    SchemaMismatch {
        schema: String,
        field: String,
        reason: String,
    },

    #[error("Invalid schema document: {0}")]
    SchemaDocument(#[from] serde_json::Error),

    #[error("Failed to fully deserialize {schema}: consumed {consumed} bytes of {expected}")]
    IncompleteDecode {
        schema: String,
        consumed: usize,
        expected: usize,
    },

    #[error("Entry not found in bundle: {0}")]
    EntryNotFound(String),

    #[error("Object not found: pathID {0}")]
    ObjectNotFound(i64),

    #[error("Object pathID {path_id}: {source}")]
    Object {
        path_id: i64,
        #[source]
        source: Box<Error>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            InvalidSignature(_)
            | UnsupportedBundleVersion(_)
            | UnsupportedCompression(_)
            | Decompress { .. }
            | InvalidVersion(_)
            | InvalidStructure { .. }
            | Utf8 { .. } => ErrorKind::Format,
            UnexpectedEof { .. } | LengthLimit { .. } => ErrorKind::Bounds,
            UnknownSchema(_) | UnknownClass(_) | SchemaMismatch { .. } | SchemaDocument(_) => {
                ErrorKind::Schema
            }
            IncompleteDecode { .. } => ErrorKind::Integrity,
            EntryNotFound(_) | ObjectNotFound(_) => ErrorKind::NotFound,
            Object { source, .. } => source.kind(),
            Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid(offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidStructure {
            offset,
            reason: reason.into(),
        }
    }

    /// Attribute this error to the object with the given pathID
    pub(crate) fn in_object(self, path_id: i64) -> Self {
        match self {
            e @ Error::Object { .. } => e,
            e => Error::Object {
                path_id,
                source: Box::new(e),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_wrapped_source() {
        let e = Error::LengthLimit {
            offset: 4,
            length: 0x40001,
            limit: 0x40000,
        }
        .in_object(42);

        assert_eq!(e.kind(), ErrorKind::Bounds);
        assert!(e.to_string().contains("42"));

        // Wrapping twice keeps the innermost attribution
        let e = e.in_object(7);
        assert!(matches!(e, Error::Object { path_id: 42, .. }));
    }

    #[test]
    fn test_error_display() {
        let e = Error::UnexpectedEof {
            offset: 0x10,
            wanted: 4,
        };
        assert!(e.to_string().contains("0x10"));
        assert_eq!(e.kind(), ErrorKind::Bounds);

        assert_eq!(
            Error::EntryNotFound("CAB-0000".into()).kind(),
            ErrorKind::NotFound
        );
    }
}
