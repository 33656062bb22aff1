//! Reading Unity asset bundles and the serialized assets files inside them: container
//! decompression, object indexes, type trees, schema-driven object decoding, and rewriting an
//! assets file with replaced object payloads.

pub mod assets;
pub mod bundle;
pub mod commands;
pub mod compression;
pub mod error;
pub mod io;
pub mod schemas;
pub mod serialization;
pub mod version;

pub use assets::AssetsFile;
pub use bundle::Bundle;
pub use error::{Error, ErrorKind, Result};
pub use version::UnityVersion;
