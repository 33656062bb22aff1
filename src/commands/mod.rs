//! Batch operations over whole bundles and assets files, writing results to disk

pub mod dump_objects;
pub mod extract;
pub mod list;
