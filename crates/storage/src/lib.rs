//! Storage abstractions for the raster delivery pipeline.
//!
//! One concern: durable object storage (S3 or compatible) for transcoded
//! output, with a chunked writer so large objects are never held in memory
//! whole.

pub mod object_store;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StorageError, StorageResult};
