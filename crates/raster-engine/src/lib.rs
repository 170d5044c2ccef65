//! Raster engine seam for the reformat pipeline.
//!
//! The actual raster decoding and encoding is owned by an external engine
//! (GDAL in production deployments). This crate defines the boundary the
//! pipeline talks to:
//!
//! - [`RasterEngine`]: raw virtual-storage calls with a queryable last-error
//!   side channel, plus the `translate` transcode operation
//! - [`MemoryVfs`]: the in-memory virtual buffer registry backing engine
//!   implementations
//! - [`VirtualFile`]: a seekable byte stream over a virtual buffer, suitable
//!   for chunked upload without materializing the whole object
//! - [`GdalCliEngine`]: production engine backed by the `gdal_translate` and
//!   `gdaladdo` command-line tools

pub mod descriptor;
mod error;
pub mod gdal_cli;
pub mod memory;
pub mod options;
pub mod stream;

pub use descriptor::DatasetDescriptor;
pub use error::{EngineError, EngineFault, EngineResult};
pub use gdal_cli::{GdalCliConfig, GdalCliEngine};
pub use memory::MemoryVfs;
pub use options::{GeoWindow, TranslateOptions, OVERVIEW_LEVELS, OVERVIEW_RESAMPLING};
pub use stream::{VirtualFile, Whence};

use async_trait::async_trait;
use bytes::Bytes;

/// Opaque handle to an open virtual file inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VsiHandle(pub u64);

/// Boundary to the external raster engine.
///
/// The raw virtual-storage calls (`stat_size` through `unlink`) mirror the
/// engine's native interface: they return bare values and record failures in
/// a last-error cell instead of a `Result`. Implementations must reset that
/// cell at the start of every raw call, so [`RasterEngine::last_error`] read
/// immediately after a call reflects that call alone. Callers check after
/// every call; batching checks can let a later success mask an earlier fault.
///
/// `translate` is the one operation with conventional error reporting: it is
/// a single logical request to the engine and returns a tagged result.
#[async_trait]
pub trait RasterEngine: Send + Sync {
    /// Size in bytes of the buffer at `path`, or `None` if it does not exist.
    fn stat_size(&self, path: &str) -> Option<u64>;

    /// Open the buffer at `path` for reading.
    fn open_read(&self, path: &str) -> Option<VsiHandle>;

    /// Position `handle` at an absolute byte offset. Returns `false` on a
    /// stale handle.
    fn seek(&self, handle: VsiHandle, position: u64) -> bool;

    /// Read up to `max_bytes` from the handle's current position. Returns an
    /// empty buffer at end of file or on a stale handle.
    fn read(&self, handle: VsiHandle, max_bytes: usize) -> Bytes;

    /// Close an open handle.
    fn close(&self, handle: VsiHandle);

    /// Whether a buffer exists at `path`. Never touches the error state.
    fn buffer_exists(&self, path: &str) -> bool;

    /// Remove the buffer at `path` from the engine's namespace.
    fn unlink(&self, path: &str) -> bool;

    /// The fault recorded by the most recent raw call, if any.
    fn last_error(&self) -> Option<EngineFault>;

    /// Transcode `input` into a new virtual buffer at `target`.
    ///
    /// On failure a partially written buffer may exist at `target`; cleaning
    /// it up is the caller's responsibility.
    async fn translate(
        &self,
        input: &DatasetDescriptor,
        target: &str,
        options: &TranslateOptions,
    ) -> Result<(), EngineFault>;
}
