//! Error types for the raster engine seam.

use std::fmt;

use thiserror::Error;

/// Result type for virtual-file operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the byte-stream adapter over engine buffers.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not report the buffer's size or metadata.
    #[error("failed to stat virtual buffer: {0}")]
    Stat(String),

    /// The engine reported a failure during open/seek/read/close.
    #[error("virtual I/O failed: {0}")]
    Io(String),
}

/// Payload of the engine's queryable last-error state.
///
/// The engine reports failures through a side channel rather than return
/// codes, so callers must read this immediately after every raw call. A
/// successful later call resets the slate and would mask an earlier fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFault {
    pub message: String,
}

impl EngineFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
