//! Seekable byte stream over an engine-managed virtual buffer.
//!
//! Transcode output lands in an in-memory buffer the delivery protocol
//! cannot consume directly. [`VirtualFile`] adapts it to a plain
//! length/seek/read/tell stream so a chunked uploader can drain it without
//! ever holding the whole object.

use std::sync::Arc;

use bytes::Bytes;

use crate::{EngineError, EngineResult, RasterEngine, VsiHandle};

/// Where a seek offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

/// Cursor over a virtual buffer.
///
/// The size is fixed at open time. Reads past the end return an empty buffer
/// rather than an error, and seeks clamp into `[0, len]` rather than fail.
/// Each read opens, positions, reads and closes an engine handle, checking
/// the engine's last-error state immediately after every call; the handle is
/// closed on every exit path.
pub struct VirtualFile {
    engine: Arc<dyn RasterEngine>,
    path: String,
    size: u64,
    position: u64,
}

impl VirtualFile {
    pub fn open(engine: Arc<dyn RasterEngine>, path: impl Into<String>) -> EngineResult<Self> {
        let path = path.into();
        let size = engine.stat_size(&path);
        if let Some(fault) = engine.last_error() {
            return Err(EngineError::Stat(fault.message));
        }
        let size = size.ok_or_else(|| EngineError::Stat(format!("no virtual buffer at {path}")))?;
        Ok(Self {
            engine,
            path,
            size,
            position: 0,
        })
    }

    /// Fixed size of the buffer in bytes.
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Current read position.
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Move the read position and return the resulting offset. Out-of-range
    /// targets are clamped into `[0, len]`, never rejected.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> u64 {
        let candidate = match whence {
            Whence::Start => i128::from(offset),
            Whence::Current => i128::from(self.position) + i128::from(offset),
            Whence::End => i128::from(self.size) + i128::from(offset),
        };
        self.position = candidate.clamp(0, i128::from(self.size)) as u64;
        self.position
    }

    /// Read up to `max_bytes` from the current position, or the remainder of
    /// the buffer when `None`. Returns an empty buffer at end of stream.
    pub fn read(&mut self, max_bytes: Option<usize>) -> EngineResult<Bytes> {
        if self.position >= self.size {
            return Ok(Bytes::new());
        }
        let remaining = (self.size - self.position) as usize;
        let wanted = max_bytes.map_or(remaining, |max| max.min(remaining));

        let handle = self.engine.open_read(&self.path);
        self.check("open")?;
        let handle = handle.ok_or_else(|| {
            EngineError::Io(format!("engine refused to open {}", self.path))
        })?;

        let positioned = self.engine.seek(handle, self.position);
        if let Err(err) = self.check("seek") {
            self.engine.close(handle);
            return Err(err);
        }
        if !positioned {
            self.engine.close(handle);
            return Err(EngineError::Io(format!(
                "engine rejected seek to {} in {}",
                self.position, self.path
            )));
        }

        let buf = self.engine.read(handle, wanted);
        if let Err(err) = self.check("read") {
            self.engine.close(handle);
            return Err(err);
        }
        self.position += buf.len() as u64;

        self.engine.close(handle);
        self.check("close")?;

        Ok(buf)
    }

    /// One error-state check, immediately after a single engine call.
    fn check(&self, operation: &str) -> EngineResult<()> {
        match self.engine.last_error() {
            Some(fault) => Err(EngineError::Io(format!(
                "{operation} on {} failed: {}",
                self.path, fault.message
            ))),
            None => Ok(()),
        }
    }
}
