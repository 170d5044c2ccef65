//! In-memory virtual buffer registry.
//!
//! Engine implementations park transcode output here under path-like tokens
//! (`/vsimem/...`). Buffers are immutable once created and exclusively owned
//! by the request that created them, so a plain mutex around the maps is
//! enough.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;

use crate::{EngineFault, VsiHandle};

struct OpenFile {
    data: Bytes,
    position: u64,
}

/// Path-keyed store of immutable byte buffers with an open-handle table and
/// the engine's last-error cell.
///
/// Every raw call resets the error cell before doing its work, so a caller
/// that checks [`MemoryVfs::last_error`] immediately after a call sees the
/// outcome of that call alone.
#[derive(Default)]
pub struct MemoryVfs {
    buffers: Mutex<HashMap<String, Bytes>>,
    open: Mutex<HashMap<u64, OpenFile>>,
    next_handle: AtomicU64,
    last_error: Mutex<Option<EngineFault>>,
}

impl MemoryVfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the buffer at `path`.
    pub fn create(&self, path: &str, data: Bytes) {
        self.clear_error();
        self.buffers
            .lock()
            .expect("vfs buffer table poisoned")
            .insert(path.to_string(), data);
    }

    pub fn stat_size(&self, path: &str) -> Option<u64> {
        self.clear_error();
        let size = self
            .buffers
            .lock()
            .expect("vfs buffer table poisoned")
            .get(path)
            .map(|data| data.len() as u64);
        if size.is_none() {
            self.fail(format!("no virtual buffer at {path}"));
        }
        size
    }

    pub fn open_read(&self, path: &str) -> Option<VsiHandle> {
        self.clear_error();
        let data = self
            .buffers
            .lock()
            .expect("vfs buffer table poisoned")
            .get(path)
            .cloned();
        match data {
            Some(data) => {
                let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
                self.open
                    .lock()
                    .expect("vfs handle table poisoned")
                    .insert(id, OpenFile { data, position: 0 });
                Some(VsiHandle(id))
            }
            None => {
                self.fail(format!("cannot open {path}: no such virtual buffer"));
                None
            }
        }
    }

    pub fn seek(&self, handle: VsiHandle, position: u64) -> bool {
        self.clear_error();
        match self
            .open
            .lock()
            .expect("vfs handle table poisoned")
            .get_mut(&handle.0)
        {
            Some(file) => {
                file.position = position;
                true
            }
            None => {
                self.fail(format!("seek on stale handle {}", handle.0));
                false
            }
        }
    }

    pub fn read(&self, handle: VsiHandle, max_bytes: usize) -> Bytes {
        self.clear_error();
        match self
            .open
            .lock()
            .expect("vfs handle table poisoned")
            .get_mut(&handle.0)
        {
            Some(file) => {
                let start = (file.position as usize).min(file.data.len());
                let end = start.saturating_add(max_bytes).min(file.data.len());
                file.position = end as u64;
                file.data.slice(start..end)
            }
            None => {
                self.fail(format!("read on stale handle {}", handle.0));
                Bytes::new()
            }
        }
    }

    pub fn close(&self, handle: VsiHandle) {
        self.clear_error();
        if self
            .open
            .lock()
            .expect("vfs handle table poisoned")
            .remove(&handle.0)
            .is_none()
        {
            self.fail(format!("close on stale handle {}", handle.0));
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.buffers
            .lock()
            .expect("vfs buffer table poisoned")
            .contains_key(path)
    }

    pub fn unlink(&self, path: &str) -> bool {
        self.clear_error();
        if self
            .buffers
            .lock()
            .expect("vfs buffer table poisoned")
            .remove(path)
            .is_none()
        {
            self.fail(format!("cannot unlink {path}: no such virtual buffer"));
            false
        } else {
            true
        }
    }

    pub fn last_error(&self) -> Option<EngineFault> {
        self.last_error
            .lock()
            .expect("vfs error cell poisoned")
            .clone()
    }

    /// Number of handles currently open. Useful for leak assertions.
    pub fn open_handle_count(&self) -> usize {
        self.open.lock().expect("vfs handle table poisoned").len()
    }

    fn clear_error(&self) {
        *self.last_error.lock().expect("vfs error cell poisoned") = None;
    }

    fn fail(&self, message: String) {
        *self.last_error.lock().expect("vfs error cell poisoned") = Some(EngineFault::new(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_stat_read_roundtrip() {
        let vfs = MemoryVfs::new();
        vfs.create("/vsimem/a.tif", Bytes::from_static(b"hello world"));

        assert_eq!(vfs.stat_size("/vsimem/a.tif"), Some(11));
        assert!(vfs.last_error().is_none());

        let handle = vfs.open_read("/vsimem/a.tif").unwrap();
        assert!(vfs.seek(handle, 6));
        assert_eq!(vfs.read(handle, 64), Bytes::from_static(b"world"));
        vfs.close(handle);
        assert!(vfs.last_error().is_none());
        assert_eq!(vfs.open_handle_count(), 0);
    }

    #[test]
    fn missing_buffer_sets_last_error() {
        let vfs = MemoryVfs::new();
        assert_eq!(vfs.stat_size("/vsimem/missing.tif"), None);
        let fault = vfs.last_error().unwrap();
        assert!(fault.message.contains("missing.tif"));

        // A later successful call resets the slate.
        vfs.create("/vsimem/a.tif", Bytes::from_static(b"x"));
        assert_eq!(vfs.stat_size("/vsimem/a.tif"), Some(1));
        assert!(vfs.last_error().is_none());
    }

    #[test]
    fn read_past_end_is_empty_not_error() {
        let vfs = MemoryVfs::new();
        vfs.create("/vsimem/a.tif", Bytes::from_static(b"abc"));
        let handle = vfs.open_read("/vsimem/a.tif").unwrap();
        assert!(vfs.seek(handle, 3));
        assert!(vfs.read(handle, 16).is_empty());
        assert!(vfs.last_error().is_none());
        vfs.close(handle);
    }

    #[test]
    fn stale_handle_faults() {
        let vfs = MemoryVfs::new();
        vfs.create("/vsimem/a.tif", Bytes::from_static(b"abc"));
        let handle = vfs.open_read("/vsimem/a.tif").unwrap();
        vfs.close(handle);

        assert!(!vfs.seek(handle, 0));
        assert!(vfs.last_error().is_some());
        assert!(vfs.read(handle, 4).is_empty());
        assert!(vfs.last_error().is_some());
    }

    #[test]
    fn unlink_removes_and_missing_unlink_faults() {
        let vfs = MemoryVfs::new();
        vfs.create("/vsimem/a.tif", Bytes::from_static(b"abc"));
        assert!(vfs.unlink("/vsimem/a.tif"));
        assert!(!vfs.exists("/vsimem/a.tif"));
        assert!(!vfs.unlink("/vsimem/a.tif"));
        assert!(vfs.last_error().is_some());
    }
}
