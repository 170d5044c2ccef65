//! Scripted raster engine for pipeline tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use raster_engine::{
    DatasetDescriptor, EngineFault, MemoryVfs, RasterEngine, TranslateOptions, VsiHandle,
};

use crate::fixtures;

/// What a scripted `translate` call should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateBehavior {
    /// Create the target buffer with deterministic synthetic bytes.
    Succeed,
    /// Fail without touching the target.
    FailClean,
    /// Write a partial buffer to the target, then fail.
    FailAfterPartialWrite,
}

/// One recorded `translate` invocation.
#[derive(Debug, Clone)]
pub struct TranslateCall {
    pub input: String,
    pub target: String,
    pub windowed: bool,
    pub overviews: bool,
}

/// In-memory engine whose `translate` outcome is scripted per test.
///
/// Virtual-storage calls are served by a real [`MemoryVfs`], so stream and
/// cleanup behavior is exercised for real; only the transcode itself is
/// faked. Unlink calls are recorded for cleanup assertions.
pub struct FakeEngine {
    vfs: MemoryVfs,
    behavior: Mutex<TranslateBehavior>,
    output_len: Mutex<usize>,
    translations: Mutex<Vec<TranslateCall>>,
    unlinked: Mutex<Vec<String>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            vfs: MemoryVfs::new(),
            behavior: Mutex::new(TranslateBehavior::Succeed),
            output_len: Mutex::new(64 * 1024),
            translations: Mutex::new(Vec::new()),
            unlinked: Mutex::new(Vec::new()),
        }
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: TranslateBehavior) -> Self {
        let engine = Self::default();
        *engine.behavior.lock().unwrap() = behavior;
        engine
    }

    /// Size of the synthetic output buffer produced by a successful
    /// `translate`.
    pub fn set_output_len(&self, len: usize) {
        *self.output_len.lock().unwrap() = len;
    }

    pub fn vfs(&self) -> &MemoryVfs {
        &self.vfs
    }

    pub fn translate_calls(&self) -> Vec<TranslateCall> {
        self.translations.lock().unwrap().clone()
    }

    pub fn unlinked_paths(&self) -> Vec<String> {
        self.unlinked.lock().unwrap().clone()
    }

    /// The bytes a successful `translate` of `input` would produce.
    pub fn expected_output(&self, input: &DatasetDescriptor) -> Bytes {
        fixtures::synthetic_tiff(
            fixtures::seed_from(&input.to_engine_string()),
            *self.output_len.lock().unwrap(),
        )
    }
}

#[async_trait]
impl RasterEngine for FakeEngine {
    fn stat_size(&self, path: &str) -> Option<u64> {
        self.vfs.stat_size(path)
    }

    fn open_read(&self, path: &str) -> Option<VsiHandle> {
        self.vfs.open_read(path)
    }

    fn seek(&self, handle: VsiHandle, position: u64) -> bool {
        self.vfs.seek(handle, position)
    }

    fn read(&self, handle: VsiHandle, max_bytes: usize) -> Bytes {
        self.vfs.read(handle, max_bytes)
    }

    fn close(&self, handle: VsiHandle) {
        self.vfs.close(handle)
    }

    fn buffer_exists(&self, path: &str) -> bool {
        self.vfs.exists(path)
    }

    fn unlink(&self, path: &str) -> bool {
        self.unlinked.lock().unwrap().push(path.to_string());
        self.vfs.unlink(path)
    }

    fn last_error(&self) -> Option<EngineFault> {
        self.vfs.last_error()
    }

    async fn translate(
        &self,
        input: &DatasetDescriptor,
        target: &str,
        options: &TranslateOptions,
    ) -> Result<(), EngineFault> {
        self.translations.lock().unwrap().push(TranslateCall {
            input: input.to_engine_string(),
            target: target.to_string(),
            windowed: options.window.is_some(),
            overviews: options.build_overviews,
        });

        match *self.behavior.lock().unwrap() {
            TranslateBehavior::Succeed => {
                self.vfs.create(target, self.expected_output(input));
                Ok(())
            }
            TranslateBehavior::FailClean => {
                Err(EngineFault::new("scripted transcode failure"))
            }
            TranslateBehavior::FailAfterPartialWrite => {
                let full = self.expected_output(input);
                let partial = full.slice(0..full.len() / 2);
                self.vfs.create(target, partial);
                Err(EngineFault::new("scripted transcode failure after partial write"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_success_creates_buffer() {
        let engine = FakeEngine::new();
        engine.set_output_len(256);
        let input = DatasetDescriptor::netcdf("/data/file.nc", "band1");
        engine
            .translate(&input, "/vsimem/out.tif", &TranslateOptions::default())
            .await
            .unwrap();
        assert!(engine.buffer_exists("/vsimem/out.tif"));
        assert_eq!(engine.stat_size("/vsimem/out.tif"), Some(256));
    }

    #[tokio::test]
    async fn scripted_clean_failure_leaves_no_buffer() {
        let engine = FakeEngine::with_behavior(TranslateBehavior::FailClean);
        let input = DatasetDescriptor::netcdf("/data/file.nc", "band1");
        let err = engine
            .translate(&input, "/vsimem/out.tif", &TranslateOptions::default())
            .await
            .unwrap_err();
        assert!(err.message.contains("scripted"));
        assert!(!engine.buffer_exists("/vsimem/out.tif"));
    }

    #[tokio::test]
    async fn scripted_partial_failure_leaves_partial_buffer() {
        let engine = FakeEngine::with_behavior(TranslateBehavior::FailAfterPartialWrite);
        engine.set_output_len(100);
        let input = DatasetDescriptor::netcdf("/data/file.nc", "band1");
        engine
            .translate(&input, "/vsimem/out.tif", &TranslateOptions::default())
            .await
            .unwrap_err();
        assert_eq!(engine.stat_size("/vsimem/out.tif"), Some(50));
    }
}
