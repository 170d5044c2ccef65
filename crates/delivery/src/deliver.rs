//! Chunked upload of a virtual file into object storage.

use raster_engine::VirtualFile;
use storage::ObjectStorage;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::error::{DeliveryError, PipelineError};

/// Default drain chunk size. Large enough to satisfy S3 minimum part sizes,
/// small enough that memory stays bounded for arbitrarily large outputs.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Drain `source` into the store under `key`, chunk by chunk, until end of
/// stream. Returns the number of bytes delivered.
#[instrument(skip(source, storage), fields(key, len = source.len()))]
pub async fn upload(
    source: &mut VirtualFile,
    storage: &ObjectStorage,
    key: &str,
    chunk_size: usize,
) -> Result<u64, PipelineError> {
    let chunk_size = chunk_size.max(1);
    let mut writer = storage
        .put_stream(key)
        .await
        .map_err(|err| DeliveryError(err.to_string()))?;

    let mut delivered = 0u64;
    loop {
        let chunk = source.read(Some(chunk_size))?;
        if chunk.is_empty() {
            break;
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|err| DeliveryError(err.to_string()))?;
        delivered += chunk.len() as u64;
    }

    writer
        .shutdown()
        .await
        .map_err(|err| DeliveryError(err.to_string()))?;

    debug!(bytes = delivered, "upload complete");
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use object_store::memory::InMemory;
    use test_utils::{synthetic_tiff, FakeEngine};

    use super::*;

    fn engine_with(path: &str, data: Bytes) -> Arc<FakeEngine> {
        let engine = FakeEngine::new();
        engine.vfs().create(path, data);
        Arc::new(engine)
    }

    fn memory_storage() -> ObjectStorage {
        ObjectStorage::with_store(Arc::new(InMemory::new()), "bucket", "https://s3.amazonaws.com")
    }

    #[tokio::test]
    async fn upload_roundtrips_in_small_chunks() {
        let data = synthetic_tiff(3, 100_000);
        let engine = engine_with("/vsimem/out.tif", data.clone());
        let storage = memory_storage();

        let mut source = VirtualFile::open(engine, "/vsimem/out.tif").unwrap();
        let delivered = upload(&mut source, &storage, "k/out.tif", 8 * 1024)
            .await
            .unwrap();

        assert_eq!(delivered, 100_000);
        assert_eq!(storage.get("k/out.tif").await.unwrap(), data);
    }

    #[tokio::test]
    async fn upload_handles_single_chunk_objects() {
        let data = synthetic_tiff(4, 100);
        let engine = engine_with("/vsimem/out.tif", data.clone());
        let storage = memory_storage();

        let mut source = VirtualFile::open(engine, "/vsimem/out.tif").unwrap();
        let delivered = upload(&mut source, &storage, "k/out.tif", DEFAULT_CHUNK_SIZE)
            .await
            .unwrap();

        assert_eq!(delivered, 100);
        assert_eq!(storage.get("k/out.tif").await.unwrap(), data);
    }

    #[tokio::test]
    async fn upload_of_empty_buffer_completes_with_zero_bytes() {
        let engine = engine_with("/vsimem/out.tif", Bytes::new());
        let storage = memory_storage();

        let mut source = VirtualFile::open(engine, "/vsimem/out.tif").unwrap();
        let delivered = upload(&mut source, &storage, "k/out.tif", DEFAULT_CHUNK_SIZE)
            .await
            .unwrap();

        assert_eq!(delivered, 0);
        assert!(storage.get("k/out.tif").await.unwrap().is_empty());
    }
}
