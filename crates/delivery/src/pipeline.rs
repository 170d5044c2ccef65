//! Request orchestration: fetch, transform, deliver, clean up, respond.
//!
//! One invocation is one strictly linear unit of work. Every transient
//! resource is scoped: the scratch file is gone no later than the end of the
//! transform step, the virtual buffer no later than the end of the request,
//! on success and on failure alike.

use std::path::PathBuf;
use std::sync::Arc;

use raster_engine::{RasterEngine, TranslateOptions, VirtualFile};
use serde::{Deserialize, Serialize};
use storage::ObjectStorage;
use tracing::{info, instrument};

use crate::deliver::{self, DEFAULT_CHUNK_SIZE};
use crate::error::{PipelineError, Result};
use crate::fetch::RemoteFetcher;
use crate::output_key::OutputKey;
use crate::request::ReformatRequest;
use crate::response::{CorsPolicy, ResponseDescriptor};
use crate::scope::{acquire_scoped, run_scoped, CleanupFailure, ScratchFile};
use crate::transform::{self, SourceLocation};

/// How the pipeline reaches remote source artifacts. A deployment choice,
/// not a per-request one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceAccess {
    /// Stage the artifact to scratch storage before handing it to the
    /// engine.
    Download,
    /// Let the engine address the artifact directly through its streaming
    /// reader.
    Direct,
}

/// Pipeline configuration, fixed at process start.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base location the relative product paths are resolved against.
    pub product_base_url: String,
    pub source_access: SourceAccess,
    /// Directory for staged downloads.
    pub scratch_dir: PathBuf,
    /// Chunk size for draining the transcoded buffer into the store.
    pub chunk_size: usize,
    /// Build the fixed overview ladder on every output.
    pub build_overviews: bool,
    /// Domain suffixes granted credentialed cross-origin access.
    pub allowed_origin_suffixes: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            product_base_url: String::new(),
            source_access: SourceAccess::Direct,
            scratch_dir: std::env::temp_dir(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            build_overviews: false,
            allowed_origin_suffixes: vec!["asf.alaska.edu".to_string()],
        }
    }
}

/// The outcome of a successful run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub response: ResponseDescriptor,
    pub bytes_delivered: u64,
}

/// Sequences one request: optional fetch, transform, deliver, cleanup,
/// respond.
pub struct Pipeline {
    engine: Arc<dyn RasterEngine>,
    storage: ObjectStorage,
    fetcher: RemoteFetcher,
    cors: CorsPolicy,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        engine: Arc<dyn RasterEngine>,
        storage: ObjectStorage,
        config: PipelineConfig,
    ) -> Result<Self> {
        let fetcher = RemoteFetcher::new(config.scratch_dir.clone())?;
        let cors = CorsPolicy::new(config.allowed_origin_suffixes.clone());
        Ok(Self {
            engine,
            storage,
            fetcher,
            cors,
            config,
        })
    }

    /// Run the full pipeline for one validated request.
    #[instrument(skip(self, request), fields(product = %request.product, layer = %request.layer))]
    pub async fn handle(&self, request: ReformatRequest) -> Result<PipelineOutcome> {
        let key = OutputKey::generate(&request.product, &request.layer);
        let key_string = key.to_string();
        let target = format!("/vsimem/{}.tif", key.prefix());
        let options = TranslateOptions {
            window: request.window,
            build_overviews: self.config.build_overviews,
        };

        // The buffer scope opens before the transform that may create the
        // buffer, so a partially written buffer is discarded even when the
        // transform itself fails.
        let bytes_delivered = run_scoped(
            target.clone(),
            |buffer| self.transform_and_deliver(&request, &options, buffer, &key_string),
            |buffer| self.discard_buffer(buffer),
        )
        .await?;

        let location = self.storage.object_url(&key_string);
        let cors = self.cors.evaluate(request.origin.as_deref());
        info!(key = %key_string, bytes = bytes_delivered, "delivered transcoded raster");

        Ok(PipelineOutcome {
            response: ResponseDescriptor::redirect(location, cors),
            bytes_delivered,
        })
    }

    async fn transform_and_deliver(
        &self,
        request: &ReformatRequest,
        options: &TranslateOptions,
        target: String,
        key: &str,
    ) -> Result<u64> {
        match self.config.source_access {
            SourceAccess::Direct => {
                let input = transform::input_descriptor(
                    SourceLocation::Streamed {
                        base_url: &self.config.product_base_url,
                        product: &request.product,
                    },
                    &request.product,
                    &request.layer,
                );
                transform::transcode(self.engine.as_ref(), &input, &target, options).await?;
            }
            SourceAccess::Download => {
                let staged = self
                    .fetcher
                    .fetch(&self.config.product_base_url, &request.product);
                acquire_scoped(
                    async { staged.await.map_err(PipelineError::from) },
                    |file: ScratchFile| {
                        let target = target.clone();
                        async move {
                            let input = transform::input_descriptor(
                                SourceLocation::Local(file.path()),
                                &request.product,
                                &request.layer,
                            );
                            transform::transcode(self.engine.as_ref(), &input, &target, options)
                                .await
                                .map_err(PipelineError::from)
                        }
                    },
                    |file| file.remove(),
                )
                .await?;
            }
        }

        let mut source = VirtualFile::open(self.engine.clone(), target)?;
        deliver::upload(&mut source, &self.storage, key, self.config.chunk_size).await
    }

    /// Unlink the transcode buffer if the engine ever materialized it. A
    /// buffer that was never created is not referenced at all.
    async fn discard_buffer(&self, target: String) -> std::result::Result<(), CleanupFailure> {
        if !self.engine.buffer_exists(&target) {
            return Ok(());
        }
        if self.engine.unlink(&target) {
            Ok(())
        } else {
            let message = self
                .engine
                .last_error()
                .map(|fault| fault.message)
                .unwrap_or_else(|| "unlink failed".to_string());
            Err(CleanupFailure {
                resource: target,
                message,
            })
        }
    }
}
