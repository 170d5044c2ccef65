//! Error types for the delivery pipeline.

use raster_engine::EngineError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Remote retrieval failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("remote returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("transport failure fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("failed to stage fetched data: {0}")]
    Io(#[from] std::io::Error),
}

/// The engine failed to produce the transcoded output.
#[derive(Error, Debug)]
#[error("engine failed to produce output: {message}")]
pub struct TranscodeError {
    pub message: String,
}

/// The upload transport failed. Partial uploads are not rolled back here;
/// multi-part completion atomicity belongs to the destination store.
#[derive(Error, Debug)]
#[error("upload transport failure: {0}")]
pub struct DeliveryError(pub String);

/// Any failure that aborts the pipeline, tagged by originating stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
