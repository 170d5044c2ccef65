//! Transform-and-deliver pipeline for remote rasters.
//!
//! A request names a remote product and a layer inside it. The pipeline
//! optionally stages the product locally, has the raster engine transcode it
//! into a compressed, tiled output inside a virtual buffer, streams that
//! buffer into object storage in chunks, and answers with a redirect to the
//! delivered object. Every transient resource is released on every exit
//! path.

pub mod deliver;
pub mod error;
pub mod fetch;
pub mod output_key;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod scope;
pub mod transform;

pub use error::{DeliveryError, FetchError, PipelineError, Result, TranscodeError};
pub use fetch::RemoteFetcher;
pub use output_key::OutputKey;
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutcome, SourceAccess};
pub use request::{RawParameters, ReformatRequest};
pub use response::{CorsGrant, CorsPolicy, ResponseDescriptor};
pub use scope::{acquire_scoped, run_scoped, CleanupFailure, ScratchFile};
