//! Process configuration, resolved once at startup.
//!
//! The whole configuration arrives as JSON in the `CONFIG` environment
//! variable and is immutable for the life of the process.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use delivery::deliver::DEFAULT_CHUNK_SIZE;
use delivery::{PipelineConfig, SourceAccess};
use storage::ObjectStorageConfig;

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReformatConfig {
    /// Base location for relative product paths
    pub product_base_url: String,

    /// Object storage for delivered outputs
    #[serde(default)]
    pub storage: ObjectStorageConfig,

    /// Secrets Manager ARN holding the fetch credentials; when absent no
    /// credential bootstrap happens
    #[serde(default)]
    pub secret_arn: Option<String>,

    /// How the engine reaches remote products
    #[serde(default = "default_source_access")]
    pub source_access: SourceAccess,

    /// Directory for staged downloads
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Chunk size for draining transcoded buffers into the store
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,

    /// Build the fixed overview ladder on every output
    #[serde(default)]
    pub build_overviews: bool,

    /// Domain suffixes granted credentialed cross-origin access
    #[serde(default = "default_origin_suffixes")]
    pub allowed_origin_suffixes: Vec<String>,
}

fn default_source_access() -> SourceAccess {
    SourceAccess::Download
}

fn default_scratch_dir() -> PathBuf {
    env::temp_dir().join("reformat-staging")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_origin_suffixes() -> Vec<String> {
    vec!["asf.alaska.edu".to_string()]
}

impl ReformatConfig {
    /// Load from the `CONFIG` environment variable.
    pub fn from_env() -> Result<Self> {
        let raw = env::var("CONFIG").context("CONFIG environment variable not set")?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("CONFIG is not valid JSON")
    }

    /// The pipeline's view of this configuration.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            product_base_url: self.product_base_url.clone(),
            source_access: self.source_access,
            scratch_dir: self.scratch_dir.clone(),
            chunk_size: self.chunk_size_bytes,
            build_overviews: self.build_overviews,
            allowed_origin_suffixes: self.allowed_origin_suffixes.clone(),
        }
    }
}
