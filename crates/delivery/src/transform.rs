//! The transcode step: locate the source, invoke the engine.

use std::path::Path;

use raster_engine::{descriptor, DatasetDescriptor, RasterEngine, TranslateOptions};
use tracing::{debug, instrument};

use crate::error::TranscodeError;
use crate::fetch::join_location;

/// How the engine reaches the source artifact.
#[derive(Debug, Clone, Copy)]
pub enum SourceLocation<'a> {
    /// Staged on local scratch storage by the fetcher.
    Local(&'a Path),
    /// Addressed remotely through the engine's streaming reader.
    Streamed { base_url: &'a str, product: &'a str },
}

/// Build the engine locator for `product`/`layer` at `location`.
///
/// NetCDF products address the layer as a named subdataset; zip archives go
/// through the engine's zip reader; anything else is opened as a plain
/// raster.
pub fn input_descriptor(
    location: SourceLocation<'_>,
    product: &str,
    layer: &str,
) -> DatasetDescriptor {
    let container = match location {
        SourceLocation::Local(path) => path.display().to_string(),
        SourceLocation::Streamed { base_url, product } => {
            descriptor::streamed(&join_location(base_url, product))
        }
    };

    if product.ends_with(".nc") || product.ends_with(".nc4") {
        DatasetDescriptor::netcdf(container, layer)
    } else if product.ends_with(".zip") {
        DatasetDescriptor::raster(descriptor::zipped(&container))
    } else {
        DatasetDescriptor::raster(container)
    }
}

/// Transcode `input` into the virtual buffer at `target`.
///
/// A failure may leave a partially written buffer at `target`; the caller's
/// scope cleans that up, not this step.
#[instrument(skip(engine, options), fields(input = %input, target))]
pub async fn transcode(
    engine: &dyn RasterEngine,
    input: &DatasetDescriptor,
    target: &str,
    options: &TranslateOptions,
) -> Result<(), TranscodeError> {
    debug!(
        windowed = options.window.is_some(),
        overviews = options.build_overviews,
        "starting transcode"
    );
    engine
        .translate(input, target, options)
        .await
        .map_err(|fault| TranscodeError {
            message: fault.message,
        })
}
