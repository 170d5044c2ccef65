//! Request parameters for one reformat invocation.

use raster_engine::GeoWindow;

use crate::error::PipelineError;

/// Raw query parameters as they arrive from the transport layer.
#[derive(Debug, Clone, Default)]
pub struct RawParameters {
    pub product: Option<String>,
    pub layer: Option<String>,
    pub ulx: Option<f64>,
    pub uly: Option<f64>,
    pub lrx: Option<f64>,
    pub lry: Option<f64>,
}

/// Validated parameters for one pipeline run. Validation is presence-only;
/// semantic correctness (does the product exist, is the window sane) is the
/// engine's problem.
#[derive(Debug, Clone)]
pub struct ReformatRequest {
    pub product: String,
    pub layer: String,
    pub window: Option<GeoWindow>,
    /// Declared `Origin` of the caller, if any. Only consulted when building
    /// the response's cross-origin headers.
    pub origin: Option<String>,
}

impl RawParameters {
    pub fn validate(self, origin: Option<String>) -> Result<ReformatRequest, PipelineError> {
        let product = self
            .product
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PipelineError::InvalidRequest("missing parameter: product".into()))?;
        let layer = self
            .layer
            .filter(|l| !l.is_empty())
            .ok_or_else(|| PipelineError::InvalidRequest("missing parameter: layer".into()))?;

        let bounds = [self.ulx, self.uly, self.lrx, self.lry];
        let window = match bounds {
            [None, None, None, None] => None,
            [Some(ulx), Some(uly), Some(lrx), Some(lry)] => {
                Some(GeoWindow { ulx, uly, lrx, lry })
            }
            _ => {
                return Err(PipelineError::InvalidRequest(
                    "window requires all of ulx, uly, lrx, lry".into(),
                ))
            }
        };

        Ok(ReformatRequest {
            product,
            layer,
            window,
            origin,
        })
    }
}
