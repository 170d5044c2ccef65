//! Transcode options passed to the engine.

/// Decimation ladder for generated overviews.
pub const OVERVIEW_LEVELS: [u32; 5] = [2, 4, 8, 16, 32];

/// Resampling method for generated overviews.
pub const OVERVIEW_RESAMPLING: &str = "nearest";

/// Rectangular subset in georeferenced coordinates (upper-left x/y,
/// lower-right x/y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoWindow {
    pub ulx: f64,
    pub uly: f64,
    pub lrx: f64,
    pub lry: f64,
}

/// Options for [`crate::RasterEngine::translate`].
///
/// The output is always a tiled GeoTIFF with deflate compression and source
/// overviews carried over; those are not request-variable. The window and
/// the overview ladder are.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Subset the source to this window before transcoding.
    pub window: Option<GeoWindow>,
    /// Build the fixed overview ladder on the output.
    pub build_overviews: bool,
}

impl TranslateOptions {
    /// Creation options for the output format.
    pub fn creation_options(&self) -> Vec<String> {
        vec![
            "COMPRESS=DEFLATE".to_string(),
            "TILED=YES".to_string(),
            "COPY_SRC_OVERVIEWS=YES".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_options_are_fixed() {
        let options = TranslateOptions::default();
        assert_eq!(
            options.creation_options(),
            vec!["COMPRESS=DEFLATE", "TILED=YES", "COPY_SRC_OVERVIEWS=YES"]
        );
    }
}
