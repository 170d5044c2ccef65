//! Composite dataset locators understood by the raster engine.

use std::fmt;

/// Locator for the input dataset of a transcode.
///
/// A plain raster is addressed by its path (which may carry virtual-path
/// prefixes, see [`streamed`] and [`zipped`]). A subdataset addresses one
/// named layer inside a container format, e.g. one variable of a NetCDF
/// archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetDescriptor {
    Raster {
        path: String,
    },
    Subdataset {
        driver: String,
        container: String,
        layer: String,
    },
}

impl DatasetDescriptor {
    pub fn raster(path: impl Into<String>) -> Self {
        Self::Raster { path: path.into() }
    }

    /// One variable inside a NetCDF container.
    pub fn netcdf(container: impl Into<String>, layer: impl Into<String>) -> Self {
        Self::Subdataset {
            driver: "NETCDF".to_string(),
            container: container.into(),
            layer: layer.into(),
        }
    }

    /// The engine's string form of this locator.
    pub fn to_engine_string(&self) -> String {
        match self {
            Self::Raster { path } => path.clone(),
            Self::Subdataset {
                driver,
                container,
                layer,
            } => format!("{driver}:\"{container}\"://{layer}"),
        }
    }
}

impl fmt::Display for DatasetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_engine_string())
    }
}

/// Address a remote artifact through the engine's streaming HTTP reader.
pub fn streamed(url: &str) -> String {
    format!("/vsicurl/{url}")
}

/// Address a raster inside a zip archive without extracting it.
pub fn zipped(path: &str) -> String {
    format!("/vsizip/{path}")
}
