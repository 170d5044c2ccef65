//! Destination key generation.

use std::fmt;
use std::path::Path;

use uuid::Uuid;

const EXTENSION: &str = "tif";

/// Collision-free placement key for one delivered object:
/// `{random-prefix}/{product-stem}-{layer}.tif`.
///
/// The random prefix makes concurrent requests for the same product land on
/// distinct keys without any coordination; the derived name keeps the object
/// recognizable.
#[derive(Debug, Clone)]
pub struct OutputKey {
    prefix: Uuid,
    derived_name: String,
}

impl OutputKey {
    pub fn generate(product: &str, layer: &str) -> Self {
        let product_stem = Path::new(product)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(product);
        let layer_name = Path::new(layer)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(layer);

        Self {
            prefix: Uuid::new_v4(),
            derived_name: format!("{product_stem}-{layer_name}"),
        }
    }

    pub fn prefix(&self) -> Uuid {
        self.prefix
    }

    pub fn derived_name(&self) -> &str {
        &self.derived_name
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.prefix, self.derived_name, EXTENSION)
    }
}
