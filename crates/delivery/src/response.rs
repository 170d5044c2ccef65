//! Redirect response descriptor and cross-origin policy.

use reqwest::Url;

/// Allow-list of domain suffixes that may receive credentialed cross-origin
/// access to delivered objects.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_suffixes: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allowed_suffixes: Vec<String>) -> Self {
        Self { allowed_suffixes }
    }

    /// Grant for `origin`: the scheme must be `https` and the host must
    /// match an allow-listed suffix on a label boundary. Anything else,
    /// including an absent or unparseable origin, yields no grant; that is
    /// not an error.
    pub fn evaluate(&self, origin: Option<&str>) -> Option<CorsGrant> {
        let origin = origin?;
        let url = Url::parse(origin).ok()?;
        if url.scheme() != "https" {
            return None;
        }
        let host = url.host_str()?;
        self.allowed_suffixes
            .iter()
            .any(|suffix| host_matches(host, suffix))
            .then(|| CorsGrant {
                allow_origin: origin.to_string(),
            })
    }
}

fn host_matches(host: &str, suffix: &str) -> bool {
    host == suffix || host.ends_with(&format!(".{suffix}"))
}

/// Headers to attach when a cross-origin caller is allow-listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsGrant {
    /// Echoed back as `Access-Control-Allow-Origin`; credentialed CORS
    /// forbids the wildcard, so the grant names the caller explicitly.
    pub allow_origin: String,
}

/// What the caller gets back on success: a temporary redirect to the
/// delivered object.
#[derive(Debug)]
pub struct ResponseDescriptor {
    pub status: u16,
    pub location: String,
    pub cors: Option<CorsGrant>,
}

impl ResponseDescriptor {
    pub fn redirect(location: String, cors: Option<CorsGrant>) -> Self {
        Self {
            status: 307,
            location,
            cors,
        }
    }
}
