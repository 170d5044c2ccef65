//! One-time `.netrc` bootstrap.
//!
//! The fetcher's HTTP authentication layer reads `$HOME/.netrc`
//! transparently; this module materializes it once at process start from the
//! configured secret. It is never re-resolved per request.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::secrets::{parse_netrc_secret, SecretSource};

/// Resolve the credential secret and write `$HOME/.netrc`.
pub async fn set_up_netrc(source: &dyn SecretSource, secret_id: &str) -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set")?;
    let raw = source.secret_value(secret_id).await?;
    let secret = parse_netrc_secret(&raw)?;
    write_netrc(Path::new(&home), &secret.netrc_content).await
}

/// Write `.netrc` under `home` with owner-only permissions.
pub async fn write_netrc(home: &Path, content: &str) -> Result<PathBuf> {
    let path = home.join(".netrc");
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .await
            .with_context(|| format!("failed to restrict permissions on {}", path.display()))?;
    }

    info!(path = %path.display(), "credential file written");
    Ok(path)
}
