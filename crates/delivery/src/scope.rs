//! Guaranteed-cleanup scopes for transient resources.
//!
//! Every resource the pipeline acquires (scratch file, virtual buffer) is
//! released on every exit path, including partial failure. Release failures
//! are logged, never silently dropped, and never replace the body's outcome.
//! Nested scopes release innermost-first.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// A failure while releasing a resource.
#[derive(Debug)]
pub struct CleanupFailure {
    pub resource: String,
    pub message: String,
}

/// Run `body` over a resource, then release it exactly once.
///
/// `body` receives a handle clone; `release` consumes the resource after the
/// body returns, whether it succeeded or failed. A release failure is logged
/// and the body's result is returned unchanged.
pub async fn run_scoped<R, T, E, BFut, RelFut>(
    resource: R,
    body: impl FnOnce(R) -> BFut,
    release: impl FnOnce(R) -> RelFut,
) -> Result<T, E>
where
    R: Clone,
    BFut: Future<Output = Result<T, E>>,
    RelFut: Future<Output = Result<(), CleanupFailure>>,
{
    let outcome = body(resource.clone()).await;
    if let Err(failure) = release(resource).await {
        warn!(
            resource = %failure.resource,
            error = %failure.message,
            "resource cleanup failed; keeping the body's outcome"
        );
    }
    outcome
}

/// [`run_scoped`] with the acquisition inside the scope: when `acquire`
/// fails, nothing was acquired and `release` never runs.
pub async fn acquire_scoped<R, T, E, AFut, BFut, RelFut>(
    acquire: AFut,
    body: impl FnOnce(R) -> BFut,
    release: impl FnOnce(R) -> RelFut,
) -> Result<T, E>
where
    R: Clone,
    AFut: Future<Output = Result<R, E>>,
    BFut: Future<Output = Result<T, E>>,
    RelFut: Future<Output = Result<(), CleanupFailure>>,
{
    let resource = acquire.await?;
    run_scoped(resource, body, release).await
}

/// A fetched artifact staged on local scratch storage. Read-only once
/// written; deleted by the owning scope no later than the end of the
/// transform step.
#[derive(Debug, Clone)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file.
    pub async fn remove(self) -> Result<(), CleanupFailure> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed scratch file");
                Ok(())
            }
            Err(err) => Err(CleanupFailure {
                resource: self.path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("body failed")]
    struct BodyError;

    #[tokio::test]
    async fn release_runs_once_on_success() {
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = releases.clone();

        let result: Result<i32, BodyError> = run_scoped(
            "resource".to_string(),
            |_| async { Ok(42) },
            |_| async move {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(releases.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn release_runs_once_on_body_failure() {
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = releases.clone();

        let result: Result<i32, BodyError> = run_scoped(
            "resource".to_string(),
            |_| async { Err(BodyError) },
            |_| async move {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(releases.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn release_failure_does_not_replace_body_outcome() {
        let result: Result<i32, BodyError> = run_scoped(
            "resource".to_string(),
            |_| async { Ok(7) },
            |name| async move {
                Err(CleanupFailure {
                    resource: name,
                    message: "release blew up".into(),
                })
            },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn failed_acquisition_skips_release() {
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = releases.clone();

        let result: Result<i32, BodyError> = acquire_scoped(
            async { Err::<String, _>(BodyError) },
            |_| async { Ok(1) },
            |_| async move {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(releases.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn nested_scopes_release_innermost_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let outer_log = order.clone();
        let inner_log = order.clone();
        let body_log = order.clone();

        let result: Result<(), BodyError> = run_scoped(
            "outer".to_string(),
            |_| async move {
                run_scoped(
                    "inner".to_string(),
                    |_| async move {
                        body_log.lock().unwrap().push("body");
                        Ok(())
                    },
                    |_| async move {
                        inner_log.lock().unwrap().push("release inner");
                        Ok(())
                    },
                )
                .await
            },
            |_| async move {
                outer_log.lock().unwrap().push("release outer");
                Ok(())
            },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(
            *order.lock().unwrap(),
            vec!["body", "release inner", "release outer"]
        );
    }

    #[tokio::test]
    async fn scratch_file_remove_deletes_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged.nc");
        tokio::fs::write(&path, b"data").await.unwrap();

        let file = ScratchFile::new(path.clone());
        let second = file.clone();

        file.remove().await.unwrap();
        assert!(!path.exists());

        // The second handle sees the file already gone.
        assert!(second.remove().await.is_err());
    }
}
