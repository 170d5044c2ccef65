//! Streamed retrieval of remote source artifacts.
//!
//! Used when the engine cannot address the remote artifact directly. The
//! body is staged to scratch storage in chunks as it arrives; the whole
//! artifact is never buffered in memory. No retry here: a fetch failure is
//! terminal for the request.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::FetchError;
use crate::scope::ScratchFile;

/// Join a base location and a relative product path with exactly one slash.
pub(crate) fn join_location(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// Streams remote artifacts into local scratch storage.
pub struct RemoteFetcher {
    client: Client,
    scratch_dir: PathBuf,
}

impl RemoteFetcher {
    pub fn new(scratch_dir: PathBuf) -> Result<Self, FetchError> {
        let client = Client::builder()
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;
        Ok(Self {
            client,
            scratch_dir,
        })
    }

    /// Retrieve `relative_product` under `base_location` into a scratch
    /// file. The caller owns the returned handle and must scope its
    /// deletion.
    #[instrument(skip(self), fields(base = %base_location, product = %relative_product))]
    pub async fn fetch(
        &self,
        base_location: &str,
        relative_product: &str,
    ) -> Result<ScratchFile, FetchError> {
        let url = join_location(base_location, relative_product);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| FetchError::Transport {
                url: url.clone(),
                message: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        fs::create_dir_all(&self.scratch_dir).await?;
        let file_name = Path::new(relative_product)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("artifact");
        let path = self
            .scratch_dir
            .join(format!("{}-{}", Uuid::new_v4(), file_name));

        match self.stream_to_file(response, &path, &url).await {
            Ok(bytes) => {
                debug!(url = %url, bytes, path = %path.display(), "fetched remote artifact");
                Ok(ScratchFile::new(path))
            }
            Err(err) => {
                // Do not leave a partial artifact behind.
                fs::remove_file(&path).await.ok();
                Err(err)
            }
        }
    }

    /// Stream the response body to `path` in arrival-sized chunks.
    async fn stream_to_file(
        &self,
        response: Response,
        path: &Path,
        url: &str,
    ) -> Result<u64, FetchError> {
        let mut file = File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut fetched = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;
            file.write_all(&chunk).await?;
            fetched += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn join_location_normalizes_slashes() {
        assert_eq!(
            join_location("https://host/products/", "/granule.nc"),
            "https://host/products/granule.nc"
        );
        assert_eq!(
            join_location("https://host/products", "granule.nc"),
            "https://host/products/granule.nc"
        );
    }

    #[tokio::test]
    async fn fetch_stages_exact_remote_bytes() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();
        Mock::given(method("GET"))
            .and(path("/products/granule.nc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = RemoteFetcher::new(dir.path().to_path_buf()).unwrap();
        let staged = fetcher
            .fetch(&format!("{}/products", server.uri()), "granule.nc")
            .await
            .unwrap();

        let written = tokio::fs::read(staged.path()).await.unwrap();
        assert_eq!(written, body);
        assert!(staged
            .path()
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("granule.nc"));
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/missing.nc"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = RemoteFetcher::new(dir.path().to_path_buf()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/products", server.uri()), "missing.nc")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        // Nothing was staged.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = RemoteFetcher::new(dir.path().to_path_buf()).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/products", "granule.nc")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
