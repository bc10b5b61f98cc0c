//! Remote artifact download with a local file cache

use crate::config::ArtifactsConfig;
use crate::error::PipelineError;
use anyhow::bail;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

/// Downloads artifacts by remote id unless they are already cached on disk.
pub struct ArtifactFetcher {
    client: Client,
    /// Download URL with an `{id}` placeholder
    url_template: String,
}

impl ArtifactFetcher {
    pub fn new(
        url_template: impl Into<String>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url_template: url_template.into(),
        })
    }

    pub fn from_config(config: &ArtifactsConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.url_template.clone(),
            config.connect_timeout_secs.map(Duration::from_secs),
        )
    }

    /// Download URL for a remote id
    pub fn url_for(&self, remote_id: &str) -> String {
        self.url_template.replace("{id}", remote_id)
    }

    /// Make sure `local_path` exists, downloading `remote_id` into it if not.
    ///
    /// An existing file is trusted as-is and no request is made. A failed
    /// download never leaves anything at `local_path`.
    pub async fn ensure_local(
        &self,
        remote_id: &str,
        local_path: &Path,
    ) -> Result<PathBuf, PipelineError> {
        if fs::try_exists(local_path).await.unwrap_or(false) {
            debug!(remote_id = %remote_id, path = %local_path.display(), "Artifact already cached");
            return Ok(local_path.to_path_buf());
        }

        if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::fetch(remote_id, local_path, e))?;
        }

        let url = self.url_for(remote_id);
        let temp_path = download_path(local_path);
        info!(remote_id = %remote_id, path = %local_path.display(), "Downloading artifact");

        let written = match self.download(&url, &temp_path).await {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                warn!(remote_id = %remote_id, error = %e, "Artifact download failed");
                return Err(PipelineError::fetch(remote_id, local_path, e));
            }
        };

        if let Err(e) = fs::rename(&temp_path, local_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(PipelineError::fetch(remote_id, local_path, e));
        }

        info!(
            remote_id = %remote_id,
            path = %local_path.display(),
            bytes = written,
            "Artifact downloaded"
        );
        Ok(local_path.to_path_buf())
    }

    /// Stream `url` into `temp_path`, returning the byte count.
    async fn download(&self, url: &str, temp_path: &Path) -> anyhow::Result<u64> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        // File hosts may answer with an HTML interstitial instead of the blob
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
        if is_html {
            bail!("remote returned an HTML page instead of the artifact");
        }

        let file = fs::File::create(temp_path).await?;
        let mut file = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.get_mut().sync_all().await?;
        Ok(written)
    }
}

/// Sibling path the body is streamed to before it is renamed into place
fn download_path(local_path: &Path) -> PathBuf {
    let extension = local_path
        .extension()
        .map(|ext| format!("{}.download", ext.to_string_lossy()))
        .unwrap_or_else(|| "download".to_string());
    local_path.with_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer) -> ArtifactFetcher {
        ArtifactFetcher::new(format!("{}/files/{{id}}", server.uri()), None).unwrap()
    }

    #[test]
    fn test_url_template() {
        let fetcher =
            ArtifactFetcher::new("https://drive.google.com/uc?export=download&id={id}", None)
                .unwrap();
        assert_eq!(
            fetcher.url_for("abc123"),
            "https://drive.google.com/uc?export=download&id=abc123"
        );
    }

    #[test]
    fn test_download_path() {
        assert_eq!(
            download_path(Path::new("model_data/scaler.bin")),
            PathBuf::from("model_data/scaler.bin.download")
        );
        assert_eq!(
            download_path(Path::new("model_data/scaler")),
            PathBuf::from("model_data/scaler.download")
        );
    }

    #[tokio::test]
    async fn test_second_call_does_not_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/scaler-id"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"onnx-bytes".to_vec(), "application/octet-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("model_data").join("scaler.bin");
        let fetcher = fetcher(&server);

        let first = fetcher.ensure_local("scaler-id", &local).await.unwrap();
        let second = fetcher.ensure_local("scaler-id", &local).await.unwrap();

        assert_eq!(first, local);
        assert_eq!(second, local);
        assert_eq!(std::fs::read(&local).unwrap(), b"onnx-bytes");
        assert!(!download_path(&local).exists());
    }

    #[tokio::test]
    async fn test_existing_file_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("model_smoke.bin");
        std::fs::write(&local, b"cached").unwrap();

        fetcher(&server).ensure_local("smoke-id", &local).await.unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_failed_download_leaves_nothing_behind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/alcohol-id"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("model_alcohol.bin");
        let fetcher = fetcher(&server);

        let err = fetcher.ensure_local("alcohol-id", &local).await.unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactFetch { .. }));
        assert!(!local.exists());
        assert!(!download_path(&local).exists());

        // The retry goes back to the network instead of trusting a stale file
        assert!(fetcher.ensure_local("alcohol-id", &local).await.is_err());
    }

    #[tokio::test]
    async fn test_html_interstitial_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html>Virus scan warning</html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("scaler.bin");

        let err = fetcher(&server).ensure_local("big-id", &local).await.unwrap_err();
        assert!(err.to_string().contains("big-id"));
        assert!(!local.exists());
    }
}
