use super::Uploader;
use crate::models::{describe_error_body, StorageConfig};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub struct StorageClient {
    client: Client,
    access_key: String,
    zone_name: String,
    base_url: String,
}

impl StorageClient {
    pub fn new(config: StorageConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::new_with_client(config, client))
    }

    pub fn new_with_client(config: StorageConfig, client: Client) -> Self {
        Self {
            client,
            access_key: config.access_key,
            zone_name: config.zone_name,
            base_url: format!("https://{}", config.zone_host),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn object_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.zone_name,
            relative_path.trim_start_matches('/')
        )
    }

    async fn put(&self, local_path: &Path, relative_path: &str) -> Result<()> {
        let data = tokio::fs::read(local_path).await.map_err(|e| {
            tracing::error!(path = %local_path.display(), "Failed to read file: {}", e);
            e
        })?;

        let url = self.object_url(relative_path);
        tracing::debug!(url = %url, bytes = data.len(), "Sending PUT request to storage zone");

        let response = self
            .client
            .put(&url)
            .header("Content-Type", "application/octet-stream")
            .header("accept", "application/json")
            .header("AccessKey", &self.access_key)
            .body(data)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send upload request for {}: {}", relative_path, e);
                e
            })?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "upload of {} rejected (status {}): {}",
                relative_path,
                status,
                describe_error_body(&body)
            )));
        }

        tracing::info!(path = %local_path.display(), "Successfully uploaded file");
        Ok(())
    }
}

#[async_trait]
impl Uploader for StorageClient {
    async fn upload(
        &self,
        cancel: &CancellationToken,
        local_path: &Path,
        relative_path: &str,
    ) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Canceled),
            result = self.put(local_path, relative_path) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> StorageClient {
        StorageClient::new(StorageConfig::new("secret".to_string(), "zone".to_string()))
            .unwrap()
            .with_base_url(server.uri())
    }

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_object_url_uses_zone_host() {
        let client = StorageClient::new(
            StorageConfig::new("k".to_string(), "my-zone".to_string())
                .with_zone_host("ny.storage.bunnycdn.com".to_string()),
        )
        .unwrap();

        assert_eq!(
            client.object_url("sub/index.html"),
            "https://ny.storage.bunnycdn.com/my-zone/sub/index.html"
        );
        assert_eq!(
            client.object_url("/a.txt"),
            "https://ny.storage.bunnycdn.com/my-zone/a.txt"
        );
    }

    #[tokio::test]
    async fn test_upload_sends_put_with_headers_and_body() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "a.txt", b"hello bunny");

        Mock::given(method("PUT"))
            .and(path("/zone/sub/a.txt"))
            .and(header("AccessKey", "secret"))
            .and(header("Content-Type", "application/octet-stream"))
            .and(body_bytes(b"hello bunny".to_vec()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .upload(&CancellationToken::new(), &file, "sub/a.txt")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_non_created_status_is_storage_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "a.txt", b"data");

        Mock::given(method("PUT"))
            .and(path("/zone/a.txt"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "HttpCode": 401,
                "Message": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .upload(&CancellationToken::new(), &file, "a.txt")
            .await
            .unwrap_err();

        match err {
            Error::Storage(message) => {
                assert!(message.contains("401"));
                assert!(message.contains("Unauthorized"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_upload_ok_status_is_not_success() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "a.txt", b"data");

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client
            .upload(&CancellationToken::new(), &file, "a.txt")
            .await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_upload_missing_local_file_is_io_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let client = test_client(&server);
        let result = client
            .upload(&CancellationToken::new(), &dir.path().join("missing"), "missing")
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_upload_aborts_when_canceled() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "slow.txt", b"data");

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = client.upload(&cancel, &file, "slow.txt").await;

        assert!(matches!(result, Err(Error::Canceled)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
