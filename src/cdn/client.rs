use super::CdnService;
use crate::models::{describe_error_body, CdnConfig};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

const DEFAULT_API_URL: &str = "https://api.bunny.net";

pub struct CdnClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CdnClient {
    pub fn new(config: CdnConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::new_with_client(config, client))
    }

    pub fn new_with_client(config: CdnConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.api_key,
            base_url: DEFAULT_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn check_response(response: Response, action: &str) -> Result<()> {
        let status = response.status();
        // Older API versions answer 200, newer ones 204.
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("CDN API error (status {}): {}", status, body);
        Err(Error::Cdn(format!(
            "failed to {} (status {}): {}",
            action,
            status,
            describe_error_body(&body)
        )))
    }
}

#[async_trait]
impl CdnService for CdnClient {
    async fn purge_pull_zone(&self, pull_zone_id: &str) -> Result<()> {
        let url = format!("{}/pullzone/{}/purgeCache", self.base_url, pull_zone_id);
        tracing::debug!(pull_zone = pull_zone_id, "Purging full cache for pull zone");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("AccessKey", &self.api_key)
            .send()
            .await?;

        Self::check_response(response, "purge pull zone cache").await?;
        tracing::debug!(pull_zone = pull_zone_id, "Successfully purged cache for pull zone");
        Ok(())
    }

    async fn purge_url(&self, url: &str) -> Result<()> {
        let endpoint = format!("{}/purge", self.base_url);
        tracing::debug!(url = url, "Purging cached URL");

        let response = self
            .client
            .post(&endpoint)
            .query(&[("url", url)])
            .header("AccessKey", &self.api_key)
            .send()
            .await?;

        Self::check_response(response, "purge url").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> CdnClient {
        CdnClient::new(CdnConfig {
            api_key: "api-key".to_string(),
        })
        .unwrap()
        .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_purge_pull_zone_accepts_no_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pullzone/12345/purgeCache"))
            .and(header("AccessKey", "api-key"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server).purge_pull_zone("12345").await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_pull_zone_accepts_ok() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pullzone/7/purgeCache"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(test_client(&server).purge_pull_zone("7").await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_pull_zone_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pullzone/7/purgeCache"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "HttpCode": 404,
                "Message": "Pull zone not found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server).purge_pull_zone("7").await.unwrap_err();
        match err {
            Error::Cdn(message) => {
                assert!(message.contains("404"));
                assert!(message.contains("Pull zone not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_purge_url_sends_url_query() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/purge"))
            .and(query_param("url", "https://cdn.example.com/index.html"))
            .and(header("AccessKey", "api-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server)
            .purge_url("https://cdn.example.com/index.html")
            .await
            .unwrap();
    }
}
