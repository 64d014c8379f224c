//! Application wiring for the storage uploader and the CDN purge client.

use crate::cdn::{CdnClient, CdnService};
use crate::models::{CdnConfig, StorageConfig, UploadOptions, UploadOutcome, UploadReport};
use crate::storage::{StorageClient, Uploader};
use crate::upload::{self, RetryPolicy};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Coordinates uploads to a storage zone and cache purges on a pull zone.
pub struct App {
    uploader: Option<Arc<dyn Uploader>>,
    cdn: Option<Box<dyn CdnService>>,
    shutdown: CancellationToken,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
#[derive(Default)]
pub struct AppServices {
    pub uploader: Option<Arc<dyn Uploader>>,
    pub cdn: Option<Box<dyn CdnService>>,
}

/// Credentials for whichever APIs the current command talks to.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub storage: Option<StorageConfig>,
    pub cdn: Option<CdnConfig>,
}

impl App {
    pub fn with_services(services: AppServices) -> Self {
        Self {
            uploader: services.uploader,
            cdn: services.cdn,
            shutdown: CancellationToken::new(),
        }
    }

    /// Build the real HTTP clients for the configured APIs.
    pub fn new(config: AppConfig) -> Result<Self> {
        // Reuse one HTTP connection pool across both clients.
        let http_client = reqwest::Client::builder().build()?;

        let uploader = match config.storage {
            Some(storage) => {
                storage.validate()?;
                info!(
                    zone = %storage.zone_name,
                    host = %storage.zone_host,
                    "Using storage zone"
                );
                let client = StorageClient::new_with_client(storage, http_client.clone());
                Some(Arc::new(client) as Arc<dyn Uploader>)
            }
            None => None,
        };

        let cdn = config.cdn.map(|cdn| {
            Box::new(CdnClient::new_with_client(cdn, http_client)) as Box<dyn CdnService>
        });

        Ok(Self::with_services(AppServices { uploader, cdn }))
    }

    /// Token that aborts any running upload when canceled (e.g. on Ctrl-C).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn uploader(&self) -> Result<Arc<dyn Uploader>> {
        self.uploader
            .clone()
            .ok_or_else(|| {
                Error::Config("storage zone credentials are not configured".to_string())
            })
    }

    fn cdn(&self) -> Result<&dyn CdnService> {
        self.cdn
            .as_deref()
            .ok_or_else(|| Error::Config("CDN API key is not configured".to_string()))
    }

    pub async fn upload_folder(
        &self,
        folder: &Path,
        options: &UploadOptions,
    ) -> Result<UploadReport> {
        upload::upload_folder(self.uploader()?, folder, options, &self.shutdown).await
    }

    /// Upload a single file, retried like any file of a folder upload.
    ///
    /// The destination defaults to the file name at the zone root.
    pub async fn upload_file(
        &self,
        file: &Path,
        destination: Option<&str>,
        options: &UploadOptions,
    ) -> Result<()> {
        options.validate()?;
        let uploader = self.uploader()?;

        let metadata = tokio::fs::metadata(file).await?;
        if !metadata.is_file() {
            return Err(Error::Config(format!("{} is not a file", file.display())));
        }

        let destination = match destination {
            Some(dest) => dest.trim_start_matches('/').to_string(),
            None => upload::walker::relative_path(file, file)?,
        };

        info!(file = %file.display(), destination = %destination, "Uploading file");
        let policy = RetryPolicy::from_options(options);
        let outcome = policy
            .run(&destination, &self.shutdown, || {
                uploader.upload(&self.shutdown, file, &destination)
            })
            .await;

        match outcome {
            UploadOutcome::Success => Ok(()),
            UploadOutcome::Canceled => Err(Error::Canceled),
            UploadOutcome::TransientFailure(cause) => Err(Error::Upload {
                relative_path: destination,
                attempts: policy.max_attempts,
                source: Box::new(cause),
            }),
            UploadOutcome::FatalFailure(err) => Err(err),
        }
    }

    pub async fn purge_pull_zone(&self, pull_zone_id: &str) -> Result<()> {
        info!(pull_zone = pull_zone_id, "Purging full cache for pull zone");
        self.cdn()?.purge_pull_zone(pull_zone_id).await
    }

    /// Purge every URL listed in `list_file`, stopping at the first failure.
    pub async fn purge_urls_from_file(&self, list_file: &Path) -> Result<usize> {
        let cdn = self.cdn()?;
        let content = tokio::fs::read_to_string(list_file).await?;
        let urls = parse_url_list(&content);

        info!(file = %list_file.display(), urls = urls.len(), "Purging URLs");
        for url in &urls {
            cdn.purge_url(url).await?;
            info!(url = %url, "Purged URL");
        }
        Ok(urls.len())
    }
}

/// One URL per line; blank lines and `#` comments are skipped.
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
