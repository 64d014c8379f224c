//! Storage zone integration for uploading files
//!
//! Defines the single-file upload capability the folder orchestrator is
//! parameterized over, with an HTTP implementation for Bunny storage zones.

pub mod client;
pub mod mock;

pub use client::StorageClient;
pub use mock::MockUploader;

use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `local_path` to `relative_path` inside the storage zone.
    ///
    /// Implementations return [`crate::Error::Canceled`] as soon as `cancel` fires.
    async fn upload(
        &self,
        cancel: &CancellationToken,
        local_path: &Path,
        relative_path: &str,
    ) -> Result<()>;
}
