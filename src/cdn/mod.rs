//! CDN integration for invalidating cached content
//!
//! Purges a Bunny pull zone, either entirely or one URL at a time, after
//! new content has been uploaded to the storage zone behind it.

pub mod client;
pub mod mock;

pub use client::CdnClient;
pub use mock::MockCdnClient;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CdnService: Send + Sync {
    async fn purge_pull_zone(&self, pull_zone_id: &str) -> Result<()>;
    async fn purge_url(&self, url: &str) -> Result<()>;
}
