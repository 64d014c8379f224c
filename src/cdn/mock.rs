use super::CdnService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockCdnClient {
    purged_zones: Arc<Mutex<Vec<String>>>,
    purged_urls: Arc<Mutex<Vec<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockCdnClient {
    pub fn new() -> Self {
        Self {
            purged_zones: Arc::new(Mutex::new(Vec::new())),
            purged_urls: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_purged_zones(&self) -> Vec<String> {
        self.purged_zones.lock().unwrap().clone()
    }

    pub fn get_purged_urls(&self) -> Vec<String> {
        self.purged_urls.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<()> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::Cdn("Mock failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MockCdnClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdnService for MockCdnClient {
    async fn purge_pull_zone(&self, pull_zone_id: &str) -> Result<()> {
        self.check_failure()?;
        self.purged_zones
            .lock()
            .unwrap()
            .push(pull_zone_id.to_string());
        Ok(())
    }

    async fn purge_url(&self, url: &str) -> Result<()> {
        self.check_failure()?;
        self.purged_urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
