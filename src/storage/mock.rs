use super::Uploader;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Concurrency {
    current: usize,
    peak: usize,
}

#[derive(Clone)]
pub struct MockUploader {
    calls: Arc<Mutex<HashMap<String, usize>>>,
    failing_names: Arc<Mutex<HashSet<String>>>,
    fail_all: bool,
    delay: Duration,
    concurrency: Arc<Mutex<Concurrency>>,
}

impl MockUploader {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            failing_names: Arc::new(Mutex::new(HashSet::new())),
            fail_all: false,
            delay: Duration::ZERO,
            concurrency: Arc::new(Mutex::new(Concurrency::default())),
        }
    }

    /// Fail every upload whose local file name equals `file_name`.
    pub fn with_failing_file(self, file_name: &str) -> Self {
        self.failing_names
            .lock()
            .unwrap()
            .insert(file_name.to_string());
        self
    }

    pub fn with_fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn get_calls_for(&self, relative_path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(relative_path)
            .copied()
            .unwrap_or(0)
    }

    pub fn get_uploaded_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.calls.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn get_peak_concurrency(&self) -> usize {
        self.concurrency.lock().unwrap().peak
    }

    fn should_fail(&self, local_path: &Path) -> bool {
        if self.fail_all {
            return true;
        }
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.failing_names.lock().unwrap().contains(&name)
    }
}

impl Default for MockUploader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(
        &self,
        cancel: &CancellationToken,
        local_path: &Path,
        relative_path: &str,
    ) -> Result<()> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(relative_path.to_string())
            .or_insert(0) += 1;

        {
            let mut concurrency = self.concurrency.lock().unwrap();
            concurrency.current += 1;
            concurrency.peak = concurrency.peak.max(concurrency.current);
        }

        let canceled = tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.delay) => false,
        };

        self.concurrency.lock().unwrap().current -= 1;

        if canceled {
            return Err(Error::Canceled);
        }
        if self.should_fail(local_path) {
            return Err(Error::Storage(format!("upload failed for {}", relative_path)));
        }
        Ok(())
    }
}
