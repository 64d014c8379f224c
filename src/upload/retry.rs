//! Bounded retries with a fixed delay and a timeout per attempt.

use crate::models::{UploadOptions, UploadOutcome};
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_options(options: &UploadOptions) -> Self {
        Self {
            max_attempts: options.max_attempts,
            delay: options.retry_delay,
            attempt_timeout: options.attempt_timeout,
        }
    }

    /// Run `attempt` until it succeeds, the attempts run out, or `cancel` fires.
    ///
    /// Cancellation wins over everything else, including the delay between
    /// attempts, and is never retried.
    pub async fn run<F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> UploadOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let strategy = FixedInterval::new(self.delay).take(self.max_attempts.saturating_sub(1));
        let max_attempts = self.max_attempts;
        let timeout = self.attempt_timeout;
        let mut attempt_number = 0;

        let retry = RetryIf::spawn(
            strategy,
            || {
                attempt_number += 1;
                let current = attempt_number;
                let upload = attempt();
                async move {
                    let result = match tokio::time::timeout(timeout, upload).await {
                        Ok(result) => result,
                        Err(_) => Err(Error::Timeout {
                            path: label.to_string(),
                            timeout,
                        }),
                    };
                    if let Err(e) = &result {
                        if !e.is_canceled() {
                            warn!(
                                path = label,
                                attempt = current,
                                max_attempts,
                                error = %e,
                                "Upload attempt failed"
                            );
                        }
                    }
                    result
                }
            },
            |e: &Error| !e.is_canceled(),
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Canceled),
            result = retry => result,
        };

        match result {
            Ok(()) => UploadOutcome::Success,
            Err(e) if e.is_canceled() => {
                debug!(path = label, "Upload canceled");
                UploadOutcome::Canceled
            }
            Err(e) => UploadOutcome::TransientFailure(e),
        }
    }
}
