//! Concurrent folder upload
//!
//! Walks a local tree and hands every file to a bounded pool of workers.
//! Each worker wraps the injected [`Uploader`] in a [`RetryPolicy`]. The
//! first failure that survives its retries is kept and reported, and in
//! fail-fast mode it cancels everything still queued or in flight.
//!
//! ```text
//! enumerator (blocking pool) ──► bounded queue ──► worker 0..N ──► Uploader
//!          ▲                                           │
//!          └────────── run cancellation token ◄────────┘ (fail-fast)
//! ```

pub mod retry;
pub mod walker;

pub use retry::RetryPolicy;
pub use walker::{count_files, TreeWalker};

use crate::models::{UploadOptions, UploadOutcome, UploadReport, WorkItem};
use crate::storage::Uploader;
use crate::{Error, Result};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Write-once error cell: the first recorded error wins, later ones are dropped.
#[derive(Default)]
pub struct ErrorSlot {
    inner: StdMutex<Option<Error>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the slot was already occupied.
    pub fn record(&self, err: Error) -> bool {
        let mut slot = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            debug!(error = %err, "Error slot already occupied, dropping error");
            return false;
        }
        *slot = Some(err);
        true
    }

    pub fn take(&self) -> Option<Error> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// State shared by the enumerator and every worker of one run.
struct RunState {
    run: CancellationToken,
    errors: ErrorSlot,
    uploaded: AtomicUsize,
    fail_fast: bool,
    max_attempts: usize,
}

impl RunState {
    /// Apply the final outcome of one item. `Break` means the caller must stop.
    fn settle(&self, relative_path: &str, outcome: UploadOutcome) -> ControlFlow<()> {
        let err = match outcome {
            UploadOutcome::Success => {
                self.uploaded.fetch_add(1, Ordering::Relaxed);
                return ControlFlow::Continue(());
            }
            UploadOutcome::Canceled => return ControlFlow::Break(()),
            UploadOutcome::TransientFailure(cause) => Error::Upload {
                relative_path: relative_path.to_string(),
                attempts: self.max_attempts,
                source: Box::new(cause),
            },
            UploadOutcome::FatalFailure(err) => err,
        };

        error!(path = relative_path, error = %err, "Giving up on file");
        self.errors.record(err);

        if self.fail_fast {
            warn!("Fail-fast enabled, canceling remaining uploads");
            self.run.cancel();
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// Upload every file below `root`, keeping its relative path as the destination.
///
/// Blocks until every worker has exited. Returns the first recorded upload
/// failure, otherwise the enumeration error, otherwise [`Error::Canceled`]
/// when `cancel` fired before the run finished.
pub async fn upload_folder(
    uploader: Arc<dyn Uploader>,
    root: &Path,
    options: &UploadOptions,
    cancel: &CancellationToken,
) -> Result<UploadReport> {
    options.validate()?;
    let start = Instant::now();
    let root = root.to_path_buf();

    info!(folder = %root.display(), "Uploading folder");
    let total = {
        let root = root.clone();
        tokio::task::spawn_blocking(move || count_files(&root))
            .await
            .map_err(|e| Error::Generic(format!("File count task failed: {}", e)))?
    };
    info!(files = total, "Total files");

    upload_items(uploader, TreeWalker::new(&root), options, cancel, start).await
}

/// Drive one run over `items`, the enumerated work of [`upload_folder`].
async fn upload_items<I>(
    uploader: Arc<dyn Uploader>,
    items: I,
    options: &UploadOptions,
    cancel: &CancellationToken,
    start: Instant,
) -> Result<UploadReport>
where
    I: IntoIterator<Item = Result<WorkItem>> + Send + 'static,
{
    let state = Arc::new(RunState {
        run: cancel.child_token(),
        errors: ErrorSlot::new(),
        uploaded: AtomicUsize::new(0),
        fail_fast: options.fail_fast,
        max_attempts: options.max_attempts,
    });
    let (tx, rx) = mpsc::channel::<WorkItem>(options.concurrency);
    let queue = Arc::new(Mutex::new(rx));
    let permits = Arc::new(Semaphore::new(options.concurrency));
    let policy = RetryPolicy::from_options(options);

    let mut workers = JoinSet::new();
    for id in 0..options.concurrency {
        workers.spawn(run_worker(
            id,
            Arc::clone(&uploader),
            Arc::clone(&queue),
            Arc::clone(&permits),
            policy.clone(),
            Arc::clone(&state),
        ));
    }

    let enumerator = {
        let state = Arc::clone(&state);
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || {
            let result = walker::feed_queue(items, &tx, &state.run, &handle, |err| {
                let label = match &err {
                    Error::Path { path, .. } => path.display().to_string(),
                    other => other.to_string(),
                };
                state.settle(&label, UploadOutcome::FatalFailure(err))
            });
            if let Err(e) = &result {
                error!(error = %e, "Enumeration failed, aborting run");
                state.run.cancel();
            }
            result
        })
    };

    let walk_result = match enumerator.await {
        Ok(result) => result,
        Err(e) => {
            state.run.cancel();
            Err(Error::Generic(format!("Enumeration task failed: {}", e)))
        }
    };

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!("Upload worker failed: {}", e);
            state
                .errors
                .record(Error::Generic(format!("Upload worker failed: {}", e)));
        }
    }

    if let Some(err) = state.errors.take() {
        return Err(err);
    }
    let queued = walk_result?;
    if cancel.is_cancelled() {
        return Err(Error::Canceled);
    }

    let report = UploadReport {
        files_uploaded: state.uploaded.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
    };
    info!(
        queued,
        uploaded = report.files_uploaded,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Folder upload complete"
    );
    Ok(report)
}

async fn run_worker(
    id: usize,
    uploader: Arc<dyn Uploader>,
    queue: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
    state: Arc<RunState>,
) {
    debug!(worker = id, "Worker started");
    let run = &state.run;

    loop {
        let item = tokio::select! {
            biased;
            _ = run.cancelled() => None,
            item = async { queue.lock().await.recv().await } => item,
        };
        let Some(item) = item else {
            break;
        };

        let _permit = tokio::select! {
            biased;
            _ = run.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        debug!(worker = id, path = %item.relative_path, "Uploading file");
        let outcome = policy
            .run(&item.relative_path, run, || {
                uploader.upload(run, &item.absolute_path, &item.relative_path)
            })
            .await;

        if state.settle(&item.relative_path, outcome).is_break() {
            break;
        }
    }

    debug!(worker = id, "Worker finished");
}
