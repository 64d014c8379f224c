//! Tree enumeration feeding the upload queue.

use crate::models::WorkItem;
use crate::{Error, Result};
use std::ops::ControlFlow;
use std::path::{Component, Path, PathBuf};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Lazy depth-first sequence of the files below a root directory.
///
/// Directories are skipped. Siblings are visited in file name order so runs
/// over the same tree queue files in the same order.
pub struct TreeWalker {
    root: PathBuf,
    entries: walkdir::IntoIter,
}

impl TreeWalker {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            entries: WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
        }
    }

    fn work_item(&self, path: &Path) -> Result<WorkItem> {
        Ok(WorkItem {
            absolute_path: path.to_path_buf(),
            relative_path: relative_path(&self.root, path)?,
        })
    }
}

impl Iterator for TreeWalker {
    type Item = Result<WorkItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    return Some(Err(Error::Enumeration {
                        root: self.root.clone(),
                        source,
                    }))
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }
            return Some(self.work_item(entry.path()));
        }
    }
}

/// Compute the `/`-separated path of `path` below `root`.
///
/// A root that is itself a file maps to its own file name. Segments that are
/// not valid UTF-8 are rejected instead of being rewritten.
pub fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let path_error = || Error::Path {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let stripped = path.strip_prefix(root).map_err(|_| path_error())?;

    let mut segments = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(segment) => {
                segments.push(segment.to_str().ok_or_else(path_error)?.to_string())
            }
            Component::CurDir => {}
            _ => return Err(path_error()),
        }
    }

    if segments.is_empty() {
        return path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(path_error);
    }

    Ok(segments.join("/"))
}

/// Number of files below `root`, ignoring entries that cannot be read.
pub fn count_files(root: &Path) -> usize {
    TreeWalker::new(root).filter(|item| item.is_ok()).count()
}

/// Push every item of `items` (normally a [`TreeWalker`]) into `queue`.
///
/// Must run on a blocking thread; each push is driven through `handle` and
/// raced against `cancel`, so a full queue never outlives a cancellation.
/// Path errors are handed to `on_path_error`, which decides whether the walk
/// goes on. Traversal errors end the walk and are returned.
pub fn feed_queue<I, F>(
    items: I,
    queue: &mpsc::Sender<WorkItem>,
    cancel: &CancellationToken,
    handle: &Handle,
    mut on_path_error: F,
) -> Result<usize>
where
    I: IntoIterator<Item = Result<WorkItem>>,
    F: FnMut(Error) -> ControlFlow<()>,
{
    let mut queued = 0;

    for item in items {
        if cancel.is_cancelled() {
            tracing::debug!(queued, "Run canceled, enumeration stopped");
            break;
        }

        let item = match item {
            Ok(item) => item,
            Err(err @ Error::Path { .. }) => {
                if on_path_error(err).is_break() {
                    break;
                }
                continue;
            }
            Err(err) => return Err(err),
        };

        tracing::debug!(path = %item.relative_path, "Queueing file for upload");
        let sent = handle.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                sent = queue.send(item) => sent.is_ok(),
            }
        });
        if !sent {
            break;
        }
        queued += 1;
    }

    Ok(queued)
}
