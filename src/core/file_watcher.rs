//! Change notifications for the usage cache file.
//!
//! The parent directory is watched rather than the file itself so that
//! atomic replace-by-rename writes are still seen.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{MeterError, Result};

/// Kind of change seen on the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    /// Created, written, or renamed into place.
    Modified,
    Removed,
}

/// Watches one usage file and yields [`FileChange`]s.
pub struct UsageFileWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
    rx: mpsc::UnboundedReceiver<FileChange>,
}

impl std::fmt::Debug for UsageFileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageFileWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl UsageFileWatcher {
    /// Start watching `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or the
    /// parent directory cannot be watched.
    pub fn new(path: &Path) -> Result<Self> {
        let (parent, target) = resolve_target(path)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let filter_target = target.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(change) = classify(&event, &filter_target) {
                        let _ = tx.send(change);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Usage file watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| MeterError::Other(anyhow::anyhow!("create watcher: {e}")))?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| {
                MeterError::Other(anyhow::anyhow!("watch {}: {e}", parent.display()))
            })?;
        tracing::debug!(path = %target.display(), "Watching usage file");

        Ok(Self {
            _watcher: watcher,
            path: target,
            rx,
        })
    }

    /// The watched file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next change. `None` once the watcher has shut down.
    pub async fn changed(&mut self) -> Option<FileChange> {
        self.rx.recv().await
    }

    /// Drop any queued changes, returning how many there were.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

/// Canonical parent directory and the file path inside it.
///
/// Events carry paths under the watched directory, so the target is built
/// from the canonical parent to match them even for relative inputs.
fn resolve_target(path: &Path) -> Result<(PathBuf, PathBuf)> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        MeterError::Other(anyhow::anyhow!("not a file path: {}", path.display()))
    })?;
    let parent = parent.canonicalize()?;
    let target = parent.join(file_name);
    Ok((parent, target))
}

fn classify(event: &Event, target: &Path) -> Option<FileChange> {
    if !event.paths.iter().any(|p| p == target) {
        return None;
    }
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any) => {
            Some(FileChange::Modified)
        }
        EventKind::Remove(_) => Some(FileChange::Removed),
        _ => None,
    }
}
