//! Polling file watcher.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{EventKind, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// File was created
    Created(PathBuf),

    /// File contents or metadata changed
    Modified(PathBuf),

    /// File was deleted
    Deleted(PathBuf),
}

impl WatchEvent {
    /// The affected path.
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Deleted(p) => p,
        }
    }
}

/// Polls directories for changes.
pub struct FileWatcher {
    _watcher: PollWatcher,
}

impl FileWatcher {
    /// Watch `paths` recursively, scanning every `interval`.
    ///
    /// Returns the watcher and a channel to receive events. Events stop when
    /// the watcher is dropped.
    pub fn new(
        paths: &[PathBuf],
        interval: Duration,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let config = notify::Config::default().with_poll_interval(interval);
        let mut watcher = PollWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let _ = sync_tx.send(event);
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            },
            config,
        )
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::warn!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in event.paths {
                    if let Some(e) = classify_event(path, &event.kind) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event into a [`WatchEvent`].
fn classify_event(path: PathBuf, kind: &EventKind) -> Option<WatchEvent> {
    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path)),
        EventKind::Remove(_) => Some(WatchEvent::Deleted(path)),
        EventKind::Modify(_) | EventKind::Any => Some(WatchEvent::Modified(path)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn classifies_event_kinds() {
        let path = PathBuf::from("src/scss/main.scss");

        assert_eq!(
            classify_event(path.clone(), &EventKind::Create(CreateKind::File)),
            Some(WatchEvent::Created(path.clone()))
        );
        assert_eq!(
            classify_event(path.clone(), &EventKind::Modify(ModifyKind::Any)),
            Some(WatchEvent::Modified(path.clone()))
        );
        assert_eq!(
            classify_event(path, &EventKind::Access(AccessKind::Any)),
            None
        );
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let test_file = temp.path().join("index.html");

        let (watcher, mut rx) =
            FileWatcher::new(&[temp.path().to_path_buf()], Duration::from_millis(50)).unwrap();

        // Let the first scan finish
        tokio::time::sleep(Duration::from_millis(200)).await;

        fs::write(&test_file, "<p>created</p>").unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(3), async {
            while let Some(event) = rx.recv().await {
                if event.path().ends_with("index.html") {
                    return true;
                }
            }
            false
        })
        .await;

        drop(watcher);

        assert_eq!(seen.ok(), Some(true), "no event for the created file");
    }
}
