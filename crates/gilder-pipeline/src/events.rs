//! Notification channel for task results.

use std::path::PathBuf;

use tokio::sync::broadcast;

use crate::task::Task;

/// Emitted after every task run.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetEvent {
    /// A task finished and wrote these files
    Updated { task: Task, paths: Vec<PathBuf> },

    /// A task failed
    Failed { task: Task, message: String },
}

impl AssetEvent {
    /// Whether every updated file is a stylesheet (or its source map).
    pub fn is_stylesheet_only(&self) -> bool {
        match self {
            AssetEvent::Updated { paths, .. } => {
                !paths.is_empty()
                    && paths.iter().all(|p| {
                        matches!(p.extension().and_then(|e| e.to_str()), Some("css" | "map"))
                    })
            }
            AssetEvent::Failed { .. } => false,
        }
    }
}

/// Broadcasts [`AssetEvent`]s to any number of listeners.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<AssetEvent>,
}

impl Notifier {
    /// Create a new notifier.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Send an event to all listeners.
    pub fn send(&self, event: AssetEvent) {
        // No listeners during a plain build
        let _ = self.sender.send(event);
    }

    /// Subscribe to task events.
    pub fn subscribe(&self) -> broadcast::Receiver<AssetEvent> {
        self.sender.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcasts_to_subscribers() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.send(AssetEvent::Failed {
            task: Task::Styles,
            message: "boom".to_string(),
        });

        match rx.try_recv() {
            Ok(AssetEvent::Failed { task, message }) => {
                assert_eq!(task, Task::Styles);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected Failed event, got {:?}", other),
        }
    }

    #[test]
    fn detects_stylesheet_only_updates() {
        let css = AssetEvent::Updated {
            task: Task::Styles,
            paths: vec![
                PathBuf::from("src/css/main.min.css"),
                PathBuf::from("src/css/main.min.css.map"),
            ],
        };
        let js = AssetEvent::Updated {
            task: Task::Scripts,
            paths: vec![PathBuf::from("src/js/main.min.js")],
        };

        assert!(css.is_stylesheet_only());
        assert!(!js.is_stylesheet_only());
    }
}
