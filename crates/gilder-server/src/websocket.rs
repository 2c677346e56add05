//! WebSocket-based live reload.

use std::path::Path;

use gilder_pipeline::AssetEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload,

    /// Re-fetch stylesheets in place
    Css {
        /// URL path of the rebuilt stylesheet
        path: String,
    },

    /// A task failed; shown in the browser console
    Error {
        /// Task name
        task: String,
        /// Error text
        message: String,
    },

    /// Connection established
    Connected,
}

impl ReloadMessage {
    /// Translate a task result into a browser message.
    ///
    /// `src` is the served root; written paths are turned into URL paths
    /// relative to it.
    pub fn for_event(event: &AssetEvent, src: &Path) -> Self {
        match event {
            AssetEvent::Failed { task, message } => ReloadMessage::Error {
                task: task.name().to_string(),
                message: message.clone(),
            },
            AssetEvent::Updated { paths, .. } if event.is_stylesheet_only() => {
                let path = paths
                    .iter()
                    .find(|p| p.extension().and_then(|e| e.to_str()) == Some("css"))
                    .map(|p| url_path(p, src))
                    .unwrap_or_default();
                ReloadMessage::Css { path }
            }
            AssetEvent::Updated { .. } => ReloadMessage::Reload,
        }
    }
}

/// `src/css/main.min.css` under `src` -> `/css/main.min.css`.
fn url_path(path: &Path, src: &Path) -> String {
    let relative = path.strip_prefix(src).unwrap_or(path);
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Hub for broadcasting reload messages to all connected browsers.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected browsers.
    pub fn send(&self, msg: ReloadMessage) {
        // No browser connected yet
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of connected browsers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the browser-side live reload script.
///
/// The script connects back to whatever host served the page, so it works
/// for any configured host and port.
pub fn livereload_client_script(endpoint: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(scheme + location.host + '{}');
  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  function swapStylesheets(path) {{
    const links = document.querySelectorAll('link[rel="stylesheet"]');
    let swapped = false;

    links.forEach(function(link) {{
      const href = (link.getAttribute('href') || '').split('?')[0];
      if (!path || href === path || href.endsWith(path.slice(1))) {{
        link.setAttribute('href', href + '?v=' + Date.now());
        swapped = true;
      }}
    }});

    if (!swapped) {{
      location.reload();
    }}
  }}

  ws.onopen = function() {{
    console.log('[livereload] Connected');
    reconnectAttempts = 0;
  }};

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'css':
        swapStylesheets(msg.path);
        break;

      case 'error':
        console.error('[livereload] ' + msg.task + ' failed:\n' + msg.message);
        break;

      case 'connected':
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[livereload] Disconnected');
    if (reconnectAttempts < maxReconnectAttempts) {{
      reconnectAttempts++;
      setTimeout(function() {{
        location.reload();
      }}, 1000 * reconnectAttempts);
    }}
  }};

  ws.onerror = function(e) {{
    console.error('[livereload] WebSocket error:', e);
  }};
}})();
"#,
        endpoint
    )
}
