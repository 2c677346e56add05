//! Development server with live reload for gilder.
//!
//! Serves the source tree with includes expanded, watches it with a polling
//! watcher, re-runs the matching pipeline task and tells connected browsers to
//! reload (or swap stylesheets in place).

pub mod dispatch;
pub mod server;
pub mod watcher;
pub mod websocket;

pub use dispatch::{Batch, WatchAction, WatchRule, WatchTable};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{livereload_client_script, ReloadHub, ReloadMessage};
