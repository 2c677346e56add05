//! Development server implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use gilder_pipeline::Pipeline;
use gilder_ssi::IncludeResolver;
use serde::Deserialize;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tower_http::services::ServeDir;

use crate::dispatch::WatchTable;
use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{livereload_client_script, ReloadHub, ReloadMessage};

const SOCKET_PATH: &str = "/__livereload";
const CLIENT_PATH: &str = "/__livereload.js";

/// Changes arriving within this window are handled as one batch.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Configuration for the development server (`[server]` in `gilder.toml`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DevServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,

    /// How often the watcher scans the source tree
    pub poll_interval_ms: u64,

    /// Extensions that reload browsers without running a task
    pub reload_extensions: Vec<String>,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
            poll_interval_ms: 100,
            reload_extensions: ["html", "json", "woff", "woff2"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("Cannot serve {}: {}", .0.display(), .1)]
    RootError(PathBuf, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Server error: {0}")]
    ServeError(String),
}

/// Shared server state.
struct ServerState {
    root: PathBuf,
    hub: ReloadHub,
    resolver: IncludeResolver,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    pipeline: Pipeline,
}

impl DevServer {
    /// Create a server for the pipeline's source tree.
    pub fn new(config: DevServerConfig, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }

    /// Serve, watch and rebuild until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        let src = self.pipeline.config().src.clone();
        let root = src
            .canonicalize()
            .map_err(|e| ServerError::RootError(src.clone(), e.to_string()))?;

        let state = Arc::new(ServerState {
            root: root.clone(),
            hub: ReloadHub::new(),
            resolver: IncludeResolver::new(&root),
        });

        // Task results -> browsers
        let mut events = self.pipeline.notifier().subscribe();
        let hub = state.hub.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => hub.send(ReloadMessage::for_event(&event, &src)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Dropped {} task events", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let table = WatchTable::from_config(self.pipeline.config(), &self.config.reload_extensions)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;
        let (watcher, rx) = FileWatcher::new(
            &[root.clone()],
            Duration::from_millis(self.config.poll_interval_ms),
        )
        .map_err(|e| ServerError::WatchError(e.to_string()))?;

        tokio::spawn(dispatch_loop(
            rx,
            watcher,
            table,
            root.clone(),
            self.pipeline.clone(),
            state.hub.clone(),
        ));

        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| ServerError::BindError(bind_addr.clone(), e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(bind_addr, e.to_string()))?;

        let url = format!("http://{}", addr);
        tracing::info!("Serving {} at {}", root.display(), url);

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Could not open browser: {}", e);
            }
        }

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Dev server stopped");
        Ok(())
    }
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(SOCKET_PATH, get(ws_handler))
        .route(CLIENT_PATH, get(client_script_handler))
        .fallback_service(ServeDir::new(&state.root))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            include_middleware,
        ))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Run the tasks triggered by each batch of file changes, one at a time.
async fn dispatch_loop(
    mut rx: mpsc::Receiver<WatchEvent>,
    _watcher: FileWatcher,
    table: WatchTable,
    root: PathBuf,
    pipeline: Pipeline,
    hub: ReloadHub,
) {
    while let Some(first) = rx.recv().await {
        let mut changed = vec![first];

        let window = tokio::time::sleep(DEBOUNCE);
        tokio::pin!(window);
        loop {
            tokio::select! {
                _ = &mut window => break,
                next = rx.recv() => match next {
                    Some(event) => changed.push(event),
                    None => break,
                },
            }
        }

        let relative: Vec<&Path> = changed
            .iter()
            .filter_map(|e| e.path().strip_prefix(&root).ok())
            .collect();
        let batch = table.plan(relative.iter().copied());

        for task in batch.tasks {
            tracing::info!("Change detected, running {}", task);
            let runner = pipeline.clone();
            match tokio::task::spawn_blocking(move || runner.run(task)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!("{} failed: {}", task, e),
                Err(e) => tracing::error!("{} did not finish: {}", task, e),
            }
        }

        if batch.reload {
            tracing::debug!("Reloading {} browsers", hub.subscriber_count());
            hub.send(ReloadMessage::Reload);
        }
    }
}

/// Expand includes in HTML pages and inject the live reload client.
///
/// Everything that is not an HTML page falls through to the next service.
async fn include_middleware(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(relative) = resolve_request_path(request.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let Some(page) = html_page(&state.root, &relative) else {
        return next.run(request).await;
    };

    let resolver = state.resolver.clone();
    let rendered = tokio::task::spawn_blocking(move || resolver.render_file(&page)).await;

    match rendered {
        Ok(Ok(html)) => html_response(StatusCode::OK, inject_client(&html, CLIENT_PATH)),
        Ok(Err(e)) => {
            tracing::warn!("{}", e);
            let page = format!(
                "<!DOCTYPE html><html><body><pre>{}</pre></body></html>",
                escape_html(&e.to_string())
            );
            html_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                inject_client(&page, CLIENT_PATH),
            )
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn html_response(status: StatusCode, html: String) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        html,
    )
        .into_response()
}

/// Turn a URL path into a path relative to the served root, percent-decoding
/// each segment.
///
/// Returns `None` for paths that try to leave the root or do not decode to
/// UTF-8.
pub fn resolve_request_path(uri_path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();

    for segment in uri_path.split('/') {
        let segment = urlencoding::decode(segment).ok()?;
        match &*segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains(|c: char| matches!(c, '/' | '\\' | '\0')) => return None,
            s => relative.push(s),
        }
    }

    Some(relative)
}

/// The HTML file a request maps to; directories map to their `index.html`.
fn html_page(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut path = root.join(relative);
    if path.is_dir() {
        path = path.join("index.html");
    }

    let is_html = path.extension().and_then(|e| e.to_str()) == Some("html");
    (is_html && path.is_file()).then_some(path)
}

/// Insert the client script tag before the last `</body>`, or append it.
pub fn inject_client(html: &str, script_src: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, script_src);

    match html.to_ascii_lowercase().rfind("</body>") {
        Some(index) => format!("{}{}{}", &html[..index], tag, &html[index..]),
        None => format!("{}{}", html, tag),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one browser until it disconnects.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(msg) => {
                    if send_message(&mut socket, &msg).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

/// Handler for the live reload client script.
async fn client_script_handler() -> impl IntoResponse {
    let script = livereload_client_script(SOCKET_PATH);
    ([(header::CONTENT_TYPE, "application/javascript")], script)
}
