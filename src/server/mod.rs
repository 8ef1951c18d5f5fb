//! Local content server for the conversion page and its bundled scripts
//!
//! The server binds synchronously on the caller's thread, so a port that is already taken is
//! reported before any browser is started, then runs axum on a dedicated current-thread tokio
//! runtime. [`ContentServer::stop`] (or dropping the handle) shuts it down and releases the port.

pub mod files;

pub use files::{content_type_for, resolve_request_path};

use crate::error::{ConverterError, Result};
use axum::{Router,
           extract::State,
           http::{HeaderValue, Method, StatusCode, Uri, header},
           response::{IntoResponse, Response}};
use std::{net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener},
          path::PathBuf,
          sync::Arc,
          thread::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Port used when none is configured; kept off the usual dev-server ports
pub const DEFAULT_PORT: u16 = 3001;

/// Configuration for the content server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind (loopback by default)
    pub host: IpAddr,

    /// Port to bind; 0 lets the OS pick a free one
    pub port: u16,

    /// Directory the served files are resolved against; a relative root that does not exist under
    /// the working directory is looked up next to the running executable
    pub root: PathBuf,

    /// File served for `/`
    pub index_page: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            root: PathBuf::from("assets"),
            index_page: "converter-auto.html".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn index_page(mut self, page: impl Into<String>) -> Self {
        self.index_page = page.into();
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Directory actually served
    pub fn resolve_root(&self) -> PathBuf {
        if self.root.is_absolute() || self.root.is_dir() {
            return self.root.clone();
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&self.root)))
            .filter(|candidate| candidate.is_dir())
            .unwrap_or_else(|| self.root.clone())
    }
}

struct ServeState {
    root: PathBuf,
    index_page: String,
}

/// Handle to a running content server
pub struct ContentServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    thread: Option<JoinHandle<std::io::Result<()>>>,
}

impl ContentServer {
    /// Bind the listener and start serving `config.root`
    pub fn start(config: &ServerConfig) -> Result<Self> {
        let requested = config.socket_addr();
        let listener =
            TcpListener::bind(requested).map_err(|source| ConverterError::BindFailed { addr: requested, source })?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConverterError::ServerFailed(format!("Failed to build runtime: {}", e)))?;

        let listener = {
            let _guard = runtime.enter();
            tokio::net::TcpListener::from_std(listener)?
        };

        let root = config.resolve_root();
        if !root.is_dir() {
            log::warn!("Content root {} does not exist; every request will 404", root.display());
        }
        let router = router(root.clone(), config.index_page.clone());
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let thread = std::thread::Builder::new()
            .name(format!("content-server-{}", addr.port()))
            .spawn(move || {
                runtime.block_on(async move {
                    axum::serve(listener, router)
                        .with_graceful_shutdown(async move { token.cancelled().await })
                        .await
                })
            })?;

        log::info!("Content server started on http://{} (root: {})", addr, root.display());

        Ok(Self { addr, shutdown, thread: Some(thread) })
    }

    /// The address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of a page served from the root
    pub fn url_for(&self, page: &str) -> String {
        format!("{}/{}", self.base_url(), page.trim_start_matches('/'))
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop serving and release the port. Safe to call more than once.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.shutdown.cancel();
        match thread.join() {
            Ok(Ok(())) => log::info!("Content server on {} stopped", self.addr),
            Ok(Err(e)) => log::warn!("Content server on {} exited with error: {}", self.addr, e),
            Err(_) => log::warn!("Content server thread on {} panicked", self.addr),
        }
    }

    /// Block until Ctrl-C, then stop the server
    pub fn wait_for_shutdown_signal(&mut self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(tokio::signal::ctrl_c())?;
        log::info!("Shutdown signal received");
        self.stop();
        Ok(())
    }
}

impl Drop for ContentServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn router(root: PathBuf, index_page: String) -> Router {
    Router::new().fallback(serve_file).with_state(Arc::new(ServeState { root, index_page }))
}

async fn serve_file(State(state): State<Arc<ServeState>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return with_cors(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let Some(path) = resolve_request_path(&state.root, &state.index_page, uri.path()) else {
        log::debug!("Rejected request path {}", uri.path());
        return not_found();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            log::debug!("GET {} -> {} ({} bytes)", uri.path(), path.display(), bytes.len());
            let response = ([(header::CONTENT_TYPE, content_type_for(&path))], bytes).into_response();
            with_cors(response)
        }
        Err(e) => {
            log::debug!("GET {} -> 404 ({})", uri.path(), e);
            not_found()
        }
    }
}

fn not_found() -> Response {
    with_cors(StatusCode::NOT_FOUND.into_response())
}

fn with_cors(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}
