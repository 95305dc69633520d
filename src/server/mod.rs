//! HTTP front end: `POST /verify_email`, `GET /` and `GET /favicon.ico`.

mod handlers;

pub use handlers::{VerifyRequest, VerifyResponse};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::address::ValidationMode;
use crate::pipeline::EmailValidator;

/// Shared by every request. Only read after startup.
#[derive(Clone)]
pub struct AppState {
    pub validator: Arc<dyn EmailValidator>,
    pub syntax_mode: ValidationMode,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(validator: Arc<dyn EmailValidator>) -> Self {
        Self {
            validator,
            syntax_mode: ValidationMode::default(),
            static_dir: PathBuf::from("static"),
        }
    }

    pub fn with_syntax_mode(mut self, mode: ValidationMode) -> Self {
        self.syntax_mode = mode;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/verify_email", post(handlers::verify_email))
        .route("/favicon.ico", get(handlers::favicon))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn run(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "mailprobe listening");
    axum::serve(listener, router(state)).await
}
