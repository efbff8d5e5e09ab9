//! HTTP surface: service banner, health/status, and the download endpoint.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{MessagesSection, TokfetchConfig};
use crate::media::MediaResult;
use crate::orchestrator::{BuildError, Orchestrator, OrchestratorError};
use crate::stats::{StatsCounters, StatsRegistry};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    stats: Arc<StatsRegistry>,
    messages: Arc<MessagesSection>,
    started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, messages: MessagesSection) -> Self {
        let stats = Arc::clone(orchestrator.stats());
        Self {
            orchestrator,
            stats,
            messages: Arc::new(messages),
            started_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub status: String,
    pub version: String,
    pub methods: MethodInfo,
    pub stats: StatsCounters,
    pub endpoints: EndpointInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodInfo {
    pub primary: String,
    pub fallback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub download: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: String,
    pub uptime_seconds: u64,
    pub stats: StatsCounters,
}

#[derive(Debug, Default, Deserialize)]
struct DownloadRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    error: String,
    message: Option<String>,
}

impl ApiError {
    fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            message: None,
        }
    }

    fn internal(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            message: Some(message.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.message {
            Some(message) => json!({ "error": self.error, "message": message }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/api/status", get(status))
        .route("/api/download", post(download))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "tokfetch server is running".into(),
        status: "running".into(),
        version: VERSION.into(),
        methods: MethodInfo {
            primary: "structured extraction".into(),
            fallback: "headless browser".into(),
        },
        stats: state.stats.snapshot(),
        endpoints: EndpointInfo {
            download: "POST /api/download".into(),
            status: "GET /api/status".into(),
        },
    })
}

async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(StatusReport {
        status: "online".into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        stats: state.stats.snapshot(),
    })
}

async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Json<MediaResult>> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected download request body");
            return Err(ApiError::bad_request(state.messages.missing_url.clone()));
        }
    };
    let url = request.url.unwrap_or_default();
    info!(url = %url, "download requested");

    match state.orchestrator.download(&url).await {
        Ok(result) => Ok(Json(result)),
        Err(OrchestratorError::Validation(err)) => Err(ApiError::bad_request(err.to_string())),
        Err(OrchestratorError::Download(err)) => Err(ApiError::internal(
            state.messages.processing_failed.clone(),
            err.message,
        )),
    }
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("invalid listen address {0}")]
    Address(String),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Builds the extraction pipeline from `config` and serves until `shutdown`
/// resolves.
pub async fn serve<F>(config: &TokfetchConfig, shutdown: F) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let raw_addr = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = raw_addr
        .parse()
        .map_err(|_| ServeError::Address(raw_addr.clone()))?;

    let stats = Arc::new(StatsRegistry::new());
    let orchestrator = Arc::new(Orchestrator::from_config(config, stats)?);
    let app = router(AppState::new(orchestrator, config.messages.clone()));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    info!(%addr, version = VERSION, "tokfetch server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("tokfetch server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl-C handler");
    }
}
