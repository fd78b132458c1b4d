//! Axum HTTP routes for the export service.

use std::any::Any;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Host, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::conf::{C_ROUTE_DOWNLOAD, SpecServerConfig};
use crate::error::{ExportError, ExportResult, ServerError};
use crate::export::{SpecExportRequest, export_report, resolve_download_path};

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub dir_output: PathBuf,
    /// Fixed public base URL, without trailing slash
    pub url_base: Option<String>,
    /// `host:port` used when a request carries no Host header
    pub host_fallback: String,
}

impl AppState {
    pub fn from_config(config: &SpecServerConfig) -> Self {
        Self {
            dir_output: config.dir_output.clone(),
            url_base: config.url_base.clone(),
            host_fallback: format!("localhost:{}", config.port),
        }
    }

    /// Absolute download URL for `file_name`.
    pub fn derive_download_url(&self, host: Option<&str>, file_name: &str) -> String {
        let base = match (&self.url_base, host) {
            (Some(url), _) => url.clone(),
            (None, Some(host)) => format!("http://{host}"),
            (None, None) => format!("http://{}", self.host_fallback),
        };
        format!("{base}{C_ROUTE_DOWNLOAD}/{file_name}")
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Router

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/export", post(export))
        .route(&format!("{C_ROUTE_DOWNLOAD}/:filename"), get(download))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(text) = err.downcast_ref::<String>() {
        text.as_str()
    } else if let Some(text) = err.downcast_ref::<&str>() {
        text
    } else {
        "unknown panic"
    };
    error!(detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Handlers

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "reportkit",
    }))
}

async fn export(
    State(state): State<Arc<AppState>>,
    host: Option<Host>,
    body: Bytes,
) -> ExportResult<impl IntoResponse> {
    let (schema, data) = SpecExportRequest::from_slice(&body)?.into_values()?;

    let dir_output = state.dir_output.clone();
    let artifact =
        tokio::task::spawn_blocking(move || export_report(&dir_output, &schema, &data))
            .await
            .map_err(|err| ExportError::Task(err.to_string()))??;

    info!(
        file = %artifact.file_name,
        rows = artifact.n_rows,
        columns = artifact.n_columns,
        "exported report"
    );

    let download_url = state.derive_download_url(
        host.as_ref().map(|Host(host)| host.as_str()),
        &artifact.file_name,
    );
    Ok(Json(json!({ "download_url": download_url })))
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ExportResult<Response> {
    let path = resolve_download_path(&state.dir_output, &filename)?;
    let bytes = tokio::fs::read(&path).await.map_err(|err| match err.kind() {
        ErrorKind::NotFound => ExportError::FileNotFound(filename.clone()),
        _ => ExportError::Io(err),
    })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Startup

/// Create the output directory, bind and serve until Ctrl+C.
pub async fn serve(config: SpecServerConfig) -> Result<(), ServerError> {
    tokio::fs::create_dir_all(&config.dir_output).await?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        %addr,
        dir_output = %config.dir_output.display(),
        url_base = config.url_base.as_deref().unwrap_or("<request host>"),
        "reportkit listening"
    );

    let router = build_router(Arc::new(AppState::from_config(&config)));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to install Ctrl+C handler: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down gracefully");
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
