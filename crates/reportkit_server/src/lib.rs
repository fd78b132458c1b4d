//! `reportkit_server` v1:
//! HTTP export service that flattens a JSON report into an `.xlsx` download.
//!
//! Modules:
//! - `conf`    : constants and CLI/env configuration
//! - `error`   : request and start-up errors
//! - `export`  : request decoding, export pipeline and download resolution
//! - `logging` : tracing subscriber setup
//! - `routes`  : axum router, handlers and server start-up
pub mod conf;
pub mod error;
pub mod export;
pub mod logging;
pub mod routes;

pub use conf::{CliArgs, SpecServerConfig};
pub use error::{ExportError, ExportResult, ServerError};
pub use export::{
    EnumJsonInput, SpecExportArtifact, SpecExportRequest, export_report, resolve_download_path,
};
pub use logging::setup_logging;
pub use routes::{AppState, build_router, serve};
