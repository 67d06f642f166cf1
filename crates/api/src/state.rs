use std::sync::Arc;

use patchdock_pipeline::PipelineContext;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: patchdock_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Pipeline context: the pool plus the four capability clients.
    /// Synchronous orchestration steps (confirm, approve, reject) and the
    /// webhook handler run through it directly.
    pub pipeline: PipelineContext,
}
