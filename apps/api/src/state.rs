use std::sync::Arc;

use crate::config::Config;
use crate::notify::ConnectionRegistry;
use crate::pipeline::Pipeline;
use crate::queue::JobQueue;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub pipeline: Pipeline,
    pub queue: Arc<dyn JobQueue>,
    /// Push sessions held by this process.
    pub registry: ConnectionRegistry,
    pub config: Config,
}
