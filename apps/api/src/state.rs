use std::sync::Arc;

use crate::llm_client::CompletionGateway;
use crate::persistence::PersistenceAdapter;
use crate::proxy::BackendProxy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Completion service seam. `CompletionClient` in production.
    pub completion: Arc<dyn CompletionGateway>,
    pub persistence: PersistenceAdapter,
    pub proxy: BackendProxy,
}
