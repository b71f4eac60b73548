//! Fakes shared by handler and pipeline tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use crate::llm_client::{CompletionGateway, LlmError, RawCompletion};
use crate::persistence::{BackendClient, JsonFileStore, PersistenceAdapter};
use crate::proxy::BackendProxy;
use crate::routes::build_router;
use crate::state::AppState;

/// A completion gateway that replays queued results, then repeats a default.
pub struct StubGateway {
    queued: Mutex<VecDeque<Result<RawCompletion, LlmError>>>,
    default: RawCompletion,
    prompts: Mutex<Vec<String>>,
}

impl StubGateway {
    pub fn returning(completion: RawCompletion) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            default: completion,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_once(error: LlmError, then: RawCompletion) -> Self {
        let stub = Self::returning(then);
        stub.queued.lock().unwrap().push_back(Err(error));
        stub
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionGateway for StubGateway {
    async fn complete(&self, prompt: &str) -> Result<RawCompletion, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.queued.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default.clone()))
    }
}

/// App state wired to a fake gateway, a backend URL, and a temp fallback file.
pub struct TestApp {
    pub state: AppState,
    _dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new(backend_url: &str) -> Self {
        let gateway = StubGateway::returning(RawCompletion::Text(String::new()));
        Self::with_gateway(backend_url, Arc::new(gateway))
    }

    pub fn with_gateway(backend_url: &str, gateway: Arc<dyn CompletionGateway>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let http = reqwest::Client::new();
        let backend = BackendClient::new(http.clone(), backend_url, Duration::from_secs(2));
        let store = Arc::new(JsonFileStore::new(dir.path().join("savedPlans.json")));
        let state = AppState {
            completion: gateway,
            persistence: PersistenceAdapter::new(backend, store),
            proxy: BackendProxy::new(http, backend_url),
        };
        Self { state, _dir: dir }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}
