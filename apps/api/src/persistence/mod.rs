//! Persistence Adapter: saves a plan to the backend, or to the local
//! fallback list when the backend is unreachable or refuses it.
//!
//! A save never fails from the caller's point of view: every path ends in a
//! `SaveOutcome` that the UI shows as a non-blocking notification.

pub mod backend;
pub mod fallback;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::saved_plan::SavedPlanRecord;
use crate::planning::normalizer::NormalizedPlan;
use crate::planning::request::PlanRequest;

pub use backend::BackendClient;
pub use fallback::{FallbackStore, JsonFileStore, RedisStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// The backend stored the plan; `response` is its JSON body.
    Backend { response: Value },
    /// Appended to the fallback list.
    LocalFallback { id: Uuid, reason: String },
    /// A record with the same idempotency key was already in the fallback list.
    Duplicate { id: Uuid },
    /// Neither the backend nor the fallback list took the plan.
    Failed { reason: String },
}

#[derive(Clone)]
pub struct PersistenceAdapter {
    backend: BackendClient,
    store: Arc<dyn FallbackStore>,
    /// Serializes read-modify-write cycles on the fallback list.
    lock: Arc<Mutex<()>>,
}

impl PersistenceAdapter {
    pub fn new(backend: BackendClient, store: Arc<dyn FallbackStore>) -> Self {
        Self {
            backend,
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn save(
        &self,
        plan: &NormalizedPlan,
        request: &PlanRequest,
        generated_at: DateTime<Utc>,
        token: Option<&str>,
    ) -> SaveOutcome {
        let reason = match token {
            Some(token) => match self.backend.save_plan(request.kind, plan, token).await {
                Ok(response) => {
                    info!("Saved {:?} plan '{}' to backend", request.kind, plan.title);
                    return SaveOutcome::Backend { response };
                }
                Err(e) => {
                    warn!("Backend save failed, using fallback list: {e}");
                    e.to_string()
                }
            },
            None => {
                warn!("No bearer token; saving plan to fallback list");
                "Not authenticated".to_string()
            }
        };

        let record = SavedPlanRecord::new(plan, request, generated_at);
        match self.append(record).await {
            Ok(Appended::New(id)) => SaveOutcome::LocalFallback { id, reason },
            Ok(Appended::Existing(id)) => SaveOutcome::Duplicate { id },
            Err(e) => {
                error!("Fallback save failed: {e}");
                SaveOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Every record in the fallback list, oldest first.
    pub async fn saved_plans(&self) -> Result<Vec<SavedPlanRecord>, StoreError> {
        let _guard = self.lock.lock().await;
        self.store.read_all().await
    }

    async fn append(&self, record: SavedPlanRecord) -> Result<Appended, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.store.read_all().await?;

        if let Some(existing) = records
            .iter()
            .find(|r| r.idempotency_key == record.idempotency_key)
        {
            info!("Plan already in fallback list as {}", existing.id);
            return Ok(Appended::Existing(existing.id));
        }

        let id = record.id;
        records.push(record);
        self.store.write_all(&records).await?;
        info!("Appended plan {id} to fallback list ({} records)", records.len());
        Ok(Appended::New(id))
    }
}

enum Appended {
    New(Uuid),
    Existing(Uuid),
}
