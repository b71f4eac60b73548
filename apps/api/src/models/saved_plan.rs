use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::planning::normalizer::NormalizedPlan;
use crate::planning::request::{PlanKind, PlanRequest};

/// A plan kept in the local fallback list after the backend save failed.
/// Records are appended, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPlanRecord {
    pub id: Uuid,
    /// Request hash plus generation time; a second append with the same key is skipped.
    pub idempotency_key: String,
    pub kind: PlanKind,
    pub plan: NormalizedPlan,
    pub form_data: BTreeMap<String, String>,
    pub generated_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl SavedPlanRecord {
    pub fn new(plan: &NormalizedPlan, request: &PlanRequest, generated_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            idempotency_key: idempotency_key(request, generated_at),
            kind: request.kind,
            plan: plan.clone(),
            form_data: request.fields.clone(),
            generated_at,
            saved_at: Utc::now(),
        }
    }
}

/// `<sha256 of the request>-<generation time in ms>`.
pub fn idempotency_key(request: &PlanRequest, generated_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        serde_json::to_vec(request).unwrap_or_else(|_| format!("{request:?}").into_bytes()),
    );
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{hex}-{}", generated_at.timestamp_millis())
}
