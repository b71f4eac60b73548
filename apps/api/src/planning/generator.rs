//! Plan generation: orchestrates one submission.
//!
//! Flow: build_prompt → completion gateway → normalize.
//! Only the completion call can fail; everything after it degrades instead.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::llm_client::{CompletionGateway, LlmError};
use crate::planning::normalizer::{normalize, NormalizationOrigin, Normalized, NormalizedPlan};
use crate::planning::prompts::build_prompt;
use crate::planning::request::PlanRequest;

/// Result of one submission. `generated_at` anchors the idempotency key used
/// when the plan is saved, so retries of the same save are recognised.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: NormalizedPlan,
    pub origin: NormalizationOrigin,
    pub generated_at: DateTime<Utc>,
}

pub async fn generate_plan(
    gateway: &dyn CompletionGateway,
    request: &PlanRequest,
) -> Result<PlanOutcome, LlmError> {
    let prompt = build_prompt(request);
    info!(
        "Requesting {:?} plan for '{}' ({} prompt chars)",
        request.kind,
        request.subject(),
        prompt.len()
    );

    let raw = gateway.complete(&prompt).await?;
    let Normalized { plan, origin } = normalize(&raw, request);

    Ok(PlanOutcome {
        plan,
        origin,
        generated_at: Utc::now(),
    })
}
