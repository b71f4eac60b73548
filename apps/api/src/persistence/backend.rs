use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::planning::normalizer::NormalizedPlan;
use crate::planning::request::PlanKind;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend rejected the plan (status {status}): {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct BackendMessage {
    message: String,
}

/// Client for the save endpoints of the backend API.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// POSTs the plan to `/api/<endpoint>` for its kind and returns the
    /// backend's JSON body. The request is aborted after the configured timeout.
    pub async fn save_plan(
        &self,
        kind: PlanKind,
        plan: &NormalizedPlan,
        token: &str,
    ) -> Result<Value, BackendError> {
        let url = format!("{}/api/{}", self.base_url, kind.save_endpoint());
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&save_payload(plan))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = serde_json::from_str::<BackendMessage>(&body)
                .map(|m| m.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }
}

/// Every section coerced to a string; keys mirror the plan's section keys.
fn save_payload(plan: &NormalizedPlan) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("title".to_string(), Value::String(plan.title.clone()));
    for section in &plan.sections {
        payload.insert(section.key.clone(), Value::String(section.section.to_text()));
    }
    payload
}
