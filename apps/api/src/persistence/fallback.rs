//! Local fallback storage for plans the backend did not accept.
//!
//! The list is read and written whole. Callers serialize access; the stores
//! themselves do not lock.

use std::path::PathBuf;

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::debug;

use crate::models::saved_plan::SavedPlanRecord;

/// Name of the fallback list, used as the Redis key and the file stem.
pub const FALLBACK_STORAGE_KEY: &str = "savedPlans";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt fallback list: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait FallbackStore: Send + Sync {
    async fn read_all(&self) -> Result<Vec<SavedPlanRecord>, StoreError>;
    async fn write_all(&self, records: &[SavedPlanRecord]) -> Result<(), StoreError>;
}

/// A JSON array on disk. A missing file reads as an empty list.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FallbackStore for JsonFileStore {
    async fn read_all(&self) -> Result<Vec<SavedPlanRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, records: &[SavedPlanRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(records)?;

        // Write beside the target and rename so readers never see half a list.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Wrote {} fallback records to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// The list as one Redis string value under `savedPlans`.
pub struct RedisStore {
    client: redis::Client,
    key: String,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            key: FALLBACK_STORAGE_KEY.to_string(),
        }
    }
}

#[async_trait]
impl FallbackStore for RedisStore {
    async fn read_all(&self) -> Result<Vec<SavedPlanRecord>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(&self.key).await?;
        match raw {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(&json)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn write_all(&self, records: &[SavedPlanRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string(records)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(&self.key, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::normalizer::NormalizedPlan;
    use crate::planning::request::{PlanKind, PlanRequest};
    use chrono::Utc;
    use serde_json::{json, Map, Value};

    fn record(business: &str) -> SavedPlanRecord {
        let map: Map<String, Value> = serde_json::from_value(json!({
            "title": format!("{business} Plan"),
            "executive_summary": "Fresh bread daily."
        }))
        .unwrap();
        let request = PlanRequest::new(PlanKind::Venture).with_field("businesstype", business);
        SavedPlanRecord::new(&NormalizedPlan::from(map), &request, Utc::now())
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("savedPlans.json"));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read_replaces_whole_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/data/savedPlans.json"));

        store.write_all(&[record("Bakery"), record("Cafe")]).await.unwrap();
        assert_eq!(store.read_all().await.unwrap().len(), 2);

        let only = record("Salon");
        store.write_all(std::slice::from_ref(&only)).await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), vec![only]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("savedPlans.json");
        std::fs::write(&path, "not json").unwrap();
        let err = JsonFileStore::new(path).read_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Serde(_)));
    }
}
