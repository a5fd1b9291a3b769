use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::database::models::{ActivityAction, ActivityLogEntry, TargetType};
use crate::store::DirectoryStore;

use super::{Actor, ServiceResult};

/// Default number of entries returned by the activity feed.
pub const DEFAULT_FEED_LIMIT: i64 = 15;

/// Append-only audit log. Writes are fire-and-forget: a failed append is
/// warned about and swallowed, never surfaced to the operation that caused it.
#[derive(Clone)]
pub struct ActivityLog {
    store: Arc<dyn DirectoryStore>,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Record one admin action against a target record. Returns immediately;
    /// the append happens on a detached task.
    pub fn record(
        &self,
        actor: &Actor,
        action: ActivityAction,
        target_type: TargetType,
        target_id: Uuid,
        target_name: impl Into<String>,
        detail: Option<Value>,
    ) {
        let entry = ActivityLogEntry {
            id: Uuid::new_v4(),
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            action,
            target_type: Some(target_type.as_str().to_string()),
            target_id: Some(target_id),
            target_name: Some(target_name.into()),
            detail,
            created_at: Utc::now(),
        };

        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.append_activity(&entry).await {
                warn!(action = ?entry.action, "Failed to log admin activity: {}", e);
            }
        });
    }

    /// Newest-first activity feed.
    pub async fn recent(&self, limit: Option<i64>) -> ServiceResult<Vec<ActivityLogEntry>> {
        let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT);
        Ok(self.store.recent_activity(limit).await?)
    }
}
