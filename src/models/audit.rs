use crate::models::RequestMeta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor_id: Option<&str>, action: &str, entity_type: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id: actor_id.map(str::to_string),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: None,
            old_values: None,
            new_values: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    pub fn entity(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn change(
        mut self,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
    ) -> Self {
        self.old_values = old_values;
        self.new_values = new_values;
        self
    }

    pub fn request(mut self, meta: &RequestMeta) -> Self {
        self.ip_address = meta.ip_address.clone();
        self.user_agent = meta.user_agent.clone();
        self
    }
}

/// Attempt counter for one identifier and action inside a sliding window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitBucket {
    pub identifier: String,
    pub action_type: String,
    pub attempts: u32,
    pub window_start: DateTime<Utc>,
    #[serde(default)]
    pub blocked_until: Option<DateTime<Utc>>,
}
