use crate::models::AuditEntry;
use crate::store::AuditStore;
use std::sync::Arc;
use std::time::Duration;

/// Best-effort audit logging. A failed or slow write never fails the
/// operation being audited.
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
    timeout: Duration,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn record(&self, entry: AuditEntry) {
        match tokio::time::timeout(self.timeout, self.store.append(&entry)).await {
            Ok(Ok(())) => {
                tracing::debug!(action = %entry.action, entity = ?entry.entity_id, "Audit entry recorded");
            }
            Ok(Err(e)) => {
                tracing::warn!(action = %entry.action, error = %e, "Audit write failed");
            }
            Err(_) => {
                tracing::warn!(action = %entry.action, timeout = ?self.timeout, "Audit write timed out");
            }
        }
    }
}
