use async_trait::async_trait;
use tracing::warn;

use super::guard::SloBreach;
use crate::constants::events;
use crate::models::PortalStatus;
use crate::store::{record_event, SharedStore};

/// Mitigation actions. Implementations log their own failures; nothing here is fatal.
#[async_trait]
pub trait MitigationHooks: Send + Sync + std::fmt::Debug {
    /// Portal-scoped mitigation, typically throttling
    async fn mitigate_portal(&self, portal: &PortalStatus);

    /// System-wide mitigation for one SLO check
    async fn mitigate_system(&self, breaches: &[SloBreach]);

    async fn request_rollback(&self, reason: &str);
}

/// Records every mitigation as a system event
#[derive(Debug)]
pub struct StoreMitigationHooks {
    store: SharedStore,
}

impl StoreMitigationHooks {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MitigationHooks for StoreMitigationHooks {
    async fn mitigate_portal(&self, portal: &PortalStatus) {
        warn!(
            portal = %portal.name,
            error_rate = portal.performance.error_rate,
            "Throttling portal"
        );
        record_event(
            self.store.as_ref(),
            events::PORTAL_THROTTLED,
            format!(
                "throttling portal {}: error rate {:.2}%",
                portal.name, portal.performance.error_rate
            ),
        )
        .await;
    }

    async fn mitigate_system(&self, breaches: &[SloBreach]) {
        for breach in breaches {
            record_event(self.store.as_ref(), events::SLO_BREACH, breach.describe()).await;
        }
    }

    async fn request_rollback(&self, reason: &str) {
        warn!(reason = %reason, "Rollback requested");
        record_event(self.store.as_ref(), events::ROLLBACK_TRIGGERED, reason).await;
    }
}
