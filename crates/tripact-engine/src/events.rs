//! Notification seam for agreement lifecycle events
//!
//! Fire-and-forget: the engine calls these after the mutation commits and
//! does not care whether delivery succeeds. At-least-once is acceptable.
//! Ordering across different ids is not guaranteed, but for a single id the
//! creation event always precedes any status-change event.

use async_trait::async_trait;
use tracing::info;
use tripact_types::{AgreementId, AgreementStatus};

/// Consumer of agreement lifecycle events
#[async_trait]
pub trait AgreementEvents: Send + Sync {
    /// Fired once, after a new agreement has been appended.
    async fn on_agreement_created(&self, id: AgreementId);

    /// Fired once per agreement, after the terminal transition commits.
    async fn on_agreement_status_changed(&self, id: AgreementId, status: AgreementStatus);
}

/// Default sink that writes events to the tracing subscriber
pub struct LogEvents;

#[async_trait]
impl AgreementEvents for LogEvents {
    async fn on_agreement_created(&self, id: AgreementId) {
        info!("Agreement created: {}", id);
    }

    async fn on_agreement_status_changed(&self, id: AgreementId, status: AgreementStatus) {
        info!("Agreement {} is now {}", id, status);
    }
}
