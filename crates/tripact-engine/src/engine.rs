//! The escrow engine: creation, resolution, payout accounting
//!
//! All agreement mutations serialize on the store's write lock. Validation,
//! the ledger credits, and the status write happen while it is held, so a
//! concurrent second pay/cancel observes the terminal status and fails with
//! `InvalidState`. Balance mutations take the ledger's own lock; creating
//! agreements never blocks resolution of unrelated ones beyond the brief
//! id-allocation critical section.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use tripact_ledger::{EntryReason, Ledger};
use tripact_store::AgreementStore;
use tripact_types::{
    Agreement, AgreementId, AgreementStatus, Amount, EscrowError, PartyId, Result, Role,
};

use crate::admin::OwnerAdmin;
use crate::events::{AgreementEvents, LogEvents};
use crate::policy;

/// Orchestrates agreement creation, transitions, and payout computation
///
/// Cheap to clone; all clones share the same agreement store and ledger.
#[derive(Clone)]
pub struct EscrowEngine {
    agreements: Arc<RwLock<AgreementStore>>,
    ledger: Ledger,
    admin: OwnerAdmin,
    events: Arc<dyn AgreementEvents>,
}

impl EscrowEngine {
    /// Create an engine with a fresh ledger and store.
    ///
    /// `owner` is the owner-admin identity; it also stands in as middleman
    /// for agreements created without one. Fails with `InvalidArgument` if
    /// the fee rate is outside 0-100.
    pub fn new(owner: PartyId, fee_rate_percent: u8) -> Result<Self> {
        let ledger = Ledger::new();
        let admin = OwnerAdmin::new(owner, fee_rate_percent, ledger.clone())?;
        Ok(Self {
            agreements: Arc::new(RwLock::new(AgreementStore::new())),
            ledger,
            admin,
            events: Arc::new(LogEvents),
        })
    }

    /// Replace the event sink (defaults to `LogEvents`).
    pub fn with_events(mut self, events: Arc<dyn AgreementEvents>) -> Self {
        self.events = events;
        self
    }

    /// The shared balance store; parties withdraw through it directly.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The owner capability handle.
    pub fn admin(&self) -> &OwnerAdmin {
        &self.admin
    }

    /// Create an agreement, taking `deposited` funds into custody.
    ///
    /// The caller must have committed exactly `amount + commission`
    /// atomically with this call; anything else is `AmountMismatch`. An
    /// unset middleman is substituted with the owner identity. The service
    /// cut is computed from the fee rate in effect right now, captured on
    /// the agreement, and credited to the service balance immediately; the
    /// remainder stays in custody until resolution.
    pub async fn create_agreement(
        &self,
        sender: PartyId,
        receiver: PartyId,
        middleman: Option<PartyId>,
        amount: Amount,
        commission: Amount,
        deposited: Amount,
    ) -> Result<AgreementId> {
        let required =
            amount
                .checked_add(commission)
                .ok_or_else(|| EscrowError::InvalidArgument {
                    message: "amount + commission overflows".to_string(),
                })?;
        if deposited != required {
            return Err(EscrowError::AmountMismatch {
                deposited: deposited.as_u64(),
                required: required.as_u64(),
            });
        }

        let middleman = middleman.unwrap_or_else(|| self.admin.owner().clone());

        if sender == receiver || sender == middleman || receiver == middleman {
            return Err(EscrowError::InvalidParties {
                message: format!(
                    "sender={sender} receiver={receiver} middleman={middleman}"
                ),
            });
        }
        for party in [&sender, &receiver, &middleman] {
            if party.is_service() {
                return Err(EscrowError::InvalidArgument {
                    message: "the service identity cannot hold an agreement role"
                        .to_string(),
                });
            }
        }

        // Truncating percentage on purpose: floor(amount / 100) * rate,
        // matching the ledger's integer arithmetic.
        let rate = self.admin.fee_rate_percent().await;
        let fee = Amount::new(amount.as_u64() / 100 * rate as u64);

        let mut agreements = self.agreements.write().await;
        // The cut leaves custody right away; resolution later pays out
        // amount - fee plus the commission. The fee credit happens before
        // the append so a failed credit leaves no half-created agreement;
        // the id is stable while the store lock is held.
        let id = agreements.next_id();
        self.ledger
            .credit(
                &PartyId::service(),
                fee,
                EntryReason::ServiceFee { agreement: id },
            )
            .await?;
        let assigned = agreements.create(
            sender.clone(),
            receiver,
            middleman,
            amount,
            commission,
            fee,
            Utc::now(),
        );
        debug_assert_eq!(assigned, id);
        drop(agreements);

        info!(
            "Agreement {} created by {}: amount {}, commission {}, fee {}",
            id, sender, amount, commission, fee
        );
        self.events.on_agreement_created(id).await;
        Ok(id)
    }

    /// Mark an agreement paid, crediting the receiver and the middleman.
    ///
    /// Allowed for the sender or the middleman while the agreement is in
    /// `Created` status. The receiver gets `amount - fee` (the fee captured
    /// at creation), the middleman gets the commission.
    pub async fn pay_agreement(&self, id: AgreementId, caller: &PartyId) -> Result<()> {
        let mut agreements = self.agreements.write().await;
        let agreement = agreements.get(id)?.clone();
        policy::authorize_pay(&agreement, caller)?;

        // One atomic batch: the payout cannot land without the commission
        self.ledger
            .credit_all(vec![
                (
                    agreement.receiver.clone(),
                    agreement.net_payout(),
                    EntryReason::Payout { agreement: id },
                ),
                (
                    agreement.middleman.clone(),
                    agreement.commission,
                    EntryReason::Commission { agreement: id },
                ),
            ])
            .await?;
        agreements.set_status(id, AgreementStatus::Paid, Utc::now())?;
        drop(agreements);

        info!(
            "Agreement {} paid by {}: {} to {}, commission {} to {}",
            id,
            caller,
            agreement.net_payout(),
            agreement.receiver,
            agreement.commission,
            agreement.middleman
        );
        self.events.on_agreement_status_changed(id, AgreementStatus::Paid).await;
        Ok(())
    }

    /// Cancel an agreement, refunding the sender and crediting the middleman.
    ///
    /// Allowed for the receiver or the middleman while the agreement is in
    /// `Created` status. The middleman is paid the commission on either
    /// outcome: compensation for arbitration regardless of verdict.
    pub async fn cancel_agreement(&self, id: AgreementId, caller: &PartyId) -> Result<()> {
        let mut agreements = self.agreements.write().await;
        let agreement = agreements.get(id)?.clone();
        policy::authorize_cancel(&agreement, caller)?;

        self.ledger
            .credit_all(vec![
                (
                    agreement.sender.clone(),
                    agreement.net_payout(),
                    EntryReason::Refund { agreement: id },
                ),
                (
                    agreement.middleman.clone(),
                    agreement.commission,
                    EntryReason::Commission { agreement: id },
                ),
            ])
            .await?;
        agreements.set_status(id, AgreementStatus::Canceled, Utc::now())?;
        drop(agreements);

        info!(
            "Agreement {} canceled by {}: {} back to {}, commission {} to {}",
            id,
            caller,
            agreement.net_payout(),
            agreement.sender,
            agreement.commission,
            agreement.middleman
        );
        self.events
            .on_agreement_status_changed(id, AgreementStatus::Canceled)
            .await;
        Ok(())
    }

    /// Snapshot of an agreement by id
    pub async fn agreement(&self, id: AgreementId) -> Result<Agreement> {
        self.agreements.read().await.get(id).cloned()
    }

    pub async fn is_paid(&self, id: AgreementId) -> Result<bool> {
        Ok(self.agreement(id).await?.status == AgreementStatus::Paid)
    }

    pub async fn is_canceled(&self, id: AgreementId) -> Result<bool> {
        Ok(self.agreement(id).await?.status == AgreementStatus::Canceled)
    }

    /// Whether the agreement is still in its initial `Created` status
    pub async fn is_unchanged(&self, id: AgreementId) -> Result<bool> {
        Ok(self.agreement(id).await?.status == AgreementStatus::Created)
    }

    /// Classify a party's role in an agreement, precedence
    /// Sender > Receiver > Middleman.
    pub async fn role_of(&self, id: AgreementId, party: &PartyId) -> Result<Option<Role>> {
        Ok(self.agreement(id).await?.role_of(party))
    }

    /// Ids of agreements where `party` holds `role`, in creation order
    pub async fn agreements_for(&self, role: Role, party: &PartyId) -> Vec<AgreementId> {
        self.agreements.read().await.ids_by_role(role, party)
    }

    /// Total number of agreements ever created
    pub async fn agreement_count(&self) -> usize {
        self.agreements.read().await.len()
    }
}
