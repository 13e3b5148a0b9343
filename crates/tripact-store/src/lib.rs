//! Tripact Agreement Store - append-only, role-indexed
//!
//! Agreements are retained permanently for audit: they are appended once,
//! mutated exactly once (the status transition), and never deleted. Role
//! indexes are derived lookup structures maintained at creation time only;
//! roles never change after creation.
//!
//! The store is a plain data structure with no locking of its own. The
//! engine serializes access; see `tripact-engine` for the concurrency
//! discipline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tripact_types::{
    Agreement, AgreementId, AgreementStatus, Amount, EscrowError, PartyId, Result, Role,
};

/// Append-only collection of agreements with per-role reverse indexes
#[derive(Default)]
pub struct AgreementStore {
    /// Position in the vec is the agreement id
    agreements: Vec<Agreement>,
    by_sender: HashMap<PartyId, Vec<AgreementId>>,
    by_receiver: HashMap<PartyId, Vec<AgreementId>>,
    by_middleman: HashMap<PartyId, Vec<AgreementId>>,
}

impl AgreementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next `create` call will assign.
    ///
    /// Stable for as long as the caller holds the store; lets the engine
    /// run fallible side effects keyed by the id before appending anything.
    pub fn next_id(&self) -> AgreementId {
        AgreementId(self.agreements.len() as u64)
    }

    /// Append a new agreement in `Created` status and index its roles.
    ///
    /// Assigns the next sequential id. Pure mutation: structural validation
    /// is the engine's job, so this never fails.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        sender: PartyId,
        receiver: PartyId,
        middleman: PartyId,
        amount: Amount,
        commission: Amount,
        fee: Amount,
        created_at: DateTime<Utc>,
    ) -> AgreementId {
        let id = AgreementId(self.agreements.len() as u64);

        self.by_sender.entry(sender.clone()).or_default().push(id);
        self.by_receiver.entry(receiver.clone()).or_default().push(id);
        self.by_middleman
            .entry(middleman.clone())
            .or_default()
            .push(id);

        self.agreements.push(Agreement {
            id,
            sender,
            receiver,
            middleman,
            amount,
            commission,
            fee,
            status: AgreementStatus::Created,
            created_at,
            resolved_at: None,
        });

        id
    }

    /// Look up an agreement by id
    pub fn get(&self, id: AgreementId) -> Result<&Agreement> {
        self.agreements
            .get(id.0 as usize)
            .ok_or(EscrowError::NotFound { id: id.0 })
    }

    /// Mutate an agreement's status in place.
    ///
    /// The engine guarantees this is called at most once per agreement.
    pub fn set_status(
        &mut self,
        id: AgreementId,
        status: AgreementStatus,
        resolved_at: DateTime<Utc>,
    ) -> Result<()> {
        let agreement = self
            .agreements
            .get_mut(id.0 as usize)
            .ok_or(EscrowError::NotFound { id: id.0 })?;

        agreement.status = status;
        agreement.resolved_at = Some(resolved_at);
        Ok(())
    }

    /// Ids of agreements where `party` holds `role`, in creation order.
    ///
    /// A fresh snapshot each call; not a live view.
    pub fn ids_by_role(&self, role: Role, party: &PartyId) -> Vec<AgreementId> {
        let index = match role {
            Role::Sender => &self.by_sender,
            Role::Receiver => &self.by_receiver,
            Role::Middleman => &self.by_middleman,
        };
        index.get(party).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.agreements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agreements.is_empty()
    }

    /// Walk all agreements in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Agreement> {
        self.agreements.iter()
    }
}
