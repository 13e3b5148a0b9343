//! Tripact Ledger - credited balances with pull-based withdrawal
//!
//! The ledger holds funds logically owed to each party until that party
//! explicitly withdraws them. It is:
//! - Party-keyed (including the distinguished service identity)
//! - Journal-backed (every balance change appends an entry)
//! - Pull-payment only (withdraw drains the full balance in one atomic step)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Every balance change has a reason
//! 3. Credit and withdraw are atomic read-modify-write operations

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tripact_types::{AgreementId, Amount, EscrowError, PartyId, Result};
use uuid::Uuid;

/// Unique identifier for a journal entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new() -> Self {
        Self(format!("entry_{}", Uuid::new_v4()))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryDirection {
    /// Balance increased
    Credit,
    /// Balance drained by withdrawal
    Debit,
}

/// Why a balance changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryReason {
    /// Service cut taken at agreement creation
    ServiceFee { agreement: AgreementId },
    /// Net payout to the receiver on pay
    Payout { agreement: AgreementId },
    /// Net payout back to the sender on cancel
    Refund { agreement: AgreementId },
    /// Commission to the middleman on either outcome
    Commission { agreement: AgreementId },
    /// Party withdrew their full balance
    Withdrawal,
}

/// A single journal entry (one balance change)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub party: PartyId,
    pub direction: EntryDirection,
    pub amount: Amount,
    pub balance_after: Amount,
    pub reason: EntryReason,
    pub created_at: DateTime<Utc>,
}

struct LedgerInner {
    balances: HashMap<PartyId, Amount>,
    /// Append-only journal
    entries: Vec<LedgerEntry>,
}

impl LedgerInner {
    fn balance(&self, party: &PartyId) -> Amount {
        self.balances
            .get(party)
            .copied()
            .unwrap_or_else(Amount::zero)
    }

    /// The balance `party` would hold after the credit, or `InvalidArgument`
    /// on overflow. Read-only.
    fn check_credit(&self, party: &PartyId, amount: Amount) -> Result<Amount> {
        self.balance(party)
            .checked_add(amount)
            .ok_or_else(|| EscrowError::InvalidArgument {
                message: format!("balance overflow for {party}"),
            })
    }

    /// Apply a credit the caller has already validated with `check_credit`.
    fn apply_credit(&mut self, party: &PartyId, new_balance: Amount, amount: Amount, reason: EntryReason) {
        self.balances.insert(party.clone(), new_balance);
        self.entries.push(LedgerEntry {
            entry_id: EntryId::new(),
            party: party.clone(),
            direction: EntryDirection::Credit,
            amount,
            balance_after: new_balance,
            reason,
            created_at: Utc::now(),
        });
    }
}

/// The Tripact balance store
///
/// Thread-safe and cheap to clone; all clones share the same state. A single
/// lock covers both the balance map and the journal so entries never
/// disagree with the balances they describe.
#[derive(Clone)]
pub struct Ledger {
    inner: Arc<RwLock<LedgerInner>>,
}

impl Ledger {
    /// Create a new in-memory ledger
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(LedgerInner {
                balances: HashMap::new(),
                entries: Vec::new(),
            })),
        }
    }

    /// Get a party's credited-but-unwithdrawn balance
    pub async fn balance(&self, party: &PartyId) -> Amount {
        self.inner.read().await.balance(party)
    }

    /// Credit a party's balance
    ///
    /// Returns the new balance. Zero amounts are accepted as a no-op so that
    /// resolving a zero-value agreement cannot fail mid-flight; no journal
    /// entry is written for them.
    pub async fn credit(
        &self,
        party: &PartyId,
        amount: Amount,
        reason: EntryReason,
    ) -> Result<Amount> {
        let mut inner = self.inner.write().await;

        if amount.is_zero() {
            return Ok(inner.balance(party));
        }

        let new_balance = inner.check_credit(party, amount)?;
        inner.apply_credit(party, new_balance, amount, reason);
        Ok(new_balance)
    }

    /// Credit several parties in one atomic step.
    ///
    /// Every target balance is validated before anything mutates, so the
    /// batch either lands in full or leaves no trace: a later credit cannot
    /// strand an earlier one. Used by the engine so a resolution's payout
    /// and commission cannot be split by a failure between them.
    pub async fn credit_all(
        &self,
        credits: Vec<(PartyId, Amount, EntryReason)>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        // Validate the whole batch first, accumulating per-party totals so
        // repeated targets are projected correctly.
        let mut projected: HashMap<PartyId, Amount> = HashMap::new();
        for (party, amount, _) in &credits {
            let current = match projected.get(party) {
                Some(balance) => *balance,
                None => inner.balance(party),
            };
            let next = current
                .checked_add(*amount)
                .ok_or_else(|| EscrowError::InvalidArgument {
                    message: format!("balance overflow for {party}"),
                })?;
            projected.insert(party.clone(), next);
        }

        for (party, amount, reason) in credits {
            if amount.is_zero() {
                continue;
            }
            let new_balance = inner.check_credit(&party, amount)?;
            inner.apply_credit(&party, new_balance, amount, reason);
        }
        Ok(())
    }

    /// Withdraw a party's full balance
    ///
    /// Atomically reads the current balance, zeroes it, and returns the
    /// drained amount for the caller to hand to an actual funds-transfer
    /// mechanism. Fails with `NothingToWithdraw` when the balance is zero,
    /// so a stale second withdraw can never pay out twice.
    pub async fn withdraw(&self, party: &PartyId) -> Result<Amount> {
        let mut inner = self.inner.write().await;

        let current = inner.balance(party);
        if current.is_zero() {
            return Err(EscrowError::NothingToWithdraw {
                party: party.to_string(),
            });
        }

        inner.balances.insert(party.clone(), Amount::zero());
        inner.entries.push(LedgerEntry {
            entry_id: EntryId::new(),
            party: party.clone(),
            direction: EntryDirection::Debit,
            amount: current,
            balance_after: Amount::zero(),
            reason: EntryReason::Withdrawal,
            created_at: Utc::now(),
        });

        Ok(current)
    }

    /// Get all journal entries for a party
    pub async fn entries_for(&self, party: &PartyId) -> Vec<LedgerEntry> {
        let inner = self.inner.read().await;
        inner
            .entries
            .iter()
            .filter(|e| &e.party == party)
            .cloned()
            .collect()
    }

    /// Total number of journal entries
    pub async fn entry_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// All parties that ever held a balance
    pub async fn parties(&self) -> Vec<PartyId> {
        let inner = self.inner.read().await;
        inner.balances.keys().cloned().collect()
    }

    /// Sum of all currently credited balances
    pub async fn total_credited(&self) -> Amount {
        let inner = self.inner.read().await;
        inner
            .balances
            .values()
            .fold(Amount::zero(), |acc, b| {
                acc.checked_add(*b).unwrap_or(acc)
            })
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
