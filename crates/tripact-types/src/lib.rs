//! Canonical types for Tripact
//!
//! Tripact is a tri-party escrow ledger: a sender deposits funds for a
//! receiver, with a middleman acting as arbiter. These types form the
//! foundation of every Tripact operation and carry no behavior beyond
//! structural validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Identity Types
// ============================================================================

/// Unique identifier for a party (any economic actor in Tripact)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId(pub String);

impl PartyId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The distinguished service identity that accumulates fee revenue.
    ///
    /// The service identity holds a balance like any other party but is
    /// never a valid agreement role and only the owner may withdraw it.
    pub fn service() -> Self {
        Self("tripact:service".to_string())
    }

    pub fn is_service(&self) -> bool {
        self == &Self::service()
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential identifier for an agreement, assigned at creation, never reused
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AgreementId(pub u64);

impl std::fmt::Display for AgreementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agreement#{}", self.0)
    }
}

// ============================================================================
// Amount
// ============================================================================

/// An amount of funds in smallest units
///
/// Non-negative by construction. Arithmetic is always checked; overflow is
/// surfaced as an error by the caller, never wrapped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Amount(pub u64);

impl Amount {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Agreement
// ============================================================================

/// Status of an agreement
///
/// `Created` is initial; `Paid` and `Canceled` are terminal. An agreement
/// transitions exactly once and is never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgreementStatus {
    /// Funds are in custody, awaiting resolution
    Created,
    /// Net payout credited to the receiver
    Paid,
    /// Net payout credited back to the sender
    Canceled,
}

impl AgreementStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AgreementStatus::Created)
    }
}

impl std::fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgreementStatus::Created => write!(f, "created"),
            AgreementStatus::Paid => write!(f, "paid"),
            AgreementStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// The role a party holds within an agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Sender,
    Receiver,
    Middleman,
}

/// A single escrow deal between sender, receiver, and middleman
///
/// Identity fields are immutable after creation; only `status` and
/// `resolved_at` change, exactly once, when the agreement is paid or
/// canceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: AgreementId,
    pub sender: PartyId,
    pub receiver: PartyId,
    pub middleman: PartyId,
    /// Gross value the receiver is entitled to before fee deduction
    pub amount: Amount,
    /// Paid to the middleman unconditionally, regardless of outcome
    pub commission: Amount,
    /// Service cut captured at creation time; payout math reuses this
    /// captured value, never the fee rate in effect at resolution time
    pub fee: Amount,
    pub status: AgreementStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Agreement {
    /// Classify a party's role, with precedence Sender > Receiver > Middleman
    /// for a party that appears in more than one role.
    pub fn role_of(&self, party: &PartyId) -> Option<Role> {
        if party == &self.sender {
            Some(Role::Sender)
        } else if party == &self.receiver {
            Some(Role::Receiver)
        } else if party == &self.middleman {
            Some(Role::Middleman)
        } else {
            None
        }
    }

    /// The net payout credited at resolution (gross amount minus the
    /// captured fee).
    pub fn net_payout(&self) -> Amount {
        // fee <= amount always holds: fee = amount / 100 * rate with rate <= 100
        self.amount
            .checked_sub(self.fee)
            .unwrap_or_else(Amount::zero)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur during Tripact operations
///
/// All errors are local and recoverable: validation happens before any
/// mutation, so a failing operation leaves no partial state behind.
#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Parties are not pairwise distinct: {message}")]
    InvalidParties { message: String },

    #[error("Deposited funds {deposited} do not equal amount + commission {required}")]
    AmountMismatch { deposited: u64, required: u64 },

    #[error("Agreement {id} not found")]
    NotFound { id: u64 },

    #[error("Party {party} is not authorized for this transition")]
    Unauthorized { party: String },

    #[error("Agreement {id} is {status} and cannot transition")]
    InvalidState { id: u64, status: AgreementStatus },

    #[error("Party {party} has nothing to withdraw")]
    NothingToWithdraw { party: String },
}

pub type Result<T> = std::result::Result<T, EscrowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_identity() {
        assert!(PartyId::service().is_service());
        assert!(!PartyId::from_string("alice").is_service());
    }

    #[test]
    fn test_amount_operations() {
        let a = Amount::new(100);
        let b = Amount::new(50);

        assert_eq!(a.checked_add(b), Some(Amount::new(150)));
        assert_eq!(a.checked_sub(b), Some(Amount::new(50)));
        assert_eq!(b.checked_sub(a), None); // Would underflow
    }

    #[test]
    fn test_status_terminality() {
        assert!(!AgreementStatus::Created.is_terminal());
        assert!(AgreementStatus::Paid.is_terminal());
        assert!(AgreementStatus::Canceled.is_terminal());
    }

    fn test_agreement(sender: &str, receiver: &str, middleman: &str) -> Agreement {
        Agreement {
            id: AgreementId(0),
            sender: PartyId::from_string(sender),
            receiver: PartyId::from_string(receiver),
            middleman: PartyId::from_string(middleman),
            amount: Amount::new(100),
            commission: Amount::new(5),
            fee: Amount::new(1),
            status: AgreementStatus::Created,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_role_precedence() {
        let agreement = test_agreement("alice", "bob", "carol");

        assert_eq!(
            agreement.role_of(&PartyId::from_string("alice")),
            Some(Role::Sender)
        );
        assert_eq!(
            agreement.role_of(&PartyId::from_string("bob")),
            Some(Role::Receiver)
        );
        assert_eq!(
            agreement.role_of(&PartyId::from_string("carol")),
            Some(Role::Middleman)
        );
        assert_eq!(agreement.role_of(&PartyId::from_string("dave")), None);

        // A party in several roles classifies by precedence
        let overlapping = test_agreement("alice", "alice", "alice");
        assert_eq!(
            overlapping.role_of(&PartyId::from_string("alice")),
            Some(Role::Sender)
        );
    }

    #[test]
    fn test_net_payout() {
        let agreement = test_agreement("alice", "bob", "carol");
        assert_eq!(agreement.net_payout(), Amount::new(99));
    }

    #[test]
    fn test_agreement_serialization() {
        let agreement = test_agreement("alice", "bob", "carol");
        let json = serde_json::to_string(&agreement).unwrap();
        assert!(json.contains("\"status\":\"Created\""));
        assert!(json.contains("\"sender\":\"alice\""));
    }
}
