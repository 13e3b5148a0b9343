//! Tripact Engine - agreement state machine and payout accounting
//!
//! The engine orchestrates the full escrow lifecycle: agreement creation
//! with fund custody, authorization-gated pay/cancel transitions, fee and
//! commission computation, and deferred pull-based withdrawal through the
//! ledger.
//!
//! # Key Principle
//!
//! Funds never move directly between parties. Resolution credits internal
//! balances; each party withdraws its own balance in a separate atomic step.

mod admin;
mod engine;
mod events;
mod policy;

pub use admin::OwnerAdmin;
pub use engine::EscrowEngine;
pub use events::{AgreementEvents, LogEvents};
pub use policy::{authorize_cancel, authorize_pay};

pub use tripact_ledger::{EntryReason, Ledger, LedgerEntry};
pub use tripact_types::{
    Agreement, AgreementId, AgreementStatus, Amount, EscrowError, PartyId, Result, Role,
};
