//! Role and state gating for agreement transitions
//!
//! The sender trusts the middleman to confirm delivery before funds are
//! released; the receiver trusts the middleman to refund when nothing was
//! delivered. Each transition right therefore sits with the side the
//! outcome works *against*, plus the neutral arbiter, so neither the sender
//! nor the receiver can both open and resolve a deal in their own favor.

use tripact_types::{Agreement, AgreementStatus, EscrowError, PartyId, Result};

/// State gate shared by both transitions: anything other than `Created`
/// is rejected before roles are even considered.
fn ensure_created(agreement: &Agreement) -> Result<()> {
    if agreement.status != AgreementStatus::Created {
        return Err(EscrowError::InvalidState {
            id: agreement.id.0,
            status: agreement.status,
        });
    }
    Ok(())
}

/// Gate for `pay`: caller must be the sender or the middleman.
pub fn authorize_pay(agreement: &Agreement, caller: &PartyId) -> Result<()> {
    ensure_created(agreement)?;
    if caller == &agreement.sender || caller == &agreement.middleman {
        Ok(())
    } else {
        Err(EscrowError::Unauthorized {
            party: caller.to_string(),
        })
    }
}

/// Gate for `cancel`: caller must be the receiver or the middleman.
pub fn authorize_cancel(agreement: &Agreement, caller: &PartyId) -> Result<()> {
    ensure_created(agreement)?;
    if caller == &agreement.receiver || caller == &agreement.middleman {
        Ok(())
    } else {
        Err(EscrowError::Unauthorized {
            party: caller.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tripact_types::{AgreementId, Amount};

    fn agreement(status: AgreementStatus) -> Agreement {
        Agreement {
            id: AgreementId(0),
            sender: PartyId::from_string("alice"),
            receiver: PartyId::from_string("bob"),
            middleman: PartyId::from_string("carol"),
            amount: Amount::new(100),
            commission: Amount::new(5),
            fee: Amount::new(1),
            status,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_pay_roles() {
        let a = agreement(AgreementStatus::Created);

        assert!(authorize_pay(&a, &PartyId::from_string("alice")).is_ok());
        assert!(authorize_pay(&a, &PartyId::from_string("carol")).is_ok());
        assert!(matches!(
            authorize_pay(&a, &PartyId::from_string("bob")),
            Err(EscrowError::Unauthorized { .. })
        ));
        assert!(matches!(
            authorize_pay(&a, &PartyId::from_string("mallory")),
            Err(EscrowError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_cancel_roles() {
        let a = agreement(AgreementStatus::Created);

        assert!(authorize_cancel(&a, &PartyId::from_string("bob")).is_ok());
        assert!(authorize_cancel(&a, &PartyId::from_string("carol")).is_ok());
        assert!(matches!(
            authorize_cancel(&a, &PartyId::from_string("alice")),
            Err(EscrowError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_terminal_state_always_rejected() {
        // State is checked before the role, so even an authorized party
        // gets InvalidState on a resolved agreement.
        for status in [AgreementStatus::Paid, AgreementStatus::Canceled] {
            let a = agreement(status);
            assert!(matches!(
                authorize_pay(&a, &PartyId::from_string("alice")),
                Err(EscrowError::InvalidState { .. })
            ));
            assert!(matches!(
                authorize_cancel(&a, &PartyId::from_string("bob")),
                Err(EscrowError::InvalidState { .. })
            ));
            // Unknown parties also see InvalidState, not Unauthorized
            assert!(matches!(
                authorize_pay(&a, &PartyId::from_string("mallory")),
                Err(EscrowError::InvalidState { .. })
            ));
        }
    }
}
