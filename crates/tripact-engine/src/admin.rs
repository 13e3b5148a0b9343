//! Owner administration: fee-rate configuration and fee withdrawal
//!
//! The owner is the single capability holder allowed to change the service
//! fee rate and to drain the service balance. The owner identity also
//! stands in as the middleman for agreements created without one.

use std::sync::Arc;

use tokio::sync::RwLock;
use tripact_ledger::Ledger;
use tripact_types::{Amount, EscrowError, PartyId, Result};

/// Owner capability handle
///
/// Cheap to clone; all clones share the same fee rate.
#[derive(Clone)]
pub struct OwnerAdmin {
    owner: PartyId,
    fee_rate_percent: Arc<RwLock<u8>>,
    ledger: Ledger,
}

impl OwnerAdmin {
    /// Create an owner handle with the given initial fee rate (0-100).
    pub fn new(owner: PartyId, fee_rate_percent: u8, ledger: Ledger) -> Result<Self> {
        if fee_rate_percent > 100 {
            return Err(EscrowError::InvalidArgument {
                message: format!("fee rate {fee_rate_percent} out of range 0-100"),
            });
        }
        Ok(Self {
            owner,
            fee_rate_percent: Arc::new(RwLock::new(fee_rate_percent)),
            ledger,
        })
    }

    pub fn owner(&self) -> &PartyId {
        &self.owner
    }

    /// The fee rate currently in effect, as an integer percentage.
    pub async fn fee_rate_percent(&self) -> u8 {
        *self.fee_rate_percent.read().await
    }

    /// Change the fee rate. Owner only; applies to agreements created from
    /// now on, never to fees already captured.
    pub async fn set_fee_rate_percent(&self, caller: &PartyId, rate: u8) -> Result<()> {
        if caller != &self.owner {
            return Err(EscrowError::Unauthorized {
                party: caller.to_string(),
            });
        }
        if rate > 100 {
            return Err(EscrowError::InvalidArgument {
                message: format!("fee rate {rate} out of range 0-100"),
            });
        }
        *self.fee_rate_percent.write().await = rate;
        Ok(())
    }

    /// Drain the accumulated service fee balance. Owner only.
    pub async fn withdraw_service_balance(&self, caller: &PartyId) -> Result<Amount> {
        if caller != &self.owner {
            return Err(EscrowError::Unauthorized {
                party: caller.to_string(),
            });
        }
        self.ledger.withdraw(&PartyId::service()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripact_ledger::EntryReason;
    use tripact_types::AgreementId;

    fn admin(rate: u8) -> OwnerAdmin {
        OwnerAdmin::new(PartyId::from_string("owner"), rate, Ledger::new()).unwrap()
    }

    #[tokio::test]
    async fn test_fee_rate_bounds() {
        assert!(
            OwnerAdmin::new(PartyId::from_string("owner"), 101, Ledger::new()).is_err()
        );

        let admin = admin(1);
        assert_eq!(admin.fee_rate_percent().await, 1);

        let owner = PartyId::from_string("owner");
        admin.set_fee_rate_percent(&owner, 100).await.unwrap();
        assert_eq!(admin.fee_rate_percent().await, 100);

        assert!(matches!(
            admin.set_fee_rate_percent(&owner, 101).await,
            Err(EscrowError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_only_owner_sets_fee_rate() {
        let admin = admin(1);
        let result = admin
            .set_fee_rate_percent(&PartyId::from_string("mallory"), 50)
            .await;

        assert!(matches!(result, Err(EscrowError::Unauthorized { .. })));
        assert_eq!(admin.fee_rate_percent().await, 1);
    }

    #[tokio::test]
    async fn test_service_withdrawal_gated_to_owner() {
        let ledger = Ledger::new();
        let admin =
            OwnerAdmin::new(PartyId::from_string("owner"), 1, ledger.clone()).unwrap();

        ledger
            .credit(
                &PartyId::service(),
                Amount::new(7),
                EntryReason::ServiceFee {
                    agreement: AgreementId(0),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            admin
                .withdraw_service_balance(&PartyId::from_string("mallory"))
                .await,
            Err(EscrowError::Unauthorized { .. })
        ));

        let drained = admin
            .withdraw_service_balance(&PartyId::from_string("owner"))
            .await
            .unwrap();
        assert_eq!(drained, Amount::new(7));
        assert_eq!(ledger.balance(&PartyId::service()).await, Amount::zero());
    }
}
