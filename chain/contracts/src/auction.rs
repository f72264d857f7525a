//! Open auction with withdrawable refunds
//!
//! Bids accumulate per bidder; whoever has the largest stake leads. Bidders
//! that have been outbid pull their stake back with [`Auction::refund`],
//! which follows the same guarded protocol as [`crate::ledger::AccountLedger`].

use custody_types::ids::Address;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CustodyConfig;
use crate::errors::CustodyError;
use crate::events::{ContractEvent, Deposited, Withdrawn};
use crate::ledger::Balances;
use crate::security::GuardSet;
use crate::transfer::{Custody, ValueTransfer};
use crate::withdrawal::{settle, with_guard, Guarded};

#[derive(Debug)]
pub struct Auction {
    stakes: Balances,
    leader: Option<Address>,
    guards: GuardSet,
    events: Vec<ContractEvent>,
}

impl Auction {
    pub fn new(config: CustodyConfig) -> Self {
        Self {
            stakes: Balances::new(),
            leader: None,
            guards: GuardSet::new(config.guard_scope),
            events: Vec::new(),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(CustodyConfig::default())
    }

    /// Add `amount` to the bidder's stake.
    ///
    /// The bidder takes the lead only by strictly exceeding the current
    /// highest stake.
    pub fn bid(&mut self, bidder: &Address, amount: Decimal) -> Result<(), CustodyError> {
        if amount <= Decimal::ZERO {
            return Err(CustodyError::invalid("bid must be positive"));
        }

        let highest = self.highest_bid();
        let stake = self.stakes.credit(bidder, amount)?;
        if stake > highest {
            self.leader = Some(bidder.clone());
        }

        debug!(%bidder, %amount, %stake, leader = ?self.leader, "Bid placed");
        self.events.push(ContractEvent::Deposited(Deposited {
            account: bidder.clone(),
            amount,
        }));
        Ok(())
    }

    /// Return an outbid bidder's whole stake through `rail`.
    pub fn refund(
        &mut self,
        bidder: &Address,
        rail: &mut dyn ValueTransfer<Self>,
    ) -> Result<Decimal, CustodyError> {
        with_guard(self, bidder, |auction| {
            if auction.leader.as_ref() == Some(bidder) {
                return Err(CustodyError::LeaderCannotRefund {
                    bidder: bidder.clone(),
                });
            }
            let amount = auction.stakes.balance_of(bidder);
            if amount <= Decimal::ZERO {
                return Err(CustodyError::NothingToWithdraw {
                    account: bidder.clone(),
                });
            }

            auction.stakes.take_all(bidder)?;
            settle(auction, rail, bidder, amount, |auction| {
                auction.stakes.credit(bidder, amount).map(|_| ())
            })?;

            let withdrawal_id = Uuid::now_v7();
            info!(%bidder, %amount, %withdrawal_id, "Bid refunded");
            auction.events.push(ContractEvent::Withdrawn(Withdrawn {
                withdrawal_id,
                account: bidder.clone(),
                amount,
            }));
            Ok(amount)
        })
    }

    pub fn highest_bidder(&self) -> Option<&Address> {
        self.leader.as_ref()
    }

    /// Stake of the current leader (zero before the first bid).
    pub fn highest_bid(&self) -> Decimal {
        self.leader
            .as_ref()
            .map_or(Decimal::ZERO, |leader| self.stakes.balance_of(leader))
    }

    pub fn stake_of(&self, bidder: &Address) -> Decimal {
        self.stakes.balance_of(bidder)
    }

    pub fn total_held(&self) -> Decimal {
        self.stakes.total_held()
    }

    pub fn is_conserved(&self) -> bool {
        self.stakes.is_conserved()
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for Auction {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl Guarded for Auction {
    fn guards_mut(&mut self) -> &mut GuardSet {
        &mut self.guards
    }
}

impl Custody for Auction {
    fn deposit(&mut self, from: &Address, amount: Decimal) -> Result<(), CustodyError> {
        self.bid(from, amount)
    }

    fn withdraw(
        &mut self,
        caller: &Address,
        rail: &mut dyn ValueTransfer<Self>,
    ) -> Result<Decimal, CustodyError> {
        self.refund(caller, rail)
    }

    fn balance_of(&self, account: &Address) -> Decimal {
        self.stake_of(account)
    }

    fn total_held(&self) -> Decimal {
        Auction::total_held(self)
    }
}
