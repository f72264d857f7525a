//! Account ledger: per-address custody with a guarded withdrawal path
//!
//! Balances are committed before any outbound transfer and restored if the
//! transfer fails. See [`crate::withdrawal`] for the protocol.

use custody_types::ids::Address;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CustodyConfig;
use crate::errors::CustodyError;
use crate::events::{ContractEvent, Deposited, Withdrawn};
use crate::security::GuardSet;
use crate::transfer::{Custody, ValueTransfer};
use crate::withdrawal::{settle, with_guard, Guarded};

/// Address → amount store with a running total.
///
/// Every public mutation keeps `Σ balances == total_held`.
#[derive(Debug, Clone, Default)]
pub struct Balances {
    accounts: HashMap<Address, Decimal>,
    held: Decimal,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> Decimal {
        self.accounts.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn total_held(&self) -> Decimal {
        self.held
    }

    /// Add `amount` to `account`, returning the new balance.
    ///
    /// Both sums are checked before either is written.
    pub fn credit(&mut self, account: &Address, amount: Decimal) -> Result<Decimal, CustodyError> {
        let balance = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or(CustodyError::Overflow)?;
        let held = self.held.checked_add(amount).ok_or(CustodyError::Overflow)?;

        self.accounts.insert(account.clone(), balance);
        self.held = held;
        Ok(balance)
    }

    /// Zero `account` and remove its balance from the total.
    pub fn take_all(&mut self, account: &Address) -> Result<Decimal, CustodyError> {
        let balance = self.balance_of(account);
        let held = self.held.checked_sub(balance).ok_or(CustodyError::Overflow)?;

        self.accounts.insert(account.clone(), Decimal::ZERO);
        self.held = held;
        Ok(balance)
    }

    /// Whether the per-account balances add up to the running total.
    pub fn is_conserved(&self) -> bool {
        self.accounts
            .values()
            .try_fold(Decimal::ZERO, |acc, b| acc.checked_add(*b))
            .map_or(false, |sum| sum == self.held)
    }

    // Raw halves of `take_all`, used by the transfer-first bank fixture.

    pub(crate) fn debit_held(&mut self, amount: Decimal) -> Result<(), CustodyError> {
        self.held = self.held.checked_sub(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    pub(crate) fn restore_held(&mut self, amount: Decimal) -> Result<(), CustodyError> {
        self.held = self.held.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    pub(crate) fn zero_account(&mut self, account: &Address) {
        self.accounts.insert(account.clone(), Decimal::ZERO);
    }
}

/// Simple bank: anyone deposits, each account withdraws its whole balance.
#[derive(Debug)]
pub struct AccountLedger {
    balances: Balances,
    guards: GuardSet,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl AccountLedger {
    pub fn new(config: CustodyConfig) -> Self {
        Self {
            balances: Balances::new(),
            guards: GuardSet::new(config.guard_scope),
            events: Vec::new(),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(CustodyConfig::default())
    }

    // ───────────────────────── Deposit ─────────────────────────

    /// Credit `amount` to `from`.
    ///
    /// A zero amount is accepted and changes nothing.
    pub fn deposit(&mut self, from: &Address, amount: Decimal) -> Result<(), CustodyError> {
        if amount < Decimal::ZERO {
            return Err(CustodyError::invalid("deposit amount must not be negative"));
        }
        if amount.is_zero() {
            return Ok(());
        }

        let balance = self.balances.credit(from, amount)?;
        debug!(account = %from, %amount, %balance, "Deposit credited");
        self.events.push(ContractEvent::Deposited(Deposited {
            account: from.clone(),
            amount,
        }));
        Ok(())
    }

    // ───────────────────────── Withdraw ─────────────────────────

    /// Pay `caller` their whole balance through `rail`.
    ///
    /// The balance is zeroed before the transfer. A call that re-enters for
    /// the same account while the transfer is in flight fails with
    /// `ReentrantCall`.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        rail: &mut dyn ValueTransfer<Self>,
    ) -> Result<Decimal, CustodyError> {
        with_guard(self, caller, |ledger| {
            let amount = ledger.balances.balance_of(caller);
            if amount <= Decimal::ZERO {
                return Err(CustodyError::NothingToWithdraw {
                    account: caller.clone(),
                });
            }

            ledger.balances.take_all(caller)?;
            settle(ledger, rail, caller, amount, |ledger| {
                ledger.balances.credit(caller, amount).map(|_| ())
            })?;

            let withdrawal_id = Uuid::now_v7();
            info!(account = %caller, %amount, %withdrawal_id, "Withdrawal paid");
            ledger.events.push(ContractEvent::Withdrawn(Withdrawn {
                withdrawal_id,
                account: caller.clone(),
                amount,
            }));
            Ok(amount)
        })
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn balance_of(&self, account: &Address) -> Decimal {
        self.balances.balance_of(account)
    }

    pub fn total_held(&self) -> Decimal {
        self.balances.total_held()
    }

    pub fn is_conserved(&self) -> bool {
        self.balances.is_conserved()
    }

    /// Whether a withdrawal covering `account` is currently in flight.
    pub fn is_withdrawing(&self, account: &Address) -> bool {
        self.guards.is_held(&self.guards.key_for(account))
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Take all events emitted so far, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for AccountLedger {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl Guarded for AccountLedger {
    fn guards_mut(&mut self) -> &mut GuardSet {
        &mut self.guards
    }
}

impl Custody for AccountLedger {
    fn deposit(&mut self, from: &Address, amount: Decimal) -> Result<(), CustodyError> {
        AccountLedger::deposit(self, from, amount)
    }

    fn withdraw(
        &mut self,
        caller: &Address,
        rail: &mut dyn ValueTransfer<Self>,
    ) -> Result<Decimal, CustodyError> {
        AccountLedger::withdraw(self, caller, rail)
    }

    fn balance_of(&self, account: &Address) -> Decimal {
        AccountLedger::balance_of(self, account)
    }

    fn total_held(&self) -> Decimal {
        AccountLedger::total_held(self)
    }
}
