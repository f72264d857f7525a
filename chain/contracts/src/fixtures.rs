//! Reference fixtures for exercising the withdrawal protocol
//!
//! - [`VulnerableBank`] pays out before it updates balances and has no
//!   guard, so a re-entering recipient can drain it.
//! - [`HoneypotRail`] looks like an ordinary rail but fails every transfer
//!   not addressed to its owner.
//! - [`ReentrantAttacker`] is a recipient hook that calls `withdraw` again
//!   from inside the transfer that pays it.
//!
//! None of these belong in a production deployment.

use custody_types::ids::Address;
use rust_decimal::Decimal;
use std::cell::{Cell, RefCell};
use tracing::{debug, warn};

use crate::errors::{CustodyError, TransferError};
use crate::ledger::Balances;
use crate::transfer::{deliver, Custody, InMemoryRail, Recipient, ValueTransfer, WalletRail};
use crate::withdrawal::settle;

// ───────────────────────── VulnerableBank ─────────────────────────

/// Bank that transfers first and zeroes the balance afterwards.
#[derive(Debug, Default)]
pub struct VulnerableBank {
    balances: Balances,
}

impl VulnerableBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether recorded balances still add up to the value held.
    pub fn is_conserved(&self) -> bool {
        self.balances.is_conserved()
    }
}

impl Custody for VulnerableBank {
    fn deposit(&mut self, from: &Address, amount: Decimal) -> Result<(), CustodyError> {
        if amount < Decimal::ZERO {
            return Err(CustodyError::invalid("deposit amount must not be negative"));
        }
        if !amount.is_zero() {
            self.balances.credit(from, amount)?;
        }
        Ok(())
    }

    fn withdraw(
        &mut self,
        caller: &Address,
        rail: &mut dyn ValueTransfer<Self>,
    ) -> Result<Decimal, CustodyError> {
        let amount = self.balances.balance_of(caller);
        if amount <= Decimal::ZERO {
            return Err(CustodyError::NothingToWithdraw {
                account: caller.clone(),
            });
        }
        let available = self.balances.total_held();
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                required: amount,
                available,
            }
            .into());
        }

        // Only the held value moves before the transfer; the recorded
        // balance is still `amount` if the recipient calls back in.
        self.balances.debit_held(amount)?;
        settle(self, rail, caller, amount, |bank| bank.balances.restore_held(amount))?;
        self.balances.zero_account(caller);

        debug!(account = %caller, %amount, "Vulnerable withdrawal paid");
        Ok(amount)
    }

    fn balance_of(&self, account: &Address) -> Decimal {
        self.balances.balance_of(account)
    }

    fn total_held(&self) -> Decimal {
        self.balances.total_held()
    }
}

// ───────────────────────── HoneypotRail ─────────────────────────

/// Rail wrapper that only ever pays `owner`.
///
/// Every other transfer fails with "Transfer failed", so whoever tries to
/// withdraw (attacker or honest depositor) has their withdrawal rolled back.
/// Hooks are handed the honeypot itself, so a transfer started from inside
/// the owner's hook is checked the same way.
#[derive(Debug)]
pub struct HoneypotRail<P> {
    owner: Address,
    inner: InMemoryRail<P>,
}

impl<P> HoneypotRail<P> {
    pub fn new(owner: Address, inner: InMemoryRail<P>) -> Self {
        Self { owner, inner }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn inner(&self) -> &InMemoryRail<P> {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut InMemoryRail<P> {
        &mut self.inner
    }
}

impl<P> WalletRail<P> for HoneypotRail<P> {
    fn wallets_mut(&mut self) -> &mut InMemoryRail<P> {
        &mut self.inner
    }
}

impl<P> ValueTransfer<P> for HoneypotRail<P> {
    fn send(&mut self, payer: &mut P, to: &Address, amount: Decimal) -> Result<(), TransferError> {
        if to != &self.owner {
            warn!(%to, %amount, "Honeypot refused transfer");
            return Err(TransferError::Rejected {
                to: to.clone(),
                reason: "Transfer failed".to_string(),
            });
        }
        deliver(self, payer, to, amount)
    }
}

// ───────────────────────── ReentrantAttacker ─────────────────────────

/// Recipient hook that re-enters `withdraw` while the victim still holds
/// at least `stake`.
///
/// Errors from nested calls are recorded and swallowed so the outer
/// transfer completes; inspect them with [`ReentrantAttacker::errors`].
#[derive(Debug)]
pub struct ReentrantAttacker {
    address: Address,
    stake: Decimal,
    max_reentries: u32,
    reentries: Cell<u32>,
    received: Cell<Decimal>,
    errors: RefCell<Vec<CustodyError>>,
}

impl ReentrantAttacker {
    pub fn new(address: Address, stake: Decimal, max_reentries: u32) -> Self {
        Self {
            address,
            stake,
            max_reentries,
            reentries: Cell::new(0),
            received: Cell::new(Decimal::ZERO),
            errors: RefCell::new(Vec::new()),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn stake(&self) -> Decimal {
        self.stake
    }

    /// Deposit the stake into `custody` and withdraw it, re-entering from
    /// the payment hook if the hook is registered on `rail`.
    pub fn attack<C: Custody>(
        &self,
        custody: &mut C,
        rail: &mut dyn ValueTransfer<C>,
    ) -> Result<Decimal, CustodyError> {
        custody.deposit(&self.address, self.stake)?;
        custody.withdraw(&self.address, rail)?;
        Ok(self.received())
    }

    /// Nested withdrawals attempted so far.
    pub fn reentries(&self) -> u32 {
        self.reentries.get()
    }

    /// Total value delivered to the attacker, nested payments included.
    pub fn received(&self) -> Decimal {
        self.received.get()
    }

    /// Errors returned by nested withdrawals.
    pub fn errors(&self) -> Vec<CustodyError> {
        self.errors.borrow().clone()
    }
}

impl<P: Custody> Recipient<P> for ReentrantAttacker {
    fn on_receive(
        &self,
        payer: &mut P,
        rail: &mut dyn ValueTransfer<P>,
        me: &Address,
        amount: Decimal,
    ) -> Result<(), TransferError> {
        // Saturates instead of failing the transfer.
        self.received
            .set(self.received.get().checked_add(amount).unwrap_or(Decimal::MAX));

        if self.reentries.get() >= self.max_reentries || payer.total_held() < self.stake {
            return Ok(());
        }
        self.reentries.set(self.reentries.get() + 1);

        if let Err(err) = payer.withdraw(me, rail) {
            debug!(attacker = %me, error = %err, "Nested withdrawal failed");
            self.errors.borrow_mut().push(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::InMemoryRail;
    use std::rc::Rc;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_vulnerable_bank_honest_withdrawal() {
        let mut bank = VulnerableBank::new();
        let mut rail = InMemoryRail::<VulnerableBank>::new();
        let alice = Address::new("alice").unwrap();
        bank.deposit(&alice, dec(5)).unwrap();

        assert_eq!(bank.withdraw(&alice, &mut rail).unwrap(), dec(5));
        assert_eq!(bank.balance_of(&alice), Decimal::ZERO);
        assert_eq!(bank.total_held(), Decimal::ZERO);
        assert!(bank.is_conserved());
    }

    #[test]
    fn test_vulnerable_bank_is_drained() {
        let mut bank = VulnerableBank::new();
        let mut rail = InMemoryRail::<VulnerableBank>::new();
        bank.deposit(&Address::new("victim").unwrap(), dec(5)).unwrap();

        let mallory = Address::new("mallory").unwrap();
        let attacker = Rc::new(ReentrantAttacker::new(mallory, dec(1), 10));
        rail.register_recipient(attacker.address().clone(), attacker.clone());

        assert_eq!(attacker.attack(&mut bank, &mut rail).unwrap(), dec(6));
        assert_eq!(rail.wallet_of(attacker.address()), dec(6));
        assert_eq!(bank.total_held(), Decimal::ZERO);
        assert!(!bank.is_conserved());
    }

    #[test]
    fn test_honeypot_pays_owner_only() {
        let owner = Address::new("owner").unwrap();
        let mut rail = HoneypotRail::new(owner.clone(), InMemoryRail::<VulnerableBank>::new());
        let mut bank = VulnerableBank::new();
        let mallory = Address::new("mallory").unwrap();
        bank.deposit(&owner, dec(3)).unwrap();
        bank.deposit(&mallory, dec(1)).unwrap();

        let result = bank.withdraw(&mallory, &mut rail);
        assert!(matches!(
            result,
            Err(CustodyError::TransferFailed(TransferError::Rejected { ref reason, .. }))
                if reason == "Transfer failed"
        ));
        assert_eq!(bank.balance_of(&mallory), dec(1));
        assert_eq!(bank.total_held(), dec(4));

        assert_eq!(bank.withdraw(&owner, &mut rail).unwrap(), dec(3));
        assert_eq!(rail.inner().wallet_of(&owner), dec(3));
    }

    #[test]
    fn test_attacker_respects_reentry_limit() {
        let mut bank = VulnerableBank::new();
        let mut rail = InMemoryRail::<VulnerableBank>::new();
        bank.deposit(&Address::new("victim").unwrap(), dec(10)).unwrap();

        let mallory = Address::new("mallory").unwrap();
        let attacker = Rc::new(ReentrantAttacker::new(mallory, dec(2), 1));
        rail.register_recipient(attacker.address().clone(), attacker.clone());

        assert_eq!(attacker.attack(&mut bank, &mut rail).unwrap(), dec(4));
        assert_eq!(attacker.reentries(), 1);
        assert!(attacker.errors().is_empty());
    }

    /// Owner hook that forwards whatever it receives to `to`.
    struct Forward {
        to: Address,
        outcome: RefCell<Option<Result<(), TransferError>>>,
    }

    impl Recipient<VulnerableBank> for Forward {
        fn on_receive(
            &self,
            payer: &mut VulnerableBank,
            rail: &mut dyn ValueTransfer<VulnerableBank>,
            _me: &Address,
            amount: Decimal,
        ) -> Result<(), TransferError> {
            *self.outcome.borrow_mut() = Some(rail.send(payer, &self.to, amount));
            Ok(())
        }
    }

    #[test]
    fn test_honeypot_checks_sends_from_owner_hook() {
        let owner = Address::new("owner").unwrap();
        let mallory = Address::new("mallory").unwrap();
        let mut rail = HoneypotRail::new(owner.clone(), InMemoryRail::<VulnerableBank>::new());
        let hook = Rc::new(Forward {
            to: mallory.clone(),
            outcome: RefCell::new(None),
        });
        rail.inner_mut().register_recipient(owner.clone(), hook.clone());
        let mut bank = VulnerableBank::new();
        bank.deposit(&owner, dec(3)).unwrap();

        assert_eq!(bank.withdraw(&owner, &mut rail).unwrap(), dec(3));
        assert!(matches!(
            *hook.outcome.borrow(),
            Some(Err(TransferError::Rejected { ref reason, .. })) if reason == "Transfer failed"
        ));
        assert_eq!(rail.inner().wallet_of(&mallory), Decimal::ZERO);
        assert_eq!(rail.inner().wallet_of(&owner), dec(3));
        assert_eq!(rail.inner().transfer_count(), 1);
    }
}
