//! Outbound value transfer and re-entrant recipients
//!
//! A [`ValueTransfer`] pays native currency out of a contract. The rail is
//! handed the paying contract itself, so a [`Recipient`] hook registered for
//! the destination can call straight back into it before `send` returns.
//! That call-stack recursion is the only concurrency hazard in this crate.

use custody_types::ids::Address;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::debug;

use crate::errors::{CustodyError, TransferError};

/// Inbound surface of a contract that holds value per account.
///
/// Implemented by every bank-like contract so that attacker hooks can be
/// written once and pointed at any of them.
pub trait Custody: Sized {
    /// Place `amount` in custody for `from`.
    fn deposit(&mut self, from: &Address, amount: Decimal) -> Result<(), CustodyError>;

    /// Pay `caller` everything held for them through `rail`.
    fn withdraw(
        &mut self,
        caller: &Address,
        rail: &mut dyn ValueTransfer<Self>,
    ) -> Result<Decimal, CustodyError>;

    fn balance_of(&self, account: &Address) -> Decimal;

    /// Total value the contract currently holds.
    fn total_held(&self) -> Decimal;
}

/// Payment rail for the native currency.
pub trait ValueTransfer<P> {
    /// Pay `amount` to `to` on behalf of `payer`.
    ///
    /// May synchronously re-enter `payer` before returning.
    fn send(&mut self, payer: &mut P, to: &Address, amount: Decimal) -> Result<(), TransferError>;
}

/// Code that runs when an address receives value.
///
/// Hooks take `&self` so the same hook can be entered recursively; keep
/// any state behind `Cell`/`RefCell`.
pub trait Recipient<P> {
    /// Returning an error makes the enclosing transfer fail.
    fn on_receive(
        &self,
        payer: &mut P,
        rail: &mut dyn ValueTransfer<P>,
        me: &Address,
        amount: Decimal,
    ) -> Result<(), TransferError>;
}

/// In-memory payment rail holding external wallet balances.
///
/// Every successful transfer credits the destination wallet, then runs the
/// destination's hook if one is registered. A failing or panicking hook
/// undoes that credit and fails the transfer.
pub struct InMemoryRail<P> {
    wallets: HashMap<Address, Decimal>,
    hooks: HashMap<Address, Rc<dyn Recipient<P>>>,
    transfer_count: usize,
}

impl<P> InMemoryRail<P> {
    pub fn new() -> Self {
        Self {
            wallets: HashMap::new(),
            hooks: HashMap::new(),
            transfer_count: 0,
        }
    }

    /// Run `hook` whenever `address` receives value.
    pub fn register_recipient(&mut self, address: Address, hook: Rc<dyn Recipient<P>>) {
        self.hooks.insert(address, hook);
    }

    /// Value delivered to `address` so far.
    pub fn wallet_of(&self, address: &Address) -> Decimal {
        self.wallets.get(address).copied().unwrap_or(Decimal::ZERO)
    }

    /// Number of transfers that completed, nested ones included.
    pub fn transfer_count(&self) -> usize {
        self.transfer_count
    }

    fn adjust_wallet(&mut self, to: &Address, delta: Decimal) -> Result<(), TransferError> {
        let wallet = self.wallets.entry(to.clone()).or_insert(Decimal::ZERO);
        *wallet = wallet
            .checked_add(delta)
            .ok_or_else(|| TransferError::Rejected {
                to: to.clone(),
                reason: "wallet balance overflow".to_string(),
            })?;
        Ok(())
    }
}

impl<P> Default for InMemoryRail<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for InMemoryRail<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRail")
            .field("wallets", &self.wallets)
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("transfer_count", &self.transfer_count)
            .finish()
    }
}

/// Rails that keep their wallets in an [`InMemoryRail`].
///
/// Wrappers implement this so that [`deliver`] hands the wrapper, not the
/// wrapped rail, to recipient hooks and nested sends keep its checks.
pub(crate) trait WalletRail<P>: ValueTransfer<P> {
    fn wallets_mut(&mut self) -> &mut InMemoryRail<P>;
}

impl<P> WalletRail<P> for InMemoryRail<P> {
    fn wallets_mut(&mut self) -> &mut InMemoryRail<P> {
        self
    }
}

/// Credit `to`, then run its hook with `rail` as the rail to call back into.
pub(crate) fn deliver<P, R>(
    rail: &mut R,
    payer: &mut P,
    to: &Address,
    amount: Decimal,
) -> Result<(), TransferError>
where
    R: WalletRail<P>,
{
    rail.wallets_mut().adjust_wallet(to, amount)?;
    debug!(%to, %amount, "Value delivered");

    if let Some(hook) = rail.wallets_mut().hooks.get(to).cloned() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            hook.on_receive(payer, &mut *rail, to, amount)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                rail.wallets_mut().adjust_wallet(to, -amount)?;
                return Err(err);
            }
            Err(payload) => {
                // Best effort; the panic is what the caller needs to see.
                let _ = rail.wallets_mut().adjust_wallet(to, -amount);
                panic::resume_unwind(payload);
            }
        }
    }

    rail.wallets_mut().transfer_count += 1;
    Ok(())
}

impl<P> ValueTransfer<P> for InMemoryRail<P> {
    fn send(&mut self, payer: &mut P, to: &Address, amount: Decimal) -> Result<(), TransferError> {
        deliver(self, payer, to, amount)
    }
}
