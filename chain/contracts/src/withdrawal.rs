//! Withdrawal protocol shared by every payout path
//!
//! Every payout in this crate runs the same sequence:
//!
//! ```text
//! acquire guard ──► checks ──► commit effects ──► send ──► release guard
//!      │                                          │
//!      └─ held: ReentrantCall              failed: roll back effects,
//!                                                  TransferFailed
//!                                                  (RollbackFailed if the
//!                                                   rollback cannot apply)
//! ```
//!
//! State is committed before control leaves the contract, so a re-entrant
//! call made from inside `send` observes the post-withdrawal state. A panic
//! raised inside `send` is treated like a failed transfer: effects are
//! rolled back and the guard released before the panic continues.

use custody_types::ids::Address;
use rust_decimal::Decimal;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};

use crate::errors::CustodyError;
use crate::security::GuardSet;
use crate::transfer::ValueTransfer;

/// Contracts that own a [`GuardSet`].
pub(crate) trait Guarded {
    fn guards_mut(&mut self) -> &mut GuardSet;
}

/// Run `body` while holding the guard for `entity`.
///
/// The guard is released after `body` returns on every path, unwinding
/// included; a held guard rejects the call before `body` runs.
pub(crate) fn with_guard<C, T>(
    contract: &mut C,
    entity: impl fmt::Display,
    body: impl FnOnce(&mut C) -> Result<T, CustodyError>,
) -> Result<T, CustodyError>
where
    C: Guarded,
{
    let key = contract.guards_mut().key_for(&entity);
    if !contract.guards_mut().acquire(&key) {
        warn!(%entity, lock = %key, "Rejected reentrant call");
        return Err(CustodyError::ReentrantCall {
            entity: entity.to_string(),
        });
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(contract)));
    contract.guards_mut().release(&key);
    match outcome {
        Ok(result) => result,
        Err(payload) => {
            error!(%entity, lock = %key, "Guarded call panicked; guard released");
            panic::resume_unwind(payload)
        }
    }
}

/// Send `amount` to `to`, undoing committed effects with `rollback` if the
/// transfer fails.
pub(crate) fn settle<C>(
    contract: &mut C,
    rail: &mut dyn ValueTransfer<C>,
    to: &Address,
    amount: Decimal,
    rollback: impl FnOnce(&mut C) -> Result<(), CustodyError>,
) -> Result<(), CustodyError> {
    let sent = panic::catch_unwind(AssertUnwindSafe(|| rail.send(contract, to, amount)));
    let cause = match sent {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(cause)) => cause,
        Err(payload) => {
            if let Err(rollback_err) = rollback(contract) {
                error!(%to, %amount, rollback_error = %rollback_err, "Rollback after panic failed");
            }
            panic::resume_unwind(payload)
        }
    };

    warn!(%to, %amount, error = %cause, "Transfer failed, rolling back");
    match rollback(contract) {
        Ok(()) => Err(CustodyError::TransferFailed(cause)),
        Err(rollback_err) => {
            error!(
                %to,
                %amount,
                transfer_error = %cause,
                rollback_error = %rollback_err,
                "Rollback failed; custody state no longer matches held value"
            );
            Err(CustodyError::RollbackFailed {
                entity: to.to_string(),
                amount,
                cause,
            })
        }
    }
}
