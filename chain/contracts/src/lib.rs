//! Custody contracts
//!
//! Contracts that hold value on behalf of many parties and release it only
//! through a withdrawal path that a re-entering recipient cannot subvert.
//!
//! # Modules
//! - `errors`: Custody, transfer and config error types
//! - `events`: Events appended after each committed state change
//! - `config`: Overfunding policy and guard scope, from JSON or env
//! - `security`: Reentrancy guards
//! - `transfer`: Payment rail seam, recipient hooks, in-memory rail
//! - `withdrawal`: Guarded commit-then-transfer protocol with rollback
//! - `ledger`: Per-account bank
//! - `registry`: Project catalog and lifecycle
//! - `contributions`: Per-project contribution accounting
//! - `crowdfunding`: Crowdfunding contract with creator payout
//! - `auction`: Auction with withdrawable refunds
//! - `fixtures`: Vulnerable bank, honeypot rail and re-entrant attacker

pub mod auction;
pub mod config;
pub mod contributions;
pub mod crowdfunding;
pub mod errors;
pub mod events;
pub mod fixtures;
pub mod ledger;
pub mod registry;
pub mod security;
pub mod transfer;
pub mod withdrawal;

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";

pub mod prelude {
    pub use crate::auction::Auction;
    pub use crate::config::{CustodyConfig, OverfundingPolicy};
    pub use crate::contributions::ContributionReceipt;
    pub use crate::crowdfunding::Crowdfunding;
    pub use crate::errors::{ConfigError, CustodyError, TransferError};
    pub use crate::events::ContractEvent;
    pub use crate::ledger::AccountLedger;
    pub use crate::security::GuardScope;
    pub use crate::transfer::{Custody, InMemoryRail, Recipient, ValueTransfer};
    pub use custody_types::ids::{Address, ProjectId};
    pub use custody_types::project::{Project, ProjectStatus};
}
