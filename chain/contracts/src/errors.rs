//! Contract-specific error types
//!
//! Error taxonomy for registry, contribution, withdrawal and transfer
//! operations. Every failure is returned to the caller; nothing is retried.

use custody_types::ids::{Address, ProjectId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Outbound value transfer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("Transfer to {to} rejected: {reason}")]
    Rejected { to: Address, reason: String },

    #[error("Insufficient funds for transfer: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Recipient {to} reverted: {reason}")]
    RecipientReverted { to: Address, reason: String },
}

/// Custody operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CustodyError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Project already exists: {id}")]
    ProjectAlreadyExists { id: ProjectId },

    #[error("Project not found: {id}")]
    NotFound { id: ProjectId },

    #[error("Project closed: {id}")]
    ProjectClosed { id: ProjectId },

    #[error("Funding goal already reached: {id}")]
    GoalReached { id: ProjectId },

    #[error("Contribution exceeds funding goal of {id}: {remaining} remaining")]
    GoalExceeded { id: ProjectId, remaining: Decimal },

    #[error("Project not funded yet: {id}")]
    NotFunded { id: ProjectId },

    #[error("Unauthorized: {caller} may not perform this operation")]
    Unauthorized { caller: Address },

    #[error("Reentrant call rejected for {entity}")]
    ReentrantCall { entity: String },

    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("Nothing to withdraw for {account}")]
    NothingToWithdraw { account: Address },

    #[error("Leading bidder {bidder} cannot withdraw a refund")]
    LeaderCannotRefund { bidder: Address },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,

    #[error("Rollback of {amount} for {entity} failed after transfer error: {cause}")]
    RollbackFailed {
        entity: String,
        amount: Decimal,
        cause: TransferError,
    },
}

impl CustodyError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CustodyError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// True when custody state may no longer match held value.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CustodyError::RollbackFailed { .. })
    }
}

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Env { key: String, value: String },

    #[error("Invalid config JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custody_error_display() {
        let err = CustodyError::NothingToWithdraw {
            account: Address::new("alice").unwrap(),
        };
        assert_eq!(err.to_string(), "Nothing to withdraw for alice");
    }

    #[test]
    fn test_already_exists_carries_id() {
        let id = ProjectId::derive(&Address::new("alice").unwrap(), "solar");
        let err = CustodyError::ProjectAlreadyExists { id };
        assert!(err.to_string().contains(&id.to_hex()));
    }

    #[test]
    fn test_custody_error_from_transfer() {
        let transfer_err = TransferError::InsufficientFunds {
            required: Decimal::from(5),
            available: Decimal::from(1),
        };
        let custody_err: CustodyError = transfer_err.into();
        assert!(matches!(custody_err, CustodyError::TransferFailed(_)));
        assert!(!custody_err.is_fatal());
    }

    #[test]
    fn test_rollback_failed_is_fatal() {
        let err = CustodyError::RollbackFailed {
            entity: "alice".to_string(),
            amount: Decimal::from(5),
            cause: TransferError::Rejected {
                to: Address::new("alice").unwrap(),
                reason: "honeypot".to_string(),
            },
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_config_error_from_json() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ConfigError = json_err.into();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
