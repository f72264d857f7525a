//! Contract events
//!
//! Events are immutable records appended to a contract's log after the
//! state change they describe has been committed. Each successful operation
//! appends its event exactly once; failed operations append nothing.

use custody_types::ids::{Address, ProjectId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project was registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreated {
    pub id: ProjectId,
    pub creator: Address,
}

/// A contribution was accepted
///
/// `amount` is the accepted part only; a returned remainder is not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFunded {
    pub id: ProjectId,
    pub contributor: Address,
    pub amount: Decimal,
}

/// Raised funds were paid out to the creator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectClosed {
    pub id: ProjectId,
    pub creator: Address,
    pub amount: Decimal,
}

/// Value was placed in custody for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposited {
    pub account: Address,
    pub amount: Decimal,
}

/// Value left custody after a successful transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawn {
    pub withdrawal_id: Uuid,
    pub account: Address,
    pub amount: Decimal,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    ProjectCreated(ProjectCreated),
    ProjectFunded(ProjectFunded),
    ProjectClosed(ProjectClosed),
    Deposited(Deposited),
    Withdrawn(Withdrawn),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_funded_serialization() {
        let creator = Address::new("alice").unwrap();
        let event = ProjectFunded {
            id: ProjectId::derive(&creator, "solar"),
            contributor: Address::new("bob").unwrap(),
            amount: Decimal::new(1, 3), // 0.001
        };
        let json = serde_json::to_string(&event).unwrap();
        let deser: ProjectFunded = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_contract_event_enum_variant() {
        let event = ContractEvent::Withdrawn(Withdrawn {
            withdrawal_id: Uuid::now_v7(),
            account: Address::new("alice").unwrap(),
            amount: Decimal::from(5),
        });
        assert!(matches!(event, ContractEvent::Withdrawn(_)));
    }

    #[test]
    fn test_contract_event_tagged_json() {
        let event = ContractEvent::Deposited(Deposited {
            account: Address::new("alice").unwrap(),
            amount: Decimal::from(5),
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with("{\"Deposited\""));
        let deser: ContractEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }
}
