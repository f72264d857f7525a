//! Crowdfunding project types
//!
//! A project moves forward only:
//!
//! ```text
//! Active ──► Funded ──► Closed
//! ```

use crate::ids::{Address, ProjectId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Accepting contributions, goal not yet reached
    Active,
    /// Goal reached
    Funded,
    /// Raised funds paid out to the creator (terminal)
    Closed,
}

impl ProjectStatus {
    /// Whether `self -> next` is a legal forward transition.
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        matches!(
            (self, next),
            (ProjectStatus::Active, ProjectStatus::Funded)
                | (ProjectStatus::Funded, ProjectStatus::Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ProjectStatus::Closed
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Funded => "funded",
            ProjectStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Snapshot of a funding campaign.
///
/// `creator`, `name`, `description` and `funding_goal` never change after
/// creation. `total_raised` only grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub creator: Address,
    pub name: String,
    pub description: String,
    pub funding_goal: Decimal,
    pub total_raised: Decimal,
    pub status: ProjectStatus,
    /// Position in creation order
    pub index: usize,
}

impl Project {
    /// Amount still missing before the goal is reached (zero once reached).
    pub fn remaining(&self) -> Decimal {
        (self.funding_goal - self.total_raised).max(Decimal::ZERO)
    }

    pub fn goal_reached(&self) -> bool {
        self.total_raised >= self.funding_goal
    }
}
