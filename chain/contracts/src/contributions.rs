//! Contribution accounting
//!
//! Tracks the cumulative amount each contributor put into each project and
//! the running total per project. The configured [`OverfundingPolicy`]
//! decides what happens to value that would push a project past its goal.

use custody_types::ids::{Address, ProjectId};
use custody_types::project::ProjectStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::OverfundingPolicy;
use crate::errors::CustodyError;
use crate::registry::ProjectRegistry;

/// Outcome of an accepted contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionReceipt {
    pub project_id: ProjectId,
    pub contributor: Address,
    /// Part of the attached value credited to the project
    pub accepted: Decimal,
    /// Part of the attached value not taken (only under `cap_at_goal`)
    pub returned: Decimal,
    /// Project total after this contribution
    pub total_raised: Decimal,
    /// Project status after this contribution
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ContributionLedger {
    policy: OverfundingPolicy,
    /// project -> contributor -> cumulative accepted amount
    contributions: HashMap<ProjectId, HashMap<Address, Decimal>>,
    /// project -> total accepted
    raised: HashMap<ProjectId, Decimal>,
}

impl ContributionLedger {
    pub fn new(policy: OverfundingPolicy) -> Self {
        Self {
            policy,
            contributions: HashMap::new(),
            raised: HashMap::new(),
        }
    }

    pub fn policy(&self) -> OverfundingPolicy {
        self.policy
    }

    /// Credit `amount` from `contributor` to `project_id`.
    ///
    /// Every sum is computed before anything is written, so a failed
    /// contribution leaves both maps and the registry unchanged.
    pub fn contribute(
        &mut self,
        registry: &mut ProjectRegistry,
        project_id: &ProjectId,
        contributor: &Address,
        amount: Decimal,
    ) -> Result<ContributionReceipt, CustodyError> {
        let project = registry.get_project(project_id)?;
        if amount <= Decimal::ZERO {
            return Err(CustodyError::invalid("contribution must be positive"));
        }
        if project.status.is_terminal() {
            return Err(CustodyError::ProjectClosed { id: *project_id });
        }

        let remaining = project.remaining();
        let accepted = match self.policy {
            OverfundingPolicy::AcceptAll => amount,
            OverfundingPolicy::CapAtGoal => {
                if remaining.is_zero() {
                    return Err(CustodyError::GoalReached { id: *project_id });
                }
                amount.min(remaining)
            }
            OverfundingPolicy::RejectExcess => {
                if amount > remaining {
                    return Err(CustodyError::GoalExceeded {
                        id: *project_id,
                        remaining,
                    });
                }
                amount
            }
        };

        let total_raised = self
            .total_raised(project_id)
            .checked_add(accepted)
            .ok_or(CustodyError::Overflow)?;
        let contributed = self
            .contribution_of(project_id, contributor)
            .checked_add(accepted)
            .ok_or(CustodyError::Overflow)?;
        let reaches_goal =
            project.status == ProjectStatus::Active && total_raised >= project.funding_goal;

        // Commit
        self.contributions
            .entry(*project_id)
            .or_default()
            .insert(contributor.clone(), contributed);
        self.raised.insert(*project_id, total_raised);
        registry.get_mut(project_id)?.total_raised = total_raised;
        if reaches_goal {
            registry.mark_funded(project_id)?;
        }

        let status = registry.get_project(project_id)?.status;
        debug!(
            project = %project_id,
            %contributor,
            %accepted,
            returned = %(amount - accepted),
            %total_raised,
            %status,
            "Contribution recorded"
        );
        Ok(ContributionReceipt {
            project_id: *project_id,
            contributor: contributor.clone(),
            accepted,
            returned: amount - accepted,
            total_raised,
            status,
        })
    }

    /// Cumulative amount `contributor` has put into `project_id`.
    pub fn contribution_of(&self, project_id: &ProjectId, contributor: &Address) -> Decimal {
        self.contributions
            .get(project_id)
            .and_then(|by_contributor| by_contributor.get(contributor))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_raised(&self, project_id: &ProjectId) -> Decimal {
        self.raised.get(project_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Contributors to `project_id` with their amounts, ordered by address.
    pub fn contributors(&self, project_id: &ProjectId) -> Vec<(Address, Decimal)> {
        let mut list: Vec<(Address, Decimal)> = self
            .contributions
            .get(project_id)
            .map(|m| m.iter().map(|(a, d)| (a.clone(), *d)).collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        list
    }

    /// Whether every project total equals the sum of its contributions and
    /// matches the registry's copy.
    pub fn is_conserved(&self, registry: &ProjectRegistry) -> bool {
        registry.iter().all(|project| {
            let sum = self
                .contributions
                .get(&project.id)
                .map_or(Some(Decimal::ZERO), |m| {
                    m.values()
                        .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(*d))
                });
            let total = self.total_raised(&project.id);
            sum == Some(total) && total == project.total_raised
        })
    }
}
