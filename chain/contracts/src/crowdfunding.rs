//! Crowdfunding contract
//!
//! Ties the project registry and the contribution ledger together behind a
//! single handle, keeps the event log and adds the creator payout.
//!
//! ```text
//! create_project ──► contribute* ──► (goal reached: Funded) ──► claim_funds ──► Closed
//! ```

use custody_types::ids::{Address, ProjectId};
use custody_types::project::{Project, ProjectStatus};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::info;

use crate::config::CustodyConfig;
use crate::contributions::{ContributionLedger, ContributionReceipt};
use crate::errors::CustodyError;
use crate::events::{ContractEvent, ProjectClosed, ProjectCreated, ProjectFunded};
use crate::registry::ProjectRegistry;
use crate::security::GuardSet;
use crate::transfer::ValueTransfer;
use crate::withdrawal::{settle, with_guard, Guarded};

#[derive(Debug)]
pub struct Crowdfunding {
    config: CustodyConfig,
    registry: ProjectRegistry,
    ledger: ContributionLedger,
    guards: GuardSet,
    /// project -> amount paid to its creator
    payouts: HashMap<ProjectId, Decimal>,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl Crowdfunding {
    pub fn new(config: CustodyConfig) -> Self {
        Self {
            config,
            registry: ProjectRegistry::new(),
            ledger: ContributionLedger::new(config.overfunding),
            guards: GuardSet::new(config.guard_scope),
            payouts: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(CustodyConfig::default())
    }

    pub fn config(&self) -> &CustodyConfig {
        &self.config
    }

    // ───────────────────────── Projects ─────────────────────────

    /// Register a project and emit `ProjectCreated`.
    pub fn create_project(
        &mut self,
        creator: &Address,
        name: &str,
        description: &str,
        funding_goal: Decimal,
    ) -> Result<ProjectId, CustodyError> {
        let id = self
            .registry
            .create_project(creator, name, description, funding_goal)?;

        info!(project = %id, %creator, name, %funding_goal, "Project created");
        self.events.push(ContractEvent::ProjectCreated(ProjectCreated {
            id,
            creator: creator.clone(),
        }));
        Ok(id)
    }

    /// Snapshot of the project.
    pub fn get_project(&self, id: &ProjectId) -> Result<Project, CustodyError> {
        self.registry.get_project(id).cloned()
    }

    pub fn project_at(&self, index: usize) -> Option<Project> {
        self.registry.project_at(index).cloned()
    }

    pub fn project_count(&self) -> usize {
        self.registry.len()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.registry.iter()
    }

    // ───────────────────────── Contributions ─────────────────────────

    /// Contribute `amount` to a project and emit `ProjectFunded` with the
    /// accepted part.
    pub fn contribute(
        &mut self,
        project_id: &ProjectId,
        contributor: &Address,
        amount: Decimal,
    ) -> Result<ContributionReceipt, CustodyError> {
        let receipt = self
            .ledger
            .contribute(&mut self.registry, project_id, contributor, amount)?;

        self.events.push(ContractEvent::ProjectFunded(ProjectFunded {
            id: *project_id,
            contributor: contributor.clone(),
            amount: receipt.accepted,
        }));
        Ok(receipt)
    }

    pub fn contribution_of(&self, project_id: &ProjectId, contributor: &Address) -> Decimal {
        self.ledger.contribution_of(project_id, contributor)
    }

    pub fn total_raised(&self, project_id: &ProjectId) -> Decimal {
        self.ledger.total_raised(project_id)
    }

    pub fn contributors(&self, project_id: &ProjectId) -> Vec<(Address, Decimal)> {
        self.ledger.contributors(project_id)
    }

    // ───────────────────────── Payout ─────────────────────────

    /// Pay everything raised for a funded project to its creator.
    ///
    /// The project is marked Closed before the transfer and reopened as
    /// Funded if the transfer fails.
    pub fn claim_funds(
        &mut self,
        project_id: &ProjectId,
        caller: &Address,
        rail: &mut dyn ValueTransfer<Self>,
    ) -> Result<Decimal, CustodyError> {
        with_guard(self, project_id, |cf| {
            let project = cf.registry.get_project(project_id)?;
            if &project.creator != caller {
                return Err(CustodyError::Unauthorized {
                    caller: caller.clone(),
                });
            }
            match project.status {
                ProjectStatus::Active => return Err(CustodyError::NotFunded { id: *project_id }),
                ProjectStatus::Closed => {
                    return Err(CustodyError::ProjectClosed { id: *project_id })
                }
                ProjectStatus::Funded => {}
            }
            let amount = project.total_raised;

            cf.registry.mark_closed(project_id)?;
            cf.payouts.insert(*project_id, amount);
            settle(cf, rail, caller, amount, |cf| {
                cf.payouts.remove(project_id);
                cf.registry.reopen_funded(project_id)
            })?;

            info!(project = %project_id, creator = %caller, %amount, "Funds paid to creator");
            cf.events.push(ContractEvent::ProjectClosed(ProjectClosed {
                id: *project_id,
                creator: caller.clone(),
                amount,
            }));
            Ok(amount)
        })
    }

    /// Amount paid out for `project_id` (zero until claimed).
    pub fn paid_out(&self, project_id: &ProjectId) -> Decimal {
        self.payouts.get(project_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Value still in custody: everything raised minus everything paid out.
    pub fn held_value(&self) -> Result<Decimal, CustodyError> {
        self.registry.iter().try_fold(Decimal::ZERO, |acc, project| {
            project
                .total_raised
                .checked_sub(self.paid_out(&project.id))
                .and_then(|unpaid| acc.checked_add(unpaid))
                .ok_or(CustodyError::Overflow)
        })
    }

    /// Whether contribution totals agree with the registry.
    pub fn is_conserved(&self) -> bool {
        self.ledger.is_conserved(&self.registry)
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Take all events emitted so far, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for Crowdfunding {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl Guarded for Crowdfunding {
    fn guards_mut(&mut self) -> &mut GuardSet {
        &mut self.guards
    }
}
