//! Project registry
//!
//! Owns every project ever created, keyed by its derived id and kept in
//! creation order. Projects are never removed.

use custody_types::ids::{Address, ProjectId};
use custody_types::project::{Project, ProjectStatus};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::errors::CustodyError;

#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: HashMap<ProjectId, Project>,
    /// Ids in creation order
    order: Vec<ProjectId>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new Active project.
    ///
    /// The same creator reusing a name yields `ProjectAlreadyExists` and
    /// leaves the stored project untouched.
    pub fn create_project(
        &mut self,
        creator: &Address,
        name: &str,
        description: &str,
        funding_goal: Decimal,
    ) -> Result<ProjectId, CustodyError> {
        if name.trim().is_empty() {
            return Err(CustodyError::invalid("project name must not be empty"));
        }
        if description.trim().is_empty() {
            return Err(CustodyError::invalid("project description must not be empty"));
        }
        if funding_goal <= Decimal::ZERO {
            return Err(CustodyError::invalid("funding goal must be positive"));
        }

        let id = ProjectId::derive(creator, name);
        if self.projects.contains_key(&id) {
            return Err(CustodyError::ProjectAlreadyExists { id });
        }

        let project = Project {
            id,
            creator: creator.clone(),
            name: name.to_string(),
            description: description.to_string(),
            funding_goal,
            total_raised: Decimal::ZERO,
            status: ProjectStatus::Active,
            index: self.order.len(),
        };
        self.projects.insert(id, project);
        self.order.push(id);
        Ok(id)
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<&Project, CustodyError> {
        self.projects
            .get(id)
            .ok_or(CustodyError::NotFound { id: *id })
    }

    /// Project created at position `index`, if any.
    pub fn project_at(&self, index: usize) -> Option<&Project> {
        self.order.get(index).and_then(|id| self.projects.get(id))
    }

    pub fn contains(&self, id: &ProjectId) -> bool {
        self.projects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Projects in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.order.iter().filter_map(|id| self.projects.get(id))
    }

    pub(crate) fn get_mut(&mut self, id: &ProjectId) -> Result<&mut Project, CustodyError> {
        self.projects
            .get_mut(id)
            .ok_or(CustodyError::NotFound { id: *id })
    }

    /// Move `id` forward to `next`. Illegal transitions are rejected.
    pub(crate) fn transition(
        &mut self,
        id: &ProjectId,
        next: ProjectStatus,
    ) -> Result<(), CustodyError> {
        let project = self.get_mut(id)?;
        if !project.status.can_transition_to(next) {
            return Err(match project.status {
                ProjectStatus::Closed => CustodyError::ProjectClosed { id: *id },
                ProjectStatus::Active => CustodyError::NotFunded { id: *id },
                ProjectStatus::Funded => {
                    CustodyError::invalid(format!("project {id} cannot move from funded to {next}"))
                }
            });
        }
        project.status = next;
        Ok(())
    }

    pub(crate) fn mark_funded(&mut self, id: &ProjectId) -> Result<(), CustodyError> {
        self.transition(id, ProjectStatus::Funded)
    }

    pub(crate) fn mark_closed(&mut self, id: &ProjectId) -> Result<(), CustodyError> {
        self.transition(id, ProjectStatus::Closed)
    }

    /// Undo a `mark_closed` whose payout failed.
    pub(crate) fn reopen_funded(&mut self, id: &ProjectId) -> Result<(), CustodyError> {
        let project = self.get_mut(id)?;
        if project.status != ProjectStatus::Closed {
            return Err(CustodyError::invalid(format!(
                "project {id} is {} and cannot be reopened",
                project.status
            )));
        }
        project.status = ProjectStatus::Funded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_create_and_get() {
        let mut registry = ProjectRegistry::new();
        let alice = Address::new("alice").unwrap();
        let id = registry
            .create_project(&alice, "solar", "panels", goal(100))
            .unwrap();

        let project = registry.get_project(&id).unwrap();
        assert_eq!(project.creator, alice);
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.total_raised, Decimal::ZERO);
        assert_eq!(project.index, 0);
        assert_eq!(id, ProjectId::derive(&alice, "solar"));
    }

    #[test]
    fn test_duplicate_rejected_and_original_kept() {
        let mut registry = ProjectRegistry::new();
        let alice = Address::new("alice").unwrap();
        let id = registry
            .create_project(&alice, "solar", "panels", goal(100))
            .unwrap();

        let result = registry.create_project(&alice, "solar", "other text", goal(5));
        assert_eq!(result, Err(CustodyError::ProjectAlreadyExists { id }));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_project(&id).unwrap().funding_goal, goal(100));
    }

    #[test]
    fn test_same_name_different_creator() {
        let mut registry = ProjectRegistry::new();
        let a = registry
            .create_project(&Address::new("alice").unwrap(), "solar", "panels", goal(1))
            .unwrap();
        let b = registry
            .create_project(&Address::new("bob").unwrap(), "solar", "panels", goal(1))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.project_at(1).unwrap().id, b);
    }

    #[test]
    fn test_validation() {
        let mut registry = ProjectRegistry::new();
        let alice = Address::new("alice").unwrap();
        for (name, description, funding_goal) in [
            ("", "panels", goal(1)),
            ("   ", "panels", goal(1)),
            ("solar", "", goal(1)),
            ("solar", "panels", Decimal::ZERO),
            ("solar", "panels", goal(-3)),
        ] {
            let result = registry.create_project(&alice, name, description, funding_goal);
            assert!(
                matches!(result, Err(CustodyError::InvalidInput { .. })),
                "expected InvalidInput for {name:?}/{description:?}/{funding_goal}"
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_id() {
        let registry = ProjectRegistry::new();
        let id = ProjectId::derive(&Address::new("alice").unwrap(), "ghost");
        assert_eq!(
            registry.get_project(&id).unwrap_err(),
            CustodyError::NotFound { id }
        );
        assert!(registry.project_at(0).is_none());
    }

    #[test]
    fn test_iter_in_creation_order() {
        let mut registry = ProjectRegistry::new();
        let alice = Address::new("alice").unwrap();
        for name in ["c", "a", "b"] {
            registry.create_project(&alice, name, "d", goal(1)).unwrap();
        }
        let names: Vec<&str> = registry.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_transitions() {
        let mut registry = ProjectRegistry::new();
        let id = registry
            .create_project(&Address::new("alice").unwrap(), "solar", "panels", goal(1))
            .unwrap();

        assert_eq!(registry.mark_closed(&id), Err(CustodyError::NotFunded { id }));
        registry.mark_funded(&id).unwrap();
        registry.mark_closed(&id).unwrap();
        assert_eq!(registry.mark_closed(&id), Err(CustodyError::ProjectClosed { id }));

        registry.reopen_funded(&id).unwrap();
        assert_eq!(registry.get_project(&id).unwrap().status, ProjectStatus::Funded);
        assert!(registry.reopen_funded(&id).is_err());
    }
}
