//! Tenant tree: Platform ⊃ Organization ⊃ Department ⊃ User.
//!
//! A `TenantTree` is a read-only snapshot of organizations and
//! departments. Services build one per call from stored records, either
//! for the whole platform or for just the nodes a decision touches, and
//! share it freely across threads afterwards.

use std::collections::HashMap;

use cohort_core::models::department::Department;
use cohort_core::models::organization::Organization;
use cohort_core::models::role::Role;
use cohort_core::models::user::User;
use uuid::Uuid;

use crate::error::AuthzError;

#[derive(Debug, Clone, Default)]
pub struct TenantTree {
    /// Organization id -> active flag.
    organizations: HashMap<Uuid, bool>,
    /// Department id -> parent organization id.
    departments: HashMap<Uuid, Uuid>,
}

impl TenantTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from records, rejecting departments whose parent is
    /// missing from `organizations`.
    pub fn from_records<'a>(
        organizations: impl IntoIterator<Item = &'a Organization>,
        departments: impl IntoIterator<Item = &'a Department>,
    ) -> Result<Self, AuthzError> {
        let mut tree = Self::new();
        for org in organizations {
            tree.insert_organization(org);
        }
        for dept in departments {
            tree.insert_department(dept)?;
        }
        Ok(tree)
    }

    pub fn insert_organization(&mut self, org: &Organization) {
        self.organizations.insert(org.id, org.active);
    }

    /// Attach a department under its organization.
    ///
    /// Re-inserting a department under a different parent is refused:
    /// departments are never re-parented.
    pub fn insert_department(&mut self, dept: &Department) -> Result<(), AuthzError> {
        if !self.organizations.contains_key(&dept.organization_id) {
            return Err(AuthzError::UnresolvableTarget(format!(
                "department {} references unknown organization {}",
                dept.id, dept.organization_id
            )));
        }
        match self.departments.get(&dept.id) {
            Some(existing) if *existing != dept.organization_id => {
                Err(AuthzError::UnresolvableTarget(format!(
                    "department {} is already attached to organization {existing}",
                    dept.id
                )))
            }
            _ => {
                self.departments.insert(dept.id, dept.organization_id);
                Ok(())
            }
        }
    }

    pub fn contains_organization(&self, organization_id: Uuid) -> bool {
        self.organizations.contains_key(&organization_id)
    }

    pub fn contains_department(&self, department_id: Uuid) -> bool {
        self.departments.contains_key(&department_id)
    }

    /// `None` when the organization is not in the tree.
    pub fn is_active(&self, organization_id: Uuid) -> Option<bool> {
        self.organizations.get(&organization_id).copied()
    }

    pub fn organization_of(&self, department_id: Uuid) -> Result<Uuid, AuthzError> {
        self.departments
            .get(&department_id)
            .copied()
            .ok_or_else(|| AuthzError::NotFound {
                entity: "department".into(),
                id: department_id.to_string(),
            })
    }

    /// Organization ids with their active flag, in id order.
    pub fn organizations(&self) -> Vec<(Uuid, bool)> {
        let mut orgs: Vec<_> = self
            .organizations
            .iter()
            .map(|(id, active)| (*id, *active))
            .collect();
        orgs.sort();
        orgs
    }

    /// Departments directly under `organization_id`, in id order.
    pub fn departments_of(&self, organization_id: Uuid) -> Vec<Uuid> {
        let mut depts: Vec<_> = self
            .departments
            .iter()
            .filter(|(_, org)| **org == organization_id)
            .map(|(dept, _)| *dept)
            .collect();
        depts.sort();
        depts
    }

    pub fn is_descendant(&self, department_id: Uuid, organization_id: Uuid) -> bool {
        self.departments.get(&department_id) == Some(&organization_id)
    }

    pub fn validate_user_placement(&self, user: &User) -> bool {
        self.validate_placement(user.role, user.organization_id, user.department_id)
    }

    /// Check a role and placement against the tree.
    ///
    /// A department requires its parent organization alongside it.
    /// `dept_admin` requires a department and `org_admin` an
    /// organization; `super_admin` and unaffiliated members may have
    /// neither.
    pub fn validate_placement(
        &self,
        role: Role,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> bool {
        let placement_ok = match (organization_id, department_id) {
            (Some(org), Some(dept)) => self.is_descendant(dept, org),
            (Some(org), None) => self.contains_organization(org),
            (None, Some(_)) => false,
            (None, None) => true,
        };
        let role_ok = match role {
            Role::DeptAdmin => department_id.is_some(),
            Role::OrgAdmin => organization_id.is_some(),
            Role::Global | Role::Verified | Role::SuperAdmin => true,
        };
        placement_ok && role_ok
    }
}
