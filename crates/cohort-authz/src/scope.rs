//! Scope resolution: does an actor's tenant placement contain a target?
//!
//! Targets are resolved against a [`TenantTree`] snapshot built from
//! stored records. Verification requests resolve through the placement
//! they were filed against, not through the requester's current profile,
//! so a request stays with the admin who had scope when it was filed.

use cohort_core::models::actor::Actor;
use cohort_core::models::role::Role;
use cohort_core::models::user::User;
use cohort_core::models::verification::VerificationRequest;
use cohort_core::repository::ScopeFilter;
use uuid::Uuid;

use crate::error::AuthzError;
use crate::tenant_tree::TenantTree;

/// Something an action is performed on.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// No tenant resource; only valid for actions without a scope check.
    Platform,
    User(&'a User),
    Department(Uuid),
    Organization(Uuid),
    VerificationRequest(&'a VerificationRequest),
}

/// Where a target sits in the tree. `None` means the target has no
/// placement at all (an unaffiliated user) and lies outside every admin
/// scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Resolved {
    organization_id: Uuid,
    department_id: Option<Uuid>,
}

pub struct ScopeResolver<'t> {
    tree: &'t TenantTree,
}

impl<'t> ScopeResolver<'t> {
    pub fn new(tree: &'t TenantTree) -> Self {
        Self { tree }
    }

    /// Decide whether `actor`'s scope contains `target`.
    ///
    /// `super_admin` contains everything without resolving the target.
    /// For the admin roles the target is resolved first, so a dangling or
    /// contradictory reference fails with `UnresolvableTarget` instead of
    /// being quietly treated as out of scope.
    pub fn contains(&self, actor: &Actor, target: Target<'_>) -> Result<bool, AuthzError> {
        match actor.role {
            Role::SuperAdmin => Ok(true),
            Role::OrgAdmin => {
                let Some(resolved) = self.resolve(target)? else {
                    return Ok(false);
                };
                Ok(actor.organization_id == Some(resolved.organization_id))
            }
            Role::DeptAdmin => {
                let Some(resolved) = self.resolve(target)? else {
                    return Ok(false);
                };
                if !self.actor_placement_is_consistent(actor) {
                    return Ok(false);
                }
                Ok(resolved.department_id.is_some() && actor.department_id == resolved.department_id)
            }
            Role::Global | Role::Verified => Ok(false),
        }
    }

    /// A dept admin whose claimed organization disagrees with the tree
    /// (a stale identity cache) holds no scope. When the actor's own
    /// department is not part of this snapshot there is nothing to
    /// compare against and the claim is taken as given.
    fn actor_placement_is_consistent(&self, actor: &Actor) -> bool {
        match actor.department_id {
            Some(dept) if self.tree.contains_department(dept) => {
                self.tree
                    .validate_placement(actor.role, actor.organization_id, actor.department_id)
            }
            Some(_) => true,
            None => false,
        }
    }

    fn resolve(&self, target: Target<'_>) -> Result<Option<Resolved>, AuthzError> {
        match target {
            Target::Platform => Ok(None),
            Target::Organization(org) => {
                if !self.tree.contains_organization(org) {
                    return Err(AuthzError::UnresolvableTarget(format!("organization {org}")));
                }
                Ok(Some(Resolved {
                    organization_id: org,
                    department_id: None,
                }))
            }
            Target::Department(dept) => {
                let org = self.organization_of(dept)?;
                Ok(Some(Resolved {
                    organization_id: org,
                    department_id: Some(dept),
                }))
            }
            Target::User(user) => {
                if !self.tree.validate_user_placement(user) {
                    return Err(AuthzError::UnresolvableTarget(format!(
                        "user {} has an inconsistent placement",
                        user.id
                    )));
                }
                Ok(user.organization_id.map(|org| Resolved {
                    organization_id: org,
                    department_id: user.department_id,
                }))
            }
            Target::VerificationRequest(request) => {
                let org = self.organization_of(request.department_id)?;
                if org != request.organization_id {
                    return Err(AuthzError::UnresolvableTarget(format!(
                        "verification request {} names department {} outside organization {}",
                        request.id, request.department_id, request.organization_id
                    )));
                }
                Ok(Some(Resolved {
                    organization_id: org,
                    department_id: Some(request.department_id),
                }))
            }
        }
    }

    fn organization_of(&self, department_id: Uuid) -> Result<Uuid, AuthzError> {
        self.tree
            .organization_of(department_id)
            .map_err(|_| AuthzError::UnresolvableTarget(format!("department {department_id}")))
    }
}

/// The listing filter equivalent to an actor's scope, or `None` when the
/// actor has no administrative scope at all.
///
/// `tree` must hold the actor's own organization and department as
/// stored. An admin whose claimed placement is missing from it, or
/// contradicts it, gets no filter.
pub fn scope_filter(tree: &TenantTree, actor: &Actor) -> Option<ScopeFilter> {
    if actor.role != Role::SuperAdmin
        && !tree.validate_placement(actor.role, actor.organization_id, actor.department_id)
    {
        return None;
    }
    match actor.role {
        Role::SuperAdmin => Some(ScopeFilter::All),
        Role::OrgAdmin => actor.organization_id.map(ScopeFilter::Organization),
        Role::DeptAdmin => actor.department_id.map(ScopeFilter::Department),
        Role::Global | Role::Verified => None,
    }
}
