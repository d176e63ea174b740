//! Authorization gate.
//!
//! [`authorize`] is the single place role and scope checks are combined.
//! It is a pure decision: nothing is written, and callers run the
//! protected operation only after an [`Decision::Allow`].

use cohort_core::models::actor::Actor;
use cohort_core::models::role::Role;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthzError;
use crate::hierarchy::{has_exact_role, has_min_role};
use crate::scope::{ScopeResolver, Target};
use crate::tenant_tree::TenantTree;

/// Static description of what a protected action demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub name: &'static str,
    pub requires_authentication: bool,
    /// Exact role; `super_admin` passes regardless.
    pub required_role: Option<Role>,
    pub min_role: Option<Role>,
    pub requires_scope: bool,
}

impl Action {
    pub const SUBMIT_VERIFICATION: Action = Action {
        name: "verification.submit",
        requires_authentication: true,
        required_role: None,
        min_role: None,
        requires_scope: false,
    };

    pub const APPROVE_VERIFICATION: Action = Action {
        name: "verification.approve",
        requires_authentication: true,
        required_role: None,
        min_role: Some(Role::DeptAdmin),
        requires_scope: true,
    };

    pub const REJECT_VERIFICATION: Action = Action {
        name: "verification.reject",
        requires_authentication: true,
        required_role: None,
        min_role: Some(Role::DeptAdmin),
        requires_scope: true,
    };

    pub const VIEW_OWN_VERIFICATIONS: Action = Action {
        name: "verification.view_own",
        requires_authentication: true,
        required_role: None,
        min_role: None,
        requires_scope: false,
    };

    pub const VIEW_VERIFICATION: Action = Action {
        name: "verification.view",
        requires_authentication: true,
        required_role: None,
        min_role: Some(Role::DeptAdmin),
        requires_scope: true,
    };

    pub const LIST_VERIFICATIONS: Action = Action {
        name: "verification.list",
        requires_authentication: true,
        required_role: None,
        min_role: Some(Role::DeptAdmin),
        requires_scope: false,
    };

    pub const CREATE_ORGANIZATION: Action = Action {
        name: "organization.create",
        requires_authentication: true,
        required_role: Some(Role::SuperAdmin),
        min_role: None,
        requires_scope: false,
    };

    pub const SET_ORGANIZATION_ACTIVE: Action = Action {
        name: "organization.set_active",
        requires_authentication: true,
        required_role: Some(Role::SuperAdmin),
        min_role: None,
        requires_scope: false,
    };

    pub const CREATE_DEPARTMENT: Action = Action {
        name: "department.create",
        requires_authentication: true,
        required_role: None,
        min_role: Some(Role::OrgAdmin),
        requires_scope: true,
    };

    /// The same action with its scope check removed. Services use this to
    /// run the role checks before loading the target from storage.
    pub const fn without_scope(self) -> Action {
        Action {
            requires_scope: false,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    Unauthenticated,
    RoleMismatch,
    InsufficientRole,
    OutOfScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Turn a denial into the matching typed error.
    pub fn into_result(self) -> Result<(), AuthzError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }
}

/// Decide whether `actor` may perform `action` on `target`.
///
/// Checks run in a fixed order: authentication, exact role, minimum role,
/// scope. `super_admin` skips the exact-role check but must still be
/// authenticated. An `Err` means the target could not be resolved
/// against `tree`, which points at corrupt data rather than a denial.
pub fn authorize(
    tree: &TenantTree,
    actor: Option<&Actor>,
    action: &Action,
    target: Target<'_>,
) -> Result<Decision, AuthzError> {
    let decision = decide(tree, actor, action, target)?;
    debug!(
        action = action.name,
        actor_id = ?actor.map(|a| a.user_id),
        decision = ?decision,
        "Authorization decision"
    );
    Ok(decision)
}

fn decide(
    tree: &TenantTree,
    actor: Option<&Actor>,
    action: &Action,
    target: Target<'_>,
) -> Result<Decision, AuthzError> {
    let Some(actor) = actor else {
        if action.requires_authentication {
            return Ok(Decision::Deny(DenyReason::Unauthenticated));
        }
        // Anonymous callers have no role and no scope.
        if action.required_role.is_some() || action.min_role.is_some() || action.requires_scope {
            return Ok(Decision::Deny(DenyReason::Unauthenticated));
        }
        return Ok(Decision::Allow);
    };

    if let Some(required) = action.required_role {
        if actor.role != Role::SuperAdmin && !has_exact_role(actor.role, required) {
            return Ok(Decision::Deny(DenyReason::RoleMismatch));
        }
    }

    if let Some(min) = action.min_role {
        if !has_min_role(actor.role, min) {
            return Ok(Decision::Deny(DenyReason::InsufficientRole));
        }
    }

    if action.requires_scope && !ScopeResolver::new(tree).contains(actor, target)? {
        return Ok(Decision::Deny(DenyReason::OutOfScope));
    }

    Ok(Decision::Allow)
}
