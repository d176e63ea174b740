//! Actor model: the authenticated caller of an operation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;
use super::user::User;

/// The caller as described by the identity layer.
///
/// Trusted as ground truth for the current call only. Operations that
/// mutate state re-read stored records instead of trusting the placement
/// carried here for anything but the caller's own scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            role,
            organization_id: None,
            department_id: None,
        }
    }

    pub fn in_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn in_department(mut self, organization_id: Uuid, department_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self.department_id = Some(department_id);
        self
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            organization_id: user.organization_id,
            department_id: user.department_id,
        }
    }
}
