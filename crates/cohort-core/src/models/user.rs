//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    /// Set whenever `department_id` is set, and then equal to the
    /// department's parent organization.
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

/// The role and placement written onto a user when a verification
/// request is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub role: Role,
    pub organization_id: Uuid,
    pub department_id: Uuid,
}
