//! Department domain model.
//!
//! A department belongs to exactly one organization for its whole
//! lifetime. There is no update type: re-parenting a department would
//! silently move every standing admin scope along with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    /// The organization this department belongs to. Immutable.
    pub organization_id: Uuid,
    pub name: String,
    /// URL-safe unique identifier within the organization (e.g., `physics`).
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a new department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartment {
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
}
