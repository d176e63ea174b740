//! Organization domain model.
//!
//! Organizations are the top level of the tenant tree. They own
//! departments, and through them every affiliated user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An organization groups departments under one administrative entity.
///
/// Deactivated organizations stay readable (their verification history
/// remains visible) but accept no new verification requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe unique identifier (e.g., `acme-university`).
    pub slug: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new organization. New organizations are
/// always active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
}
