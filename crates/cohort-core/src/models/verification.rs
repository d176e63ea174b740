//! Verification request domain model.
//!
//! A verification request is a user's claim to belong to a department.
//! It starts `Pending` and moves exactly once, to `Approved` or
//! `Rejected`. A rejected user who tries again files a new request; old
//! records are never reopened.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CohortError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// No transition leaves a terminal status.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VerificationStatus::Pending),
            "approved" => Ok(VerificationStatus::Approved),
            "rejected" => Ok(VerificationStatus::Rejected),
            other => Err(CohortError::Validation {
                message: format!("unknown verification status: {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Organization and department as they were at submission time.
    /// Scope checks use these, never the requester's current placement.
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub status: VerificationStatus,
    pub message: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVerificationRequest {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub message: Option<String>,
}

/// The terminal state written by a compare-and-swap on a pending request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub resolved_by: Uuid,
    pub resolved_at: DateTime<Utc>,
}

impl Resolution {
    pub fn approved(resolved_by: Uuid, resolved_at: DateTime<Utc>) -> Self {
        Self {
            status: VerificationStatus::Approved,
            rejection_reason: None,
            resolved_by,
            resolved_at,
        }
    }

    pub fn rejected(resolved_by: Uuid, resolved_at: DateTime<Utc>, reason: String) -> Self {
        Self {
            status: VerificationStatus::Rejected,
            rejection_reason: Some(reason),
            resolved_by,
            resolved_at,
        }
    }
}
