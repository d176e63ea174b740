//! Authorization and workflow error types.

use cohort_core::error::CohortError;
use cohort_core::models::role::{Role, UnknownRole};
use cohort_core::models::verification::VerificationRequest;
use thiserror::Error;

use crate::gate::DenyReason;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("caller does not hold the exact role this action requires")]
    RoleMismatch,

    #[error("caller's role is below the minimum this action requires")]
    InsufficientRole,

    #[error("target is outside the caller's tenant scope")]
    OutOfScope,

    /// Stored data names a role outside the hierarchy.
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A target reference points at nothing in the tenant tree, or at a
    /// placement that contradicts it.
    #[error("target cannot be resolved in the tenant tree: {0}")]
    UnresolvableTarget(String),

    #[error("user is already verified in this department")]
    AlreadyVerified,

    #[error("a pending request for this department already exists")]
    DuplicatePending,

    #[error("verification request is already resolved")]
    AlreadyResolved,

    #[error("a rejection reason is required")]
    MissingReason,

    #[error("organization is inactive")]
    OrganizationInactive,

    #[error("department {department_id} does not belong to organization {organization_id}")]
    InvalidPlacement {
        organization_id: String,
        department_id: String,
    },

    #[error("role {role} needs a placement it was not given")]
    RoleRequiresPlacement { role: Role },

    #[error("message exceeds {max} characters")]
    MessageTooLong { max: usize },

    /// The approval is committed but the requester's affiliation could
    /// not be written. `request` is the stored, resolved request.
    #[error("request {} was approved but the requester was not promoted: {source}", .request.id)]
    PromotionFailed {
        request: Box<VerificationRequest>,
        #[source]
        source: CohortError,
    },

    /// The transition is committed but its audit entry was not written.
    #[error(
        "request {} is {} but its audit entry was not written: {source}",
        .request.id,
        .request.status.as_str()
    )]
    AuditFailed {
        request: Box<VerificationRequest>,
        #[source]
        source: CohortError,
    },

    #[error(transparent)]
    Store(CohortError),
}

impl AuthzError {
    /// Races that callers should report back to the user rather than
    /// treat as bugs.
    pub fn is_expected_race(&self) -> bool {
        matches!(self, AuthzError::AlreadyResolved | AuthzError::DuplicatePending)
    }

    /// Errors that point at corrupted data rather than a bad request.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            AuthzError::UnknownRole(_) | AuthzError::UnresolvableTarget(_)
        )
    }

    /// The stored request when the state change went through but a
    /// follow-up step did not. Retrying the transition would only report
    /// `AlreadyResolved` or `DuplicatePending`.
    pub fn committed_request(&self) -> Option<&VerificationRequest> {
        match self {
            AuthzError::PromotionFailed { request, .. } | AuthzError::AuditFailed { request, .. } => {
                Some(request.as_ref())
            }
            _ => None,
        }
    }
}

impl From<DenyReason> for AuthzError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => AuthzError::Unauthenticated,
            DenyReason::RoleMismatch => AuthzError::RoleMismatch,
            DenyReason::InsufficientRole => AuthzError::InsufficientRole,
            DenyReason::OutOfScope => AuthzError::OutOfScope,
        }
    }
}

impl From<CohortError> for AuthzError {
    fn from(err: CohortError) -> Self {
        match err {
            CohortError::NotFound { entity, id } => AuthzError::NotFound { entity, id },
            CohortError::UnknownRole(role) => AuthzError::UnknownRole(role),
            other => AuthzError::Store(other),
        }
    }
}

impl From<AuthzError> for CohortError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Store(inner) => inner,
            AuthzError::PromotionFailed { source, .. } | AuthzError::AuditFailed { source, .. } => {
                source
            }
            AuthzError::NotFound { entity, id } => CohortError::NotFound { entity, id },
            AuthzError::UnknownRole(role) => CohortError::UnknownRole(role),
            AuthzError::UnresolvableTarget(_) => CohortError::Internal(err.to_string()),
            AuthzError::DuplicatePending => CohortError::AlreadyExists {
                entity: "verification_request".into(),
            },
            other => CohortError::Validation {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_keeps_its_type() {
        let err: AuthzError = CohortError::NotFound {
            entity: "department".into(),
            id: "d1".into(),
        }
        .into();
        assert!(matches!(err, AuthzError::NotFound { ref entity, .. } if entity == "department"));
    }

    #[test]
    fn deny_reasons_map_one_to_one() {
        assert!(matches!(
            AuthzError::from(DenyReason::OutOfScope),
            AuthzError::OutOfScope
        ));
        assert!(matches!(
            AuthzError::from(DenyReason::Unauthenticated),
            AuthzError::Unauthenticated
        ));
    }

    #[test]
    fn corruption_surfaces_as_internal() {
        let err: CohortError = AuthzError::UnresolvableTarget("department d9".into()).into();
        assert!(matches!(err, CohortError::Internal(_)));
    }

    #[test]
    fn races_are_classified() {
        assert!(AuthzError::AlreadyResolved.is_expected_race());
        assert!(AuthzError::DuplicatePending.is_expected_race());
        assert!(!AuthzError::OutOfScope.is_expected_race());
        assert!(AuthzError::UnknownRole(UnknownRole("x".into())).is_integrity_violation());
    }

    #[test]
    fn committed_failures_carry_the_stored_request() {
        let request = VerificationRequest {
            id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            organization_id: uuid::Uuid::new_v4(),
            department_id: uuid::Uuid::new_v4(),
            message: None,
            status: cohort_core::models::verification::VerificationStatus::Approved,
            resolved_by: None,
            resolved_at: None,
            rejection_reason: None,
            created_at: chrono::Utc::now(),
        };
        let id = request.id;
        let err = AuthzError::PromotionFailed {
            request: Box::new(request),
            source: CohortError::Database("connection reset".into()),
        };

        assert_eq!(err.committed_request().map(|r| r.id), Some(id));
        assert!(err.to_string().contains("was not promoted"));
        assert!(!err.is_expected_race());
        assert!(AuthzError::AlreadyResolved.committed_request().is_none());
        assert!(matches!(CohortError::from(err), CohortError::Database(_)));
    }
}
