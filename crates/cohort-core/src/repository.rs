//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations own every
//! concurrency guarantee the workflow relies on: the single-winner
//! [`VerificationRepository::resolve`] and the uniqueness of pending
//! requests per `(user, organization, department)`.

use uuid::Uuid;

use crate::error::CohortResult;
use crate::models::{
    audit::{AuditLogEntry, CreateAuditLogEntry},
    department::{CreateDepartment, Department},
    organization::{CreateOrganization, Organization},
    user::{Affiliation, CreateUser, User},
    verification::{
        CreateVerificationRequest, Resolution, VerificationRequest, VerificationStatus,
    },
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// The slice of the tenant tree a listing is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFilter {
    All,
    Organization(Uuid),
    Department(Uuid),
}

// ---------------------------------------------------------------------------
// Tenant tree (read-mostly reference data)
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = CohortResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CohortResult<Organization>> + Send;
    fn set_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = CohortResult<Organization>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CohortResult<PaginatedResult<Organization>>> + Send;
}

/// Departments are never updated: their parent organization is fixed at
/// creation.
pub trait DepartmentRepository: Send + Sync {
    fn create(
        &self,
        input: CreateDepartment,
    ) -> impl Future<Output = CohortResult<Department>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CohortResult<Department>> + Send;
    fn list_by_organization(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CohortResult<PaginatedResult<Department>>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = CohortResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CohortResult<User>> + Send;
}

/// The narrow user-mutation hook invoked when a verification request is
/// approved. User persistence is otherwise owned elsewhere.
pub trait UserAffiliationWriter: Send + Sync {
    fn affiliate(
        &self,
        user_id: Uuid,
        affiliation: Affiliation,
    ) -> impl Future<Output = CohortResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Verification workflow
// ---------------------------------------------------------------------------

pub trait VerificationRepository: Send + Sync {
    /// Insert a new pending request.
    ///
    /// Fails with [`CohortError::AlreadyExists`] when a pending request for
    /// the same user, organization and department is already stored.
    ///
    /// [`CohortError::AlreadyExists`]: crate::error::CohortError::AlreadyExists
    fn create(
        &self,
        input: CreateVerificationRequest,
    ) -> impl Future<Output = CohortResult<VerificationRequest>> + Send;

    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = CohortResult<VerificationRequest>> + Send;

    fn find_pending(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        department_id: Uuid,
    ) -> impl Future<Output = CohortResult<Option<VerificationRequest>>> + Send;

    /// Compare-and-swap from `Pending` to the resolution's terminal status.
    ///
    /// Exactly one of any number of concurrent calls on the same id wins;
    /// the others fail with [`CohortError::Conflict`]. A missing id fails
    /// with [`CohortError::NotFound`].
    ///
    /// [`CohortError::Conflict`]: crate::error::CohortError::Conflict
    /// [`CohortError::NotFound`]: crate::error::CohortError::NotFound
    fn resolve(
        &self,
        id: Uuid,
        resolution: Resolution,
    ) -> impl Future<Output = CohortResult<VerificationRequest>> + Send;

    /// List requests inside `scope`, newest first, ties by id ascending.
    fn list(
        &self,
        scope: ScopeFilter,
        status: Option<VerificationStatus>,
        pagination: Pagination,
    ) -> impl Future<Output = CohortResult<PaginatedResult<VerificationRequest>>> + Send;

    fn list_by_user(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CohortResult<PaginatedResult<VerificationRequest>>> + Send;
}

/// Append-only audit trail.
pub trait AuditLogRepository: Send + Sync {
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = CohortResult<AuditLogEntry>> + Send;
    fn list_by_resource(
        &self,
        resource_id: Uuid,
    ) -> impl Future<Output = CohortResult<Vec<AuditLogEntry>>> + Send;
}
