//! Verification workflow: submission, resolution and listing of
//! department affiliation requests.
//!
//! Every transition goes through [`authorize`] against a tenant tree
//! rebuilt from stored records, never from placement values the caller
//! supplied. Exclusivity of concurrent resolutions and of pending
//! submissions is the repository's job; the checks here are pre-checks
//! that give callers a precise error in the common case.

use chrono::Utc;
use cohort_core::error::CohortError;
use cohort_core::models::actor::Actor;
use cohort_core::models::audit::{AuditOutcome, CreateAuditLogEntry};
use cohort_core::models::role::Role;
use cohort_core::models::user::Affiliation;
use cohort_core::models::verification::{
    CreateVerificationRequest, Resolution, VerificationRequest, VerificationStatus,
};
use cohort_core::repository::{
    AuditLogRepository, DepartmentRepository, OrganizationRepository, PaginatedResult,
    Pagination, ScopeFilter, UserAffiliationWriter, UserRepository, VerificationRepository,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::AuthzConfig;
use crate::error::AuthzError;
use crate::gate::{Action, authorize};
use crate::hierarchy::has_min_role;
use crate::scope::{Target, scope_filter};
use crate::tenant_tree::TenantTree;

/// Input for a new verification request.
#[derive(Debug, Clone)]
pub struct SubmitInput {
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub message: Option<String>,
}

/// Verification workflow service.
///
/// Generic over repository implementations so that the workflow has no
/// dependency on the database crate. `U` doubles as the user-mutation
/// collaborator invoked on approval.
pub struct VerificationService<O, D, U, V, A>
where
    O: OrganizationRepository,
    D: DepartmentRepository,
    U: UserRepository + UserAffiliationWriter,
    V: VerificationRepository,
    A: AuditLogRepository,
{
    org_repo: O,
    dept_repo: D,
    user_repo: U,
    request_repo: V,
    audit_repo: A,
    config: AuthzConfig,
}

impl<O, D, U, V, A> VerificationService<O, D, U, V, A>
where
    O: OrganizationRepository,
    D: DepartmentRepository,
    U: UserRepository + UserAffiliationWriter,
    V: VerificationRepository,
    A: AuditLogRepository,
{
    pub fn new(
        org_repo: O,
        dept_repo: D,
        user_repo: U,
        request_repo: V,
        audit_repo: A,
        config: AuthzConfig,
    ) -> Self {
        Self {
            org_repo,
            dept_repo,
            user_repo,
            request_repo,
            audit_repo,
            config,
        }
    }

    /// File a request for the caller to join `input.department_id`.
    pub async fn submit(
        &self,
        actor: Option<&Actor>,
        input: SubmitInput,
    ) -> Result<VerificationRequest, AuthzError> {
        let actor = require_actor(actor, &Action::SUBMIT_VERIFICATION)?;

        // 1. Re-read the caller and the target placement from storage.
        let user = self.user_repo.get_by_id(actor.user_id).await?;
        let org = self.org_repo.get_by_id(input.organization_id).await?;
        let dept = self.dept_repo.get_by_id(input.department_id).await?;

        if dept.organization_id != org.id {
            return Err(AuthzError::InvalidPlacement {
                organization_id: org.id.to_string(),
                department_id: dept.id.to_string(),
            });
        }
        if !org.active {
            return Err(AuthzError::OrganizationInactive);
        }

        // 2. Already a member of exactly this department?
        if has_min_role(user.role, Role::Verified)
            && user.organization_id == Some(org.id)
            && user.department_id == Some(dept.id)
        {
            return Err(AuthzError::AlreadyVerified);
        }

        let message = self.normalize_message(input.message)?;

        // 3. Courtesy duplicate check; the unique index has the last word.
        if self
            .request_repo
            .find_pending(user.id, org.id, dept.id)
            .await?
            .is_some()
        {
            return Err(AuthzError::DuplicatePending);
        }

        let request = self
            .request_repo
            .create(CreateVerificationRequest {
                user_id: user.id,
                organization_id: org.id,
                department_id: dept.id,
                message,
            })
            .await
            .map_err(|e| match e {
                CohortError::AlreadyExists { .. } => AuthzError::DuplicatePending,
                other => other.into(),
            })?;

        if let Err(source) = self.record(actor, &Action::SUBMIT_VERIFICATION, &request).await {
            return Err(AuthzError::AuditFailed {
                request: Box::new(request),
                source,
            });
        }
        info!(
            request_id = %request.id,
            user_id = %request.user_id,
            department_id = %request.department_id,
            "Verification request submitted"
        );

        Ok(request)
    }

    /// Approve a pending request and affiliate the requester with the
    /// request's organization and department.
    ///
    /// Once the request is approved, a failure to promote the requester
    /// or to audit the approval comes back as
    /// [`AuthzError::PromotionFailed`] or [`AuthzError::AuditFailed`]
    /// carrying the stored request.
    pub async fn approve(
        &self,
        actor: Option<&Actor>,
        request_id: Uuid,
    ) -> Result<VerificationRequest, AuthzError> {
        let action = Action::APPROVE_VERIFICATION;
        let result = self.approve_pending(actor, &action, request_id).await;
        self.audit_refusal(actor, &action, request_id, result).await
    }

    /// Reject a pending request. The requester's profile is untouched.
    pub async fn reject(
        &self,
        actor: Option<&Actor>,
        request_id: Uuid,
        reason: &str,
    ) -> Result<VerificationRequest, AuthzError> {
        let action = Action::REJECT_VERIFICATION;
        let result = self.reject_pending(actor, &action, request_id, reason).await;
        self.audit_refusal(actor, &action, request_id, result).await
    }

    /// Fetch one request. Requesters may always see their own; anybody
    /// else needs admin scope over the request's department.
    pub async fn get_request(
        &self,
        actor: Option<&Actor>,
        request_id: Uuid,
    ) -> Result<VerificationRequest, AuthzError> {
        let actor = require_actor(actor, &Action::VIEW_OWN_VERIFICATIONS)?;
        let request = self.request_repo.get_by_id(request_id).await?;
        if request.user_id == actor.user_id {
            return Ok(request);
        }

        let action = Action::VIEW_VERIFICATION;
        require_actor(Some(actor), &action)?;
        let tree = self.tree_for(&request, actor).await?;
        authorize(&tree, Some(actor), &action, Target::VerificationRequest(&request))?
            .into_result()?;

        Ok(request)
    }

    /// The caller's own requests, newest first.
    pub async fn list_for_user(
        &self,
        actor: Option<&Actor>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<VerificationRequest>, AuthzError> {
        let actor = require_actor(actor, &Action::VIEW_OWN_VERIFICATIONS)?;
        Ok(self
            .request_repo
            .list_by_user(actor.user_id, pagination)
            .await?)
    }

    /// Start a paged listing of every request inside the caller's scope,
    /// optionally restricted to one status.
    ///
    /// The caller's placement is re-read from storage first. An admin
    /// whose claimed department or organization is gone, or no longer
    /// fits together, gets an empty listing.
    pub async fn list_for_scope(
        &self,
        actor: Option<&Actor>,
        status: Option<VerificationStatus>,
    ) -> Result<ScopedListing<'_, V>, AuthzError> {
        let actor = require_actor(actor, &Action::LIST_VERIFICATIONS)?;
        let tree = self.placement_tree(actor).await?;
        let scope = scope_filter(&tree, actor);
        if scope.is_none() {
            info!(
                actor_id = %actor.user_id,
                role = %actor.role,
                "Listing scope does not match stored placement"
            );
        }
        Ok(ScopedListing::new(
            &self.request_repo,
            scope,
            status,
            self.config.default_page_size,
        ))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Role check, load, scope check and pending check shared by approve
    /// and reject.
    async fn load_for_resolution<'a>(
        &self,
        actor: Option<&'a Actor>,
        action: &Action,
        request_id: Uuid,
    ) -> Result<(&'a Actor, VerificationRequest, TenantTree), AuthzError> {
        let actor = require_actor(actor, &action.without_scope())?;
        let request = self.request_repo.get_by_id(request_id).await?;
        let tree = self.tree_for(&request, actor).await?;

        authorize(&tree, Some(actor), action, Target::VerificationRequest(&request))?
            .into_result()?;

        if request.status.is_terminal() {
            return Err(AuthzError::AlreadyResolved);
        }
        Ok((actor, request, tree))
    }

    async fn approve_pending(
        &self,
        actor: Option<&Actor>,
        action: &Action,
        request_id: Uuid,
    ) -> Result<VerificationRequest, AuthzError> {
        let (actor, request, tree) = self.load_for_resolution(actor, action, request_id).await?;

        if tree.is_active(request.organization_id) == Some(false)
            && !self.config.inactive_organization.permits_approval()
        {
            return Err(AuthzError::OrganizationInactive);
        }

        // The requester must exist before the request leaves `pending`.
        let requester = self.user_repo.get_by_id(request.user_id).await?;

        // Admin roles are reset on re-affiliation so that an approval can
        // never widen anybody's scope. Platform admins keep their role.
        let role = match requester.role {
            Role::SuperAdmin => Role::SuperAdmin,
            _ => Role::Verified,
        };

        let resolved = self
            .resolve(request.id, Resolution::approved(actor.user_id, Utc::now()))
            .await?;

        let affiliation = Affiliation {
            role,
            organization_id: resolved.organization_id,
            department_id: resolved.department_id,
        };
        if let Err(source) = self.user_repo.affiliate(requester.id, affiliation).await {
            return Err(AuthzError::PromotionFailed {
                request: Box::new(resolved),
                source,
            });
        }

        if let Err(source) = self.record(actor, action, &resolved).await {
            return Err(AuthzError::AuditFailed {
                request: Box::new(resolved),
                source,
            });
        }
        info!(
            request_id = %resolved.id,
            resolved_by = %actor.user_id,
            user_id = %resolved.user_id,
            "Verification request approved"
        );

        Ok(resolved)
    }

    async fn reject_pending(
        &self,
        actor: Option<&Actor>,
        action: &Action,
        request_id: Uuid,
        reason: &str,
    ) -> Result<VerificationRequest, AuthzError> {
        let (actor, request, tree) = self.load_for_resolution(actor, action, request_id).await?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AuthzError::MissingReason);
        }

        if tree.is_active(request.organization_id) == Some(false)
            && !self.config.inactive_organization.permits_rejection()
        {
            return Err(AuthzError::OrganizationInactive);
        }

        let resolved = self
            .resolve(
                request.id,
                Resolution::rejected(actor.user_id, Utc::now(), reason.to_string()),
            )
            .await?;

        if let Err(source) = self.record(actor, action, &resolved).await {
            return Err(AuthzError::AuditFailed {
                request: Box::new(resolved),
                source,
            });
        }
        info!(
            request_id = %resolved.id,
            resolved_by = %actor.user_id,
            "Verification request rejected"
        );

        Ok(resolved)
    }

    /// Audit a refused approval or rejection, then hand `result` back.
    async fn audit_refusal(
        &self,
        actor: Option<&Actor>,
        action: &Action,
        request_id: Uuid,
        result: Result<VerificationRequest, AuthzError>,
    ) -> Result<VerificationRequest, AuthzError> {
        let refusal = match (actor, &result) {
            (Some(actor), Err(err)) => {
                refusal_outcome(err).map(|outcome| (actor, outcome, err.to_string()))
            }
            _ => None,
        };
        let Some((actor, outcome, error)) = refusal else {
            return result;
        };

        self.audit_repo
            .append(CreateAuditLogEntry {
                actor_id: actor.user_id,
                action: action.name.to_string(),
                resource_id: Some(request_id),
                outcome,
                metadata: Some(json!({ "error": error })),
            })
            .await?;
        info!(
            request_id = %request_id,
            actor_id = %actor.user_id,
            action = action.name,
            outcome = outcome.as_str(),
            "Verification transition refused"
        );

        result
    }

    async fn resolve(
        &self,
        request_id: Uuid,
        resolution: Resolution,
    ) -> Result<VerificationRequest, AuthzError> {
        self.request_repo
            .resolve(request_id, resolution)
            .await
            .map_err(|e| match e {
                CohortError::Conflict { .. } => AuthzError::AlreadyResolved,
                other => other.into(),
            })
    }

    /// Build the slice of the tenant tree a decision on `request` needs:
    /// the request's department and organization, plus the actor's own
    /// department when it exists so a stale placement can be detected.
    async fn tree_for(
        &self,
        request: &VerificationRequest,
        actor: &Actor,
    ) -> Result<TenantTree, AuthzError> {
        let dept = self
            .dept_repo
            .get_by_id(request.department_id)
            .await
            .map_err(|e| dangling(e, "department", request.department_id))?;
        if dept.organization_id != request.organization_id {
            return Err(AuthzError::UnresolvableTarget(format!(
                "verification request {} names department {} outside organization {}",
                request.id, dept.id, request.organization_id
            )));
        }
        let org = self
            .org_repo
            .get_by_id(dept.organization_id)
            .await
            .map_err(|e| dangling(e, "organization", dept.organization_id))?;

        let mut tree = TenantTree::new();
        tree.insert_organization(&org);
        tree.insert_department(&dept)?;

        if let Some(own_dept_id) = actor.department_id.filter(|id| *id != dept.id) {
            if let Some(own_dept) = found(self.dept_repo.get_by_id(own_dept_id).await)? {
                if !tree.contains_organization(own_dept.organization_id) {
                    let own_org = self.org_repo.get_by_id(own_dept.organization_id).await?;
                    tree.insert_organization(&own_org);
                }
                tree.insert_department(&own_dept)?;
            }
        }

        Ok(tree)
    }

    /// The actor's own organization and department as stored. Records
    /// that are missing, or a department outside the claimed
    /// organization, are left out so placement validation fails.
    async fn placement_tree(&self, actor: &Actor) -> Result<TenantTree, AuthzError> {
        let mut tree = TenantTree::new();
        if let Some(org_id) = actor.organization_id {
            if let Some(org) = found(self.org_repo.get_by_id(org_id).await)? {
                tree.insert_organization(&org);
            }
        }
        if let Some(dept_id) = actor.department_id {
            if let Some(dept) = found(self.dept_repo.get_by_id(dept_id).await)? {
                if tree.contains_organization(dept.organization_id) {
                    tree.insert_department(&dept)?;
                }
            }
        }
        Ok(tree)
    }

    fn normalize_message(&self, message: Option<String>) -> Result<Option<String>, AuthzError> {
        let Some(message) = message else {
            return Ok(None);
        };
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.chars().count() > self.config.max_message_length {
            return Err(AuthzError::MessageTooLong {
                max: self.config.max_message_length,
            });
        }
        Ok(Some(trimmed.to_string()))
    }

    async fn record(
        &self,
        actor: &Actor,
        action: &Action,
        request: &VerificationRequest,
    ) -> Result<(), CohortError> {
        self.audit_repo
            .append(CreateAuditLogEntry {
                actor_id: actor.user_id,
                action: action.name.to_string(),
                resource_id: Some(request.id),
                outcome: AuditOutcome::Success,
                metadata: Some(json!({
                    "user_id": request.user_id,
                    "organization_id": request.organization_id,
                    "department_id": request.department_id,
                    "status": request.status.as_str(),
                    "rejection_reason": request.rejection_reason,
                })),
            })
            .await?;
        Ok(())
    }
}

/// Run the role checks of `action` and hand back the authenticated actor.
fn require_actor<'a>(actor: Option<&'a Actor>, action: &Action) -> Result<&'a Actor, AuthzError> {
    let tree = TenantTree::new();
    authorize(&tree, actor, &action.without_scope(), Target::Platform)?.into_result()?;
    actor.ok_or(AuthzError::Unauthenticated)
}

/// Audit outcome for a refused transition; `None` for errors that are
/// not a decision about the request.
fn refusal_outcome(err: &AuthzError) -> Option<AuditOutcome> {
    match err {
        AuthzError::RoleMismatch | AuthzError::InsufficientRole | AuthzError::OutOfScope => {
            Some(AuditOutcome::Denied)
        }
        AuthzError::AlreadyResolved
        | AuthzError::MissingReason
        | AuthzError::OrganizationInactive => Some(AuditOutcome::Failure),
        _ => None,
    }
}

/// `NotFound` becomes `None`; every other store error propagates.
fn found<T>(result: Result<T, CohortError>) -> Result<Option<T>, AuthzError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CohortError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A stored request pointing at a missing tenant node is corruption.
fn dangling(err: CohortError, entity: &str, id: Uuid) -> AuthzError {
    match err {
        CohortError::NotFound { .. } => AuthzError::UnresolvableTarget(format!("{entity} {id}")),
        other => other.into(),
    }
}

/// A lazy, finite, restartable walk over the requests in one scope.
///
/// Pages are fetched on demand in repository order: newest first, ties
/// broken by ascending id.
pub struct ScopedListing<'a, V: VerificationRepository> {
    request_repo: &'a V,
    scope: Option<ScopeFilter>,
    status: Option<VerificationStatus>,
    page_size: u64,
    offset: u64,
    exhausted: bool,
}

impl<'a, V: VerificationRepository> ScopedListing<'a, V> {
    fn new(
        request_repo: &'a V,
        scope: Option<ScopeFilter>,
        status: Option<VerificationStatus>,
        page_size: u64,
    ) -> Self {
        Self {
            request_repo,
            scope,
            status,
            page_size: page_size.max(1),
            offset: 0,
            exhausted: false,
        }
    }

    /// The filter this listing runs with; `None` for an admin whose
    /// placement lacks the id their role needs.
    pub fn scope(&self) -> Option<ScopeFilter> {
        self.scope
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<VerificationRequest>>, AuthzError> {
        let Some(scope) = self.scope else {
            self.exhausted = true;
            return Ok(None);
        };
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .request_repo
            .list(
                scope,
                self.status,
                Pagination {
                    offset: self.offset,
                    limit: self.page_size,
                },
            )
            .await?;

        let fetched = page.items.len() as u64;
        self.offset += fetched;
        if fetched < self.page_size || self.offset >= page.total {
            self.exhausted = true;
        }
        if fetched == 0 {
            return Ok(None);
        }
        Ok(Some(page.items))
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.offset = 0;
        self.exhausted = false;
    }

    /// Restart and drain every page.
    pub async fn collect_all(&mut self) -> Result<Vec<VerificationRequest>, AuthzError> {
        self.restart();
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}
