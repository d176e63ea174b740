//! SurrealDB implementation of [`VerificationRepository`].
//!
//! Two storage-level guarantees back the workflow:
//!
//! - `pending_slot` holds `"pending"` while a request is open and the
//!   request id once it is resolved. A unique index over
//!   `(user_id, organization_id, department_id, pending_slot)` therefore
//!   rejects a second pending request for the same department without a
//!   read-then-write race.
//! - [`resolve`](VerificationRepository::resolve) is a single conditional
//!   `UPDATE ... WHERE status = 'pending'`. The record is either updated by
//!   exactly one caller or left untouched, so concurrent resolutions have a
//!   single winner.

use chrono::{DateTime, Utc};
use cohort_core::error::CohortResult;
use cohort_core::models::verification::{
    CreateVerificationRequest, Resolution, VerificationRequest, VerificationStatus,
};
use cohort_core::repository::{
    PaginatedResult, Pagination, ScopeFilter, VerificationRepository,
};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, classify, parse_uuid};

const PENDING_SLOT: &str = "pending";

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct VerificationRowWithId {
    record_id: String,
    user_id: String,
    organization_id: String,
    department_id: String,
    status: String,
    message: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<String>,
}

impl VerificationRowWithId {
    fn try_into_request(self) -> Result<VerificationRequest, DbError> {
        let status = self
            .status
            .parse::<VerificationStatus>()
            .map_err(|e| DbError::Decode(e.to_string()))?;
        let resolved_by = self
            .resolved_by
            .as_deref()
            .map(|v| parse_uuid(v, "resolved_by"))
            .transpose()?;
        Ok(VerificationRequest {
            id: parse_uuid(&self.record_id, "verification_request")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            organization_id: parse_uuid(&self.organization_id, "organization")?,
            department_id: parse_uuid(&self.department_id, "department")?,
            status,
            message: self.message,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
            resolved_by,
        })
    }
}

/// Just enough of an updated record to tell whether the update matched.
#[derive(Debug, SurrealValue)]
struct StatusRow {
    #[allow(dead_code)]
    status: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Every read projects the record id the same way.
const SELECT_WITH_ID: &str = "SELECT meta::id(id) AS record_id, user_id, organization_id, \
     department_id, status, message, rejection_reason, created_at, resolved_at, resolved_by";

/// SurrealDB implementation of the Verification repository.
#[derive(Clone)]
pub struct SurrealVerificationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealVerificationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn exists(&self, id_str: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM type::record('verification_request', $id) GROUP ALL")
            .bind(("id", id_str.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    /// Run a count query and a page query sharing the same `WHERE`.
    async fn page(
        &self,
        filter: &str,
        binds: Vec<(&'static str, String)>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<VerificationRequest>, DbError> {
        let count_query =
            format!("SELECT count() AS total FROM verification_request {filter} GROUP ALL");
        let mut count_builder = self.db.query(count_query);
        for (key, value) in binds.iter().cloned() {
            count_builder = count_builder.bind((key, value));
        }
        let mut count_result = count_builder.await?;
        let count_rows: Vec<CountRow> = count_result.take(0)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let page_query = format!(
            "{SELECT_WITH_ID} FROM verification_request {filter} \
             ORDER BY created_at DESC, record_id ASC \
             LIMIT $limit START $offset"
        );
        let mut builder = self.db.query(page_query);
        for (key, value) in binds {
            builder = builder.bind((key, value));
        }
        let mut result = builder
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await?;

        let rows: Vec<VerificationRowWithId> = result.take(0)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_request())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> VerificationRepository for SurrealVerificationRepository<C> {
    async fn create(&self, input: CreateVerificationRequest) -> CohortResult<VerificationRequest> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let query = format!(
            "CREATE type::record('verification_request', $id) SET \
             user_id = $user_id, organization_id = $org_id, \
             department_id = $dept_id, status = 'pending', \
             pending_slot = $slot, message = $message; \
             {SELECT_WITH_ID} FROM type::record('verification_request', $id);"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("org_id", input.organization_id.to_string()))
            .bind(("dept_id", input.department_id.to_string()))
            .bind(("slot", PENDING_SLOT.to_string()))
            .bind(("message", input.message))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| classify(e, "verification_request", &id_str))?;

        // Statement 0 is the CREATE, statement 1 reads it back with its id.
        let rows: Vec<VerificationRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "verification_request".into(),
            id: id_str,
        })?;

        Ok(row.try_into_request()?)
    }

    async fn get_by_id(&self, id: Uuid) -> CohortResult<VerificationRequest> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "{SELECT_WITH_ID} FROM type::record('verification_request', $id)"
            ))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VerificationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "verification_request".into(),
            id: id_str,
        })?;

        Ok(row.try_into_request()?)
    }

    async fn find_pending(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        department_id: Uuid,
    ) -> CohortResult<Option<VerificationRequest>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_WITH_ID} FROM verification_request \
                 WHERE user_id = $user_id AND organization_id = $org_id \
                 AND department_id = $dept_id AND pending_slot = $slot \
                 LIMIT 1"
            ))
            .bind(("user_id", user_id.to_string()))
            .bind(("org_id", organization_id.to_string()))
            .bind(("dept_id", department_id.to_string()))
            .bind(("slot", PENDING_SLOT.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VerificationRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_request())
            .transpose()?)
    }

    async fn resolve(&self, id: Uuid, resolution: Resolution) -> CohortResult<VerificationRequest> {
        let id_str = id.to_string();

        if !resolution.status.is_terminal() {
            return Err(DbError::Decode(format!(
                "cannot resolve verification_request {id_str} to pending"
            ))
            .into());
        }

        let result = self
            .db
            .query(
                "UPDATE type::record('verification_request', $id) SET \
                 status = $status, pending_slot = $id, \
                 rejection_reason = $reason, resolved_at = $resolved_at, \
                 resolved_by = $resolved_by \
                 WHERE status = 'pending'",
            )
            .bind(("id", id_str.clone()))
            .bind(("status", resolution.status.as_str().to_string()))
            .bind(("reason", resolution.rejection_reason))
            .bind(("resolved_at", resolution.resolved_at))
            .bind(("resolved_by", resolution.resolved_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| classify(e, "verification_request", &id_str))?;

        let updated: Vec<StatusRow> = result.take(0).map_err(DbError::from)?;

        // 1. Nothing updated: either someone else resolved it first, or
        //    there is no such request.
        if updated.is_empty() {
            return if self.exists(&id_str).await? {
                Err(DbError::Conflict {
                    entity: "verification_request".into(),
                    id: id_str,
                }
                .into())
            } else {
                Err(DbError::NotFound {
                    entity: "verification_request".into(),
                    id: id_str,
                }
                .into())
            };
        }

        // 2. This caller won; read the record back with its id.
        self.get_by_id(id).await
    }

    async fn list(
        &self,
        scope: ScopeFilter,
        status: Option<VerificationStatus>,
        pagination: Pagination,
    ) -> CohortResult<PaginatedResult<VerificationRequest>> {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        match scope {
            ScopeFilter::All => {}
            ScopeFilter::Organization(org_id) => {
                conditions.push("organization_id = $org_id");
                binds.push(("org_id", org_id.to_string()));
            }
            ScopeFilter::Department(dept_id) => {
                conditions.push("department_id = $dept_id");
                binds.push(("dept_id", dept_id.to_string()));
            }
        }
        if let Some(status) = status {
            conditions.push("status = $status");
            binds.push(("status", status.as_str().to_string()));
        }

        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        Ok(self.page(&filter, binds, pagination).await?)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        pagination: Pagination,
    ) -> CohortResult<PaginatedResult<VerificationRequest>> {
        Ok(self
            .page(
                "WHERE user_id = $user_id",
                vec![("user_id", user_id.to_string())],
                pagination,
            )
            .await?)
    }
}
