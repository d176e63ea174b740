//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use cohort_core::error::CohortResult;
use cohort_core::models::organization::{CreateOrganization, Organization};
use cohort_core::repository::{OrganizationRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, classify, parse_uuid};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    name: String,
    slug: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_organization(self, id: Uuid) -> Organization {
        Organization {
            id,
            name: self.name,
            slug: self.slug,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct OrganizationRowWithId {
    record_id: String,
    name: String,
    slug: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRowWithId {
    fn try_into_organization(self) -> Result<Organization, DbError> {
        Ok(Organization {
            id: parse_uuid(&self.record_id, "organization")?,
            name: self.name,
            slug: self.slug,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Organization repository.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> CohortResult<Organization> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 name = $name, slug = $slug, active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| classify(e, "organization", &id_str))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        Ok(row.into_organization(id))
    }

    async fn get_by_id(&self, id: Uuid) -> CohortResult<Organization> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('organization', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        Ok(row.into_organization(id))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> CohortResult<Organization> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('organization', $id) SET \
                 active = $active, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| classify(e, "organization", &id_str))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        Ok(row.into_organization(id))
    }

    async fn list(&self, pagination: Pagination) -> CohortResult<PaginatedResult<Organization>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM organization GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM organization \
                 ORDER BY created_at ASC, record_id ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_organization())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
