//! SurrealDB implementation of [`DepartmentRepository`].

use chrono::{DateTime, Utc};
use cohort_core::error::CohortResult;
use cohort_core::models::department::{CreateDepartment, Department};
use cohort_core::repository::{DepartmentRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, classify, parse_uuid};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct DepartmentRow {
    organization_id: String,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

impl DepartmentRow {
    fn into_department(self, id: Uuid) -> Result<Department, DbError> {
        Ok(Department {
            id,
            organization_id: parse_uuid(&self.organization_id, "organization")?,
            name: self.name,
            slug: self.slug,
            created_at: self.created_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct DepartmentRowWithId {
    record_id: String,
    organization_id: String,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

impl DepartmentRowWithId {
    fn try_into_department(self) -> Result<Department, DbError> {
        Ok(Department {
            id: parse_uuid(&self.record_id, "department")?,
            organization_id: parse_uuid(&self.organization_id, "organization")?,
            name: self.name,
            slug: self.slug,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    #[allow(dead_code)]
    record_id: String,
}

/// SurrealDB implementation of the Department repository.
#[derive(Clone)]
pub struct SurrealDepartmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDepartmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DepartmentRepository for SurrealDepartmentRepository<C> {
    async fn create(&self, input: CreateDepartment) -> CohortResult<Department> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let org_id_str = input.organization_id.to_string();

        // RELATE would happily point at a missing organization.
        let mut parent = self
            .db
            .query("SELECT meta::id(id) AS record_id FROM type::record('organization', $org_id)")
            .bind(("org_id", org_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let parents: Vec<IdRow> = parent.take(0).map_err(DbError::from)?;
        if parents.is_empty() {
            return Err(DbError::NotFound {
                entity: "organization".into(),
                id: org_id_str,
            }
            .into());
        }

        // RELATE requires literal record-id syntax; both ids are
        // formatted UUIDs.
        let query = format!(
            "CREATE type::record('department', $id) SET \
             organization_id = $org_id, name = $name, slug = $slug; \
             RELATE organization:`{org_id_str}` \
             -> has_department -> department:`{id_str}`;"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("org_id", org_id_str))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| classify(e, "department", &id_str))?;

        // Statement 0 is the CREATE, statement 1 is the RELATE.
        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "department".into(),
            id: id_str,
        })?;

        Ok(row.into_department(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CohortResult<Department> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('department', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DepartmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "department".into(),
            id: id_str,
        })?;

        Ok(row.into_department(id)?)
    }

    async fn list_by_organization(
        &self,
        organization_id: Uuid,
        pagination: Pagination,
    ) -> CohortResult<PaginatedResult<Department>> {
        let org_id_str = organization_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM department \
                 WHERE organization_id = $org_id GROUP ALL",
            )
            .bind(("org_id", org_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM department \
                 WHERE organization_id = $org_id \
                 ORDER BY created_at ASC, record_id ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("org_id", org_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DepartmentRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_department())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
