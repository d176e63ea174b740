//! SurrealDB implementation of [`UserRepository`] and
//! [`UserAffiliationWriter`].
//!
//! Roles are stored by name. A name outside the hierarchy fails the read
//! with [`DbError::UnknownRole`] instead of falling back to a default.

use chrono::{DateTime, Utc};
use cohort_core::error::CohortResult;
use cohort_core::models::role::Role;
use cohort_core::models::user::{Affiliation, CreateUser, User};
use cohort_core::repository::{UserAffiliationWriter, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, classify, parse_uuid};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    display_name: String,
    email: String,
    role: String,
    organization_id: Option<String>,
    department_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        let organization_id = self
            .organization_id
            .as_deref()
            .map(|v| parse_uuid(v, "organization"))
            .transpose()?;
        let department_id = self
            .department_id
            .as_deref()
            .map(|v| parse_uuid(v, "department"))
            .transpose()?;
        Ok(User {
            id,
            display_name: self.display_name,
            email: self.email,
            role: self.role.parse::<Role>()?,
            organization_id,
            department_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> CohortResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 display_name = $display_name, email = $email, \
                 role = $role, organization_id = $organization_id, \
                 department_id = $department_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("display_name", input.display_name))
            .bind(("email", input.email))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("organization_id", input.organization_id.map(|v| v.to_string())))
            .bind(("department_id", input.department_id.map(|v| v.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| classify(e, "user", &id_str))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CohortResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }
}

impl<C: Connection> UserAffiliationWriter for SurrealUserRepository<C> {
    async fn affiliate(&self, user_id: Uuid, affiliation: Affiliation) -> CohortResult<User> {
        let id_str = user_id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 role = $role, organization_id = $organization_id, \
                 department_id = $department_id, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("role", affiliation.role.as_str().to_string()))
            .bind(("organization_id", affiliation.organization_id.to_string()))
            .bind(("department_id", affiliation.department_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| classify(e, "user", &id_str))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(user_id)?)
    }
}
