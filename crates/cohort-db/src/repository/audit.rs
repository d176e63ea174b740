//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The `audit_log` table denies update and delete at the schema level;
//! this repository only ever appends.

use chrono::{DateTime, Utc};
use cohort_core::error::CohortResult;
use cohort_core::models::audit::{AuditLogEntry, AuditOutcome, CreateAuditLogEntry};
use cohort_core::repository::AuditLogRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, classify, parse_uuid};

#[derive(Debug, SurrealValue)]
struct AuditRow {
    actor_id: String,
    action: String,
    resource_id: Option<String>,
    outcome: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    actor_id: String,
    action: String,
    resource_id: Option<String>,
    outcome: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

fn parse_outcome(s: &str) -> Result<AuditOutcome, DbError> {
    match s {
        "Success" => Ok(AuditOutcome::Success),
        "Failure" => Ok(AuditOutcome::Failure),
        "Denied" => Ok(AuditOutcome::Denied),
        other => Err(DbError::Decode(format!("unknown audit outcome: {other}"))),
    }
}

fn parse_resource(value: Option<&str>) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(v, "resource")).transpose()
}

impl AuditRow {
    fn into_entry(self, id: Uuid) -> Result<AuditLogEntry, DbError> {
        Ok(AuditLogEntry {
            id,
            actor_id: parse_uuid(&self.actor_id, "actor")?,
            action: self.action,
            resource_id: parse_resource(self.resource_id.as_deref())?,
            outcome: parse_outcome(&self.outcome)?,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        Ok(AuditLogEntry {
            id: parse_uuid(&self.record_id, "audit_log")?,
            actor_id: parse_uuid(&self.actor_id, "actor")?,
            action: self.action,
            resource_id: parse_resource(self.resource_id.as_deref())?,
            outcome: parse_outcome(&self.outcome)?,
            metadata: self.metadata,
            timestamp: self.timestamp,
        })
    }
}

/// SurrealDB implementation of the audit trail.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditLogEntry) -> CohortResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 actor_id = $actor_id, action = $action, \
                 resource_id = $resource_id, outcome = $outcome, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", input.actor_id.to_string()))
            .bind(("action", input.action))
            .bind(("resource_id", input.resource_id.map(|v| v.to_string())))
            .bind(("outcome", input.outcome.as_str().to_string()))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| classify(e, "audit_log", &id_str))?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        Ok(row.into_entry(id)?)
    }

    async fn list_by_resource(&self, resource_id: Uuid) -> CohortResult<Vec<AuditLogEntry>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM audit_log \
                 WHERE resource_id = $resource_id \
                 ORDER BY timestamp ASC",
            )
            .bind(("resource_id", resource_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRowWithId> = result.take(0).map_err(DbError::from)?;
        let entries = rows
            .into_iter()
            .map(|row| row.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(entries)
    }
}
