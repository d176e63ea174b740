//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (platform scope)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD slug ON TABLE organization TYPE string;
DEFINE FIELD active ON TABLE organization TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_slug ON TABLE organization \
    COLUMNS slug UNIQUE;

-- =======================================================================
-- Departments (organization scope, parent fixed at creation)
-- =======================================================================
DEFINE TABLE department SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE department TYPE string READONLY;
DEFINE FIELD name ON TABLE department TYPE string;
DEFINE FIELD slug ON TABLE department TYPE string;
DEFINE FIELD created_at ON TABLE department TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_department_org_slug ON TABLE department \
    COLUMNS organization_id, slug UNIQUE;

-- =======================================================================
-- Users (placement is optional until verified)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD display_name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['global', 'verified', 'dept_admin', 'org_admin', \
    'super_admin'];
DEFINE FIELD organization_id ON TABLE user TYPE option<string>;
DEFINE FIELD department_id ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_department ON TABLE user COLUMNS department_id;

-- =======================================================================
-- Verification requests
--
-- pending_slot is 'pending' while the request is open and the request's
-- own id once resolved, so the unique index admits at most one pending
-- request per (user, organization, department) and any number of
-- resolved ones.
-- =======================================================================
DEFINE TABLE verification_request SCHEMAFULL;
DEFINE FIELD user_id ON TABLE verification_request TYPE string READONLY;
DEFINE FIELD organization_id ON TABLE verification_request TYPE string \
    READONLY;
DEFINE FIELD department_id ON TABLE verification_request TYPE string \
    READONLY;
DEFINE FIELD status ON TABLE verification_request TYPE string \
    ASSERT $value IN ['pending', 'approved', 'rejected'];
DEFINE FIELD pending_slot ON TABLE verification_request TYPE string;
DEFINE FIELD message ON TABLE verification_request TYPE option<string>;
DEFINE FIELD rejection_reason ON TABLE verification_request \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE verification_request TYPE datetime \
    DEFAULT time::now() READONLY;
DEFINE FIELD resolved_at ON TABLE verification_request \
    TYPE option<datetime>;
DEFINE FIELD resolved_by ON TABLE verification_request \
    TYPE option<string>;
DEFINE INDEX idx_verification_pending ON TABLE verification_request \
    COLUMNS user_id, organization_id, department_id, pending_slot UNIQUE;
DEFINE INDEX idx_verification_org_status ON TABLE verification_request \
    COLUMNS organization_id, status;
DEFINE INDEX idx_verification_dept_status ON TABLE verification_request \
    COLUMNS department_id, status;
DEFINE INDEX idx_verification_user ON TABLE verification_request \
    COLUMNS user_id;

-- =======================================================================
-- Audit Log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD actor_id ON TABLE audit_log TYPE string;
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD resource_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD outcome ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Denied'];
DEFINE FIELD metadata ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_resource_time ON TABLE audit_log \
    COLUMNS resource_id, timestamp;
DEFINE INDEX idx_audit_actor ON TABLE audit_log COLUMNS actor_id;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- Organization -> Department containment
DEFINE TABLE has_department TYPE RELATION SCHEMAFULL;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
