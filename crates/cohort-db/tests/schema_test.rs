//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    cohort_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in [
        "organization",
        "department",
        "user",
        "verification_request",
        "audit_log",
        "has_department",
        "_migration",
    ] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    cohort_db::run_migrations(&db).await.unwrap();
    cohort_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unknown_role_names_are_rejected_on_write() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    cohort_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE user SET display_name = 'Mallory', \
             email = 'mallory@example.com', role = 'owner'",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "role outside the hierarchy should be rejected");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_pending_requests() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    cohort_db::run_migrations(&db).await.unwrap();

    let insert = "CREATE verification_request SET user_id = 'u1', \
                  organization_id = 'o7', department_id = 'd42', \
                  status = 'pending', pending_slot = 'pending'";

    db.query(insert).await.unwrap().check().unwrap();
    let second = db.query(insert).await.unwrap().check();
    assert!(second.is_err(), "second pending request should be rejected");

    // Once the first is resolved its slot frees up.
    db.query(
        "UPDATE verification_request SET status = 'rejected', \
         pending_slot = 'r1' WHERE pending_slot = 'pending'",
    )
    .await
    .unwrap()
    .check()
    .unwrap();
    db.query(insert).await.unwrap().check().unwrap();
}

#[tokio::test]
async fn audit_log_rejects_unknown_outcomes() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    cohort_db::run_migrations(&db).await.unwrap();

    db.query(
        "CREATE audit_log SET actor_id = 'a1', \
         action = 'verification.approve', outcome = 'Success'",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let bad_outcome = db
        .query(
            "CREATE audit_log SET actor_id = 'a1', \
             action = 'verification.approve', outcome = 'Maybe'",
        )
        .await
        .unwrap()
        .check();
    assert!(bad_outcome.is_err());
}
