//! Integration tests for the organization and department repositories
//! using in-memory SurrealDB.

use cohort_core::error::CohortError;
use cohort_core::models::department::CreateDepartment;
use cohort_core::models::organization::CreateOrganization;
use cohort_core::repository::{DepartmentRepository, OrganizationRepository, Pagination};
use cohort_db::repository::{SurrealDepartmentRepository, SurrealOrganizationRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    cohort_db::run_migrations(&db).await.unwrap();
    db
}

fn org_input(slug: &str) -> CreateOrganization {
    CreateOrganization {
        name: slug.to_uppercase(),
        slug: slug.into(),
    }
}

// -----------------------------------------------------------------------
// Organization tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_organization() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let org = repo.create(org_input("acme")).await.unwrap();
    assert_eq!(org.slug, "acme");
    assert!(org.active, "new organizations start active");

    let fetched = repo.get_by_id(org.id).await.unwrap();
    assert_eq!(fetched.id, org.id);
    assert_eq!(fetched.name, "ACME");
}

#[tokio::test]
async fn duplicate_organization_slug_is_already_exists() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    repo.create(org_input("acme")).await.unwrap();
    let err = repo.create(org_input("acme")).await.unwrap_err();
    assert!(matches!(err, CohortError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn missing_organization_is_not_found() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CohortError::NotFound { .. }));

    let err = repo.set_active(Uuid::new_v4(), false).await.unwrap_err();
    assert!(matches!(err, CohortError::NotFound { .. }));
}

#[tokio::test]
async fn deactivate_and_reactivate_organization() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    let org = repo.create(org_input("acme")).await.unwrap();

    let inactive = repo.set_active(org.id, false).await.unwrap();
    assert!(!inactive.active);
    assert!(!repo.get_by_id(org.id).await.unwrap().active);

    let active = repo.set_active(org.id, true).await.unwrap();
    assert!(active.active);
}

#[tokio::test]
async fn list_organizations_paginates() {
    let db = setup().await;
    let repo = SurrealOrganizationRepository::new(db);

    for slug in ["a", "b", "c"] {
        repo.create(org_input(slug)).await.unwrap();
    }

    let first = repo
        .list(Pagination {
            offset: 0,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.items.len(), 2);

    let second = repo
        .list(Pagination {
            offset: 2,
            limit: 2,
        })
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
}

// -----------------------------------------------------------------------
// Department tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_department_under_organization() {
    let db = setup().await;
    let orgs = SurrealOrganizationRepository::new(db.clone());
    let depts = SurrealDepartmentRepository::new(db);

    let org = orgs.create(org_input("acme")).await.unwrap();
    let dept = depts
        .create(CreateDepartment {
            organization_id: org.id,
            name: "Chemistry".into(),
            slug: "chem".into(),
        })
        .await
        .unwrap();

    assert_eq!(dept.organization_id, org.id);
    let fetched = depts.get_by_id(dept.id).await.unwrap();
    assert_eq!(fetched.organization_id, org.id);
    assert_eq!(fetched.slug, "chem");
}

#[tokio::test]
async fn department_requires_existing_organization() {
    let db = setup().await;
    let depts = SurrealDepartmentRepository::new(db);

    let err = depts
        .create(CreateDepartment {
            organization_id: Uuid::new_v4(),
            name: "Orphan".into(),
            slug: "orphan".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CohortError::NotFound { ref entity, .. } if entity == "organization"));
}

#[tokio::test]
async fn department_slugs_are_unique_per_organization() {
    let db = setup().await;
    let orgs = SurrealOrganizationRepository::new(db.clone());
    let depts = SurrealDepartmentRepository::new(db);

    let a = orgs.create(org_input("a")).await.unwrap();
    let b = orgs.create(org_input("b")).await.unwrap();

    let input = |organization_id| CreateDepartment {
        organization_id,
        name: "Physics".into(),
        slug: "physics".into(),
    };

    depts.create(input(a.id)).await.unwrap();
    // Same slug in another organization is fine.
    depts.create(input(b.id)).await.unwrap();

    let err = depts.create(input(a.id)).await.unwrap_err();
    assert!(matches!(err, CohortError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn list_departments_by_organization() {
    let db = setup().await;
    let orgs = SurrealOrganizationRepository::new(db.clone());
    let depts = SurrealDepartmentRepository::new(db);

    let a = orgs.create(org_input("a")).await.unwrap();
    let b = orgs.create(org_input("b")).await.unwrap();

    for slug in ["x", "y"] {
        depts
            .create(CreateDepartment {
                organization_id: a.id,
                name: slug.into(),
                slug: slug.into(),
            })
            .await
            .unwrap();
    }
    depts
        .create(CreateDepartment {
            organization_id: b.id,
            name: "z".into(),
            slug: "z".into(),
        })
        .await
        .unwrap();

    let page = depts
        .list_by_organization(a.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|d| d.organization_id == a.id));
}
