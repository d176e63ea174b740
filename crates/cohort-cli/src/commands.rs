//! Command execution.
//!
//! Every workflow command acts as a stored user (`--as <id>`): the actor
//! is rebuilt from the user record so role and placement come from the
//! store, not from flags.

use anyhow::{Context, bail};
use cohort_authz::tenant::TenantService;
use cohort_authz::verification::{SubmitInput, VerificationService};
use cohort_core::error::CohortError;
use cohort_core::models::actor::Actor;
use cohort_core::models::department::CreateDepartment;
use cohort_core::models::organization::CreateOrganization;
use cohort_core::models::user::CreateUser;
use cohort_core::repository::{Pagination, UserRepository};
use cohort_db::repository::{
    SurrealAuditLogRepository, SurrealDepartmentRepository, SurrealOrganizationRepository,
    SurrealUserRepository, SurrealVerificationRepository,
};
use cohort_db::{DbManager, run_migrations};
use serde::Serialize;
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use tracing::info;
use uuid::Uuid;

use crate::cli::{Cli, Commands, DeptCommands, OrgCommands, RequestCommands, UserCommands};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_config = cli.db.resolve();
    let authz_config = cli.workflow.resolve();

    let manager = DbManager::connect(&db_config)
        .await
        .with_context(|| format!("failed to connect to SurrealDB at {}", db_config.url))?;
    let db = manager.client().clone();

    match cli.command {
        Commands::Migrate => {
            run_migrations(&db).await.context("migration failed")?;
            info!("Schema is up to date");
        }
        Commands::Org { cmd } => org(&db, cmd).await?,
        Commands::Dept { cmd } => dept(&db, cmd).await?,
        Commands::User { cmd } => user(&db, cmd).await?,
        Commands::Request { cmd } => {
            let svc = VerificationService::new(
                SurrealOrganizationRepository::new(db.clone()),
                SurrealDepartmentRepository::new(db.clone()),
                SurrealUserRepository::new(db.clone()),
                SurrealVerificationRepository::new(db.clone()),
                SurrealAuditLogRepository::new(db.clone()),
                authz_config,
            );
            request(&db, &svc, cmd).await?;
        }
        Commands::Tree => {
            let tree = tenant_service(&db).load_tree().await?;
            let orgs: Vec<_> = tree
                .organizations()
                .into_iter()
                .map(|(id, active)| {
                    json!({
                        "organization_id": id,
                        "active": active,
                        "departments": tree.departments_of(id),
                    })
                })
                .collect();
            print_json(&orgs)?;
        }
    }

    Ok(())
}

fn tenant_service(
    db: &Surreal<Client>,
) -> TenantService<SurrealOrganizationRepository<Client>, SurrealDepartmentRepository<Client>> {
    TenantService::new(
        SurrealOrganizationRepository::new(db.clone()),
        SurrealDepartmentRepository::new(db.clone()),
    )
}

async fn load_actor(db: &Surreal<Client>, user_id: Uuid) -> anyhow::Result<Actor> {
    match SurrealUserRepository::new(db.clone()).get_by_id(user_id).await {
        Ok(user) => Ok(Actor::from(&user)),
        Err(CohortError::NotFound { .. }) => bail!("acting user {user_id} does not exist"),
        Err(e) => Err(e.into()),
    }
}

async fn org(db: &Surreal<Client>, cmd: OrgCommands) -> anyhow::Result<()> {
    let svc = tenant_service(db);
    let organization = match cmd {
        OrgCommands::Create { actor, name, slug } => {
            let actor = load_actor(db, actor).await?;
            svc.create_organization(Some(&actor), CreateOrganization { name, slug })
                .await?
        }
        OrgCommands::Activate { actor, id } => {
            let actor = load_actor(db, actor).await?;
            svc.set_organization_active(Some(&actor), id, true).await?
        }
        OrgCommands::Deactivate { actor, id } => {
            let actor = load_actor(db, actor).await?;
            svc.set_organization_active(Some(&actor), id, false).await?
        }
    };
    print_json(&organization)
}

async fn dept(db: &Surreal<Client>, cmd: DeptCommands) -> anyhow::Result<()> {
    match cmd {
        DeptCommands::Create {
            actor,
            org,
            name,
            slug,
        } => {
            let actor = load_actor(db, actor).await?;
            let dept = tenant_service(db)
                .create_department(
                    Some(&actor),
                    CreateDepartment {
                        organization_id: org,
                        name,
                        slug,
                    },
                )
                .await?;
            print_json(&dept)
        }
    }
}

async fn user(db: &Surreal<Client>, cmd: UserCommands) -> anyhow::Result<()> {
    let repo = SurrealUserRepository::new(db.clone());
    let user = match cmd {
        UserCommands::Create {
            name,
            email,
            role,
            org,
            dept,
        } => {
            tenant_service(db)
                .check_placement(role, org, dept)
                .await
                .context("refusing to create user")?;
            let user = repo
                .create(CreateUser {
                    display_name: name,
                    email,
                    role,
                    organization_id: org,
                    department_id: dept,
                })
                .await?;
            info!(user_id = %user.id, role = %user.role, "User created");
            user
        }
        UserCommands::Show { id } => repo.get_by_id(id).await?,
    };
    print_json(&user)
}

type Workflow = VerificationService<
    SurrealOrganizationRepository<Client>,
    SurrealDepartmentRepository<Client>,
    SurrealUserRepository<Client>,
    SurrealVerificationRepository<Client>,
    SurrealAuditLogRepository<Client>,
>;

async fn request(db: &Surreal<Client>, svc: &Workflow, cmd: RequestCommands) -> anyhow::Result<()> {
    match cmd {
        RequestCommands::Submit {
            actor,
            org,
            dept,
            message,
        } => {
            let actor = load_actor(db, actor).await?;
            let request = svc
                .submit(
                    Some(&actor),
                    SubmitInput {
                        organization_id: org,
                        department_id: dept,
                        message,
                    },
                )
                .await?;
            print_json(&request)
        }
        RequestCommands::Approve { actor, id } => {
            let actor = load_actor(db, actor).await?;
            print_json(&svc.approve(Some(&actor), id).await?)
        }
        RequestCommands::Reject { actor, id, reason } => {
            let actor = load_actor(db, actor).await?;
            print_json(&svc.reject(Some(&actor), id, &reason).await?)
        }
        RequestCommands::Show { actor, id } => {
            let actor = load_actor(db, actor).await?;
            print_json(&svc.get_request(Some(&actor), id).await?)
        }
        RequestCommands::Mine { actor } => {
            let actor = load_actor(db, actor).await?;
            let mut items = Vec::new();
            let mut pagination = Pagination::default();
            loop {
                let page = svc.list_for_user(Some(&actor), pagination).await?;
                let fetched = page.items.len() as u64;
                items.extend(page.items);
                pagination.offset += fetched;
                if fetched < pagination.limit || pagination.offset >= page.total {
                    break;
                }
            }
            print_json(&items)
        }
        RequestCommands::List { actor, status } => {
            let actor = load_actor(db, actor).await?;
            let mut listing = svc.list_for_scope(Some(&actor), status).await?;
            let items = listing.collect_all().await?;
            print_json(&items)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
