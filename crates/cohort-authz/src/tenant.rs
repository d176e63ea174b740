//! Tenant administration for organizations and departments.

use cohort_core::models::actor::Actor;
use cohort_core::models::role::Role;
use cohort_core::models::department::{CreateDepartment, Department};
use cohort_core::models::organization::{CreateOrganization, Organization};
use cohort_core::repository::{DepartmentRepository, OrganizationRepository, Pagination};
use tracing::info;
use uuid::Uuid;

use crate::error::AuthzError;
use crate::gate::{Action, authorize};
use crate::scope::Target;
use crate::tenant_tree::TenantTree;

/// Upper bound on page size when walking the whole platform.
const TREE_PAGE_SIZE: u64 = 200;

pub struct TenantService<O: OrganizationRepository, D: DepartmentRepository> {
    org_repo: O,
    dept_repo: D,
}

impl<O: OrganizationRepository, D: DepartmentRepository> TenantService<O, D> {
    pub fn new(org_repo: O, dept_repo: D) -> Self {
        Self { org_repo, dept_repo }
    }

    /// Create an organization. Platform admins only.
    pub async fn create_organization(
        &self,
        actor: Option<&Actor>,
        input: CreateOrganization,
    ) -> Result<Organization, AuthzError> {
        authorize(
            &TenantTree::new(),
            actor,
            &Action::CREATE_ORGANIZATION,
            Target::Platform,
        )?
        .into_result()?;

        let org = self.org_repo.create(input).await?;
        info!(organization_id = %org.id, slug = %org.slug, "Organization created");
        Ok(org)
    }

    /// Activate or deactivate an organization. Deactivation keeps every
    /// record readable; it only stops new verification requests.
    pub async fn set_organization_active(
        &self,
        actor: Option<&Actor>,
        organization_id: Uuid,
        active: bool,
    ) -> Result<Organization, AuthzError> {
        authorize(
            &TenantTree::new(),
            actor,
            &Action::SET_ORGANIZATION_ACTIVE,
            Target::Platform,
        )?
        .into_result()?;

        let org = self.org_repo.set_active(organization_id, active).await?;
        info!(organization_id = %org.id, active, "Organization activity changed");
        Ok(org)
    }

    /// Create a department under an organization the caller administers.
    pub async fn create_department(
        &self,
        actor: Option<&Actor>,
        input: CreateDepartment,
    ) -> Result<Department, AuthzError> {
        let action = Action::CREATE_DEPARTMENT;
        authorize(&TenantTree::new(), actor, &action.without_scope(), Target::Platform)?
            .into_result()?;

        let org = self.org_repo.get_by_id(input.organization_id).await?;
        let mut tree = TenantTree::new();
        tree.insert_organization(&org);
        authorize(&tree, actor, &action, Target::Organization(org.id))?.into_result()?;

        if !org.active {
            return Err(AuthzError::OrganizationInactive);
        }

        let dept = self.dept_repo.create(input).await?;
        info!(
            department_id = %dept.id,
            organization_id = %dept.organization_id,
            "Department created"
        );
        Ok(dept)
    }

    /// Check a role and placement against stored records before a user
    /// is given them. Unknown ids are `NotFound`.
    pub async fn check_placement(
        &self,
        role: Role,
        organization_id: Option<Uuid>,
        department_id: Option<Uuid>,
    ) -> Result<(), AuthzError> {
        let mut tree = TenantTree::new();
        if let Some(org_id) = organization_id {
            tree.insert_organization(&self.org_repo.get_by_id(org_id).await?);
        }
        if let Some(dept_id) = department_id {
            let dept = self.dept_repo.get_by_id(dept_id).await?;
            if organization_id != Some(dept.organization_id) {
                return Err(AuthzError::InvalidPlacement {
                    organization_id: organization_id
                        .map_or_else(|| "none".to_string(), |id| id.to_string()),
                    department_id: dept.id.to_string(),
                });
            }
            tree.insert_department(&dept)?;
        }

        if !tree.validate_placement(role, organization_id, department_id) {
            return Err(AuthzError::RoleRequiresPlacement { role });
        }
        Ok(())
    }

    /// Snapshot the whole platform's tenant tree.
    pub async fn load_tree(&self) -> Result<TenantTree, AuthzError> {
        let mut tree = TenantTree::new();
        let mut organizations = Vec::new();

        let mut offset = 0;
        loop {
            let page = self
                .org_repo
                .list(Pagination {
                    offset,
                    limit: TREE_PAGE_SIZE,
                })
                .await?;
            let fetched = page.items.len() as u64;
            organizations.extend(page.items);
            offset += fetched;
            if fetched < TREE_PAGE_SIZE || offset >= page.total {
                break;
            }
        }

        for org in &organizations {
            tree.insert_organization(org);
        }

        for org in &organizations {
            let mut offset = 0;
            loop {
                let page = self
                    .dept_repo
                    .list_by_organization(
                        org.id,
                        Pagination {
                            offset,
                            limit: TREE_PAGE_SIZE,
                        },
                    )
                    .await?;
                let fetched = page.items.len() as u64;
                for dept in &page.items {
                    tree.insert_department(dept)?;
                }
                offset += fetched;
                if fetched < TREE_PAGE_SIZE || offset >= page.total {
                    break;
                }
            }
        }

        Ok(tree)
    }
}
