//! Cohort Authz: role hierarchy, tenant scoping, the authorization gate
//! and the verification workflow built on top of them.

pub mod config;
pub mod error;
pub mod gate;
pub mod hierarchy;
pub mod scope;
pub mod tenant;
pub mod tenant_tree;
pub mod verification;

pub use config::{AuthzConfig, InactiveOrganizationPolicy};
pub use error::AuthzError;
pub use gate::{Action, Decision, DenyReason, authorize};
pub use scope::{ScopeResolver, Target};
pub use tenant::TenantService;
pub use tenant_tree::TenantTree;
pub use verification::{ScopedListing, SubmitInput, VerificationService};
