//! Authorization and workflow configuration.

use serde::{Deserialize, Serialize};

/// How verification requests filed against an organization that has since
/// been deactivated may still be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InactiveOrganizationPolicy {
    /// Rejections go through so admins can clear the queue; approvals
    /// fail with `OrganizationInactive`. Applies to every role.
    #[default]
    RejectOnly,
    /// Neither approvals nor rejections.
    Block,
    /// Resolve as if the organization were active.
    Allow,
}

impl InactiveOrganizationPolicy {
    pub fn permits_approval(self) -> bool {
        matches!(self, InactiveOrganizationPolicy::Allow)
    }

    pub fn permits_rejection(self) -> bool {
        !matches!(self, InactiveOrganizationPolicy::Block)
    }
}

/// Configuration for the verification workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Maximum length, in characters, of a request message (default: 2000).
    pub max_message_length: usize,
    /// Page size used by scoped listings (default: 50).
    pub default_page_size: u64,
    pub inactive_organization: InactiveOrganizationPolicy,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            default_page_size: 50,
            inactive_organization: InactiveOrganizationPolicy::default(),
        }
    }
}
