//! Command-line definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use cohort_authz::config::{AuthzConfig, InactiveOrganizationPolicy};
use cohort_core::models::role::Role;
use cohort_core::models::verification::VerificationStatus;
use cohort_db::DbConfig;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cohort")]
#[command(about = "Cohort - operator CLI for organization and department membership")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(flatten)]
    pub db: DbArgs,

    #[command(flatten)]
    pub workflow: WorkflowArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags. Each one overrides its `COHORT_DB_*` variable.
#[derive(Args)]
pub struct DbArgs {
    #[arg(long, global = true, help = "SurrealDB WebSocket address")]
    pub db_url: Option<String>,

    #[arg(long, global = true)]
    pub db_namespace: Option<String>,

    #[arg(long, global = true)]
    pub db_database: Option<String>,

    #[arg(long, global = true)]
    pub db_username: Option<String>,

    #[arg(long, global = true)]
    pub db_password: Option<String>,
}

impl DbArgs {
    pub fn resolve(&self) -> DbConfig {
        let mut config = DbConfig::from_env();
        if let Some(url) = &self.db_url {
            config.url = url.clone();
        }
        if let Some(namespace) = &self.db_namespace {
            config.namespace = namespace.clone();
        }
        if let Some(database) = &self.db_database {
            config.database = database.clone();
        }
        if let Some(username) = &self.db_username {
            config.username = username.clone();
        }
        if let Some(password) = &self.db_password {
            config.password = password.clone();
        }
        config
    }
}

#[derive(Args)]
pub struct WorkflowArgs {
    #[arg(long, global = true, help = "Maximum request message length in characters")]
    pub max_message_length: Option<usize>,

    #[arg(long, global = true, help = "Page size for scoped listings")]
    pub page_size: Option<u64>,

    #[arg(long, global = true, value_enum, help = "How requests in a deactivated organization resolve")]
    pub inactive_organization: Option<PolicyArg>,
}

impl WorkflowArgs {
    pub fn resolve(&self) -> AuthzConfig {
        let mut config = AuthzConfig::default();
        if let Some(max) = self.max_message_length {
            config.max_message_length = max;
        }
        if let Some(size) = self.page_size {
            config.default_page_size = size;
        }
        if let Some(policy) = self.inactive_organization {
            config.inactive_organization = policy.into();
        }
        config
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    RejectOnly,
    Block,
    Allow,
}

impl From<PolicyArg> for InactiveOrganizationPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::RejectOnly => InactiveOrganizationPolicy::RejectOnly,
            PolicyArg::Block => InactiveOrganizationPolicy::Block,
            PolicyArg::Allow => InactiveOrganizationPolicy::Allow,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending schema migrations")]
    Migrate,

    #[command(about = "Organization administration")]
    Org {
        #[command(subcommand)]
        cmd: OrgCommands,
    },

    #[command(about = "Department administration")]
    Dept {
        #[command(subcommand)]
        cmd: DeptCommands,
    },

    #[command(about = "User bootstrap")]
    User {
        #[command(subcommand)]
        cmd: UserCommands,
    },

    #[command(about = "Verification requests")]
    Request {
        #[command(subcommand)]
        cmd: RequestCommands,
    },

    #[command(about = "Print the tenant tree")]
    Tree,
}

#[derive(Subcommand)]
pub enum OrgCommands {
    Create {
        /// Acting user id.
        #[arg(long = "as")]
        actor: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
    },
    Activate {
        #[arg(long = "as")]
        actor: Uuid,
        id: Uuid,
    },
    Deactivate {
        #[arg(long = "as")]
        actor: Uuid,
        id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum DeptCommands {
    Create {
        #[arg(long = "as")]
        actor: Uuid,
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Insert a user directly. Meant for seeding the first platform admin.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, value_parser = parse_role, default_value = "global")]
        role: Role,
        #[arg(long)]
        org: Option<Uuid>,
        #[arg(long)]
        dept: Option<Uuid>,
    },
    Show {
        id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum RequestCommands {
    Submit {
        #[arg(long = "as")]
        actor: Uuid,
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        dept: Uuid,
        #[arg(long)]
        message: Option<String>,
    },
    Approve {
        #[arg(long = "as")]
        actor: Uuid,
        id: Uuid,
    },
    Reject {
        #[arg(long = "as")]
        actor: Uuid,
        id: Uuid,
        #[arg(long)]
        reason: String,
    },
    Show {
        #[arg(long = "as")]
        actor: Uuid,
        id: Uuid,
    },
    /// Requests filed by the acting user.
    Mine {
        #[arg(long = "as")]
        actor: Uuid,
    },
    /// Every request inside the acting admin's scope.
    List {
        #[arg(long = "as")]
        actor: Uuid,
        #[arg(long, value_parser = parse_status)]
        status: Option<VerificationStatus>,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse::<Role>().map_err(|e| e.to_string())
}

fn parse_status(s: &str) -> Result<VerificationStatus, String> {
    s.parse::<VerificationStatus>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_request_list_with_status() {
        let actor = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "cohort",
            "request",
            "list",
            "--as",
            &actor.to_string(),
            "--status",
            "pending",
        ])
        .unwrap();
        match cli.command {
            Commands::Request {
                cmd: RequestCommands::List { actor: a, status },
            } => {
                assert_eq!(a, actor);
                assert_eq!(status, Some(VerificationStatus::Pending));
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn workflow_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "cohort",
            "--inactive-organization",
            "block",
            "--page-size",
            "10",
            "tree",
        ])
        .unwrap();
        let config = cli.workflow.resolve();
        assert_eq!(config.inactive_organization, InactiveOrganizationPolicy::Block);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_message_length, 2000);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = Cli::try_parse_from([
            "cohort", "user", "create", "--name", "x", "--email", "x@y", "--role", "owner",
        ]);
        assert!(result.is_err());
    }
}
