//! Cohort operator CLI.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cohort_authz::error::AuthzError;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "cohort_cli=info,cohort_authz=info,cohort_db=info";

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if cli.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Exit status for a failed command.
///
/// 3: lost a race (already resolved, duplicate pending); re-read and retry.
/// 4: stored data is inconsistent.
/// 5: the transition committed but a follow-up step failed.
/// 1: anything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AuthzError>() {
        Some(e) if e.is_expected_race() => 3,
        Some(e) if e.is_integrity_violation() => 4,
        Some(e) if e.committed_request().is_some() => 5,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(exit_code(&AuthzError::AlreadyResolved.into()), 3);
        assert_eq!(exit_code(&AuthzError::DuplicatePending.into()), 3);
        assert_eq!(
            exit_code(&AuthzError::UnresolvableTarget("department d9".into()).into()),
            4
        );
        assert_eq!(exit_code(&AuthzError::OutOfScope.into()), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("connection refused")), 1);
    }
}
