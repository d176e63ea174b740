//! Domain models for Cohort.
//!
//! These are the core types shared across all crates.

pub mod actor;
pub mod audit;
pub mod department;
pub mod organization;
pub mod role;
pub mod user;
pub mod verification;
