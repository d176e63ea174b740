//! Cohort Core: domain models, error types and the storage contracts
//! shared by every other crate in the workspace.

pub mod error;
pub mod models;
pub mod repository;
