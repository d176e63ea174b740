//! SurrealDB repository implementations.

mod audit;
mod department;
mod organization;
mod user;
mod verification;

pub use audit::SurrealAuditLogRepository;
pub use department::SurrealDepartmentRepository;
pub use organization::SurrealOrganizationRepository;
pub use user::SurrealUserRepository;
pub use verification::SurrealVerificationRepository;
