//! Role hierarchy predicates.
//!
//! The order itself is the fixed table [`Role::ALL`]; there is no way to
//! reorder or extend it at runtime.

use cohort_core::models::role::Role;

use crate::error::AuthzError;

pub fn rank(role: Role) -> u8 {
    role.rank()
}

/// Resolve a stored rank back to a role, failing loudly on corruption.
pub fn role_at(rank: u8) -> Result<Role, AuthzError> {
    Ok(Role::from_rank(rank)?)
}

/// Parse a stored role name, failing loudly on corruption.
pub fn parse_role(name: &str) -> Result<Role, AuthzError> {
    Ok(name.parse::<Role>()?)
}

pub fn has_exact_role(actor_role: Role, required_role: Role) -> bool {
    actor_role == required_role
}

pub fn has_min_role(actor_role: Role, min_role: Role) -> bool {
    rank(actor_role) >= rank(min_role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_role_matches_rank_comparison() {
        for a in Role::ALL {
            for b in Role::ALL {
                assert_eq!(has_min_role(a, b), rank(a) >= rank(b), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn min_role_is_reflexive() {
        for role in Role::ALL {
            assert!(has_min_role(role, role));
        }
    }

    #[test]
    fn min_role_is_transitive() {
        for a in Role::ALL {
            for b in Role::ALL {
                for c in Role::ALL {
                    if has_min_role(a, b) && has_min_role(b, c) {
                        assert!(has_min_role(a, c), "{a} >= {b} >= {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn exact_role_is_strict() {
        assert!(has_exact_role(Role::OrgAdmin, Role::OrgAdmin));
        assert!(!has_exact_role(Role::SuperAdmin, Role::OrgAdmin));
        assert!(!has_exact_role(Role::DeptAdmin, Role::OrgAdmin));
    }

    #[test]
    fn ranks_follow_the_documented_order() {
        assert_eq!(rank(Role::Global), 0);
        assert_eq!(rank(Role::Verified), 1);
        assert_eq!(rank(Role::DeptAdmin), 2);
        assert_eq!(rank(Role::OrgAdmin), 3);
        assert_eq!(rank(Role::SuperAdmin), 4);
    }

    #[test]
    fn corrupt_values_are_errors_not_denials() {
        assert!(matches!(role_at(9), Err(AuthzError::UnknownRole(_))));
        assert!(matches!(parse_role("owner"), Err(AuthzError::UnknownRole(_))));
        assert_eq!(parse_role("org_admin").unwrap(), Role::OrgAdmin);
    }
}
