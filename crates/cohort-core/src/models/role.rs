//! Role domain model.
//!
//! The five platform roles form a fixed total order. The order lives in
//! [`Role::ALL`] and nowhere else; roles deliberately do not implement
//! `PartialOrd` so that every comparison goes through the rank.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Global,
    Verified,
    DeptAdmin,
    OrgAdmin,
    SuperAdmin,
}

/// A role name or rank outside the five defined roles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    /// Every role, lowest rank first. Index equals rank.
    pub const ALL: [Role; 5] = [
        Role::Global,
        Role::Verified,
        Role::DeptAdmin,
        Role::OrgAdmin,
        Role::SuperAdmin,
    ];

    pub const fn rank(self) -> u8 {
        match self {
            Role::Global => 0,
            Role::Verified => 1,
            Role::DeptAdmin => 2,
            Role::OrgAdmin => 3,
            Role::SuperAdmin => 4,
        }
    }

    /// Look a role up by its rank.
    pub fn from_rank(rank: u8) -> Result<Self, UnknownRole> {
        Self::ALL
            .get(usize::from(rank))
            .copied()
            .ok_or_else(|| UnknownRole(format!("rank {rank}")))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Global => "global",
            Role::Verified => "verified",
            Role::DeptAdmin => "dept_admin",
            Role::OrgAdmin => "org_admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_index_matches_rank() {
        for (index, role) in Role::ALL.iter().enumerate() {
            assert_eq!(usize::from(role.rank()), index);
        }
    }

    #[test]
    fn names_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_names_and_ranks_are_rejected() {
        assert_eq!(
            "admin".parse::<Role>(),
            Err(UnknownRole("admin".to_string()))
        );
        assert!(Role::from_rank(5).is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Role::DeptAdmin).unwrap();
        assert_eq!(json, "\"dept_admin\"");
    }
}
