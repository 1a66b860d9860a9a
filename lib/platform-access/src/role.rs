//! Role assignments and role-based checks.
//!
//! Roles are named and leveled. A higher level is more privileged. The
//! backend returns assignments as `{role_name, role_level}` pairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles the application gives special meaning to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operates the whole platform.
    SuperAdmin,
    /// Administers one company.
    CompanyAdmin,
    /// Administers one branch of a company.
    BranchAdmin,
    /// Buys tags and manages their own pets.
    Customer,
}

impl Role {
    /// Returns the role name as stored in the backend.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::CompanyAdmin => "company_admin",
            Self::BranchAdmin => "branch_admin",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role held by a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Role name, e.g. `super_admin`.
    pub role_name: String,
    /// Privilege level; higher is more privileged.
    pub role_level: i32,
}

impl RoleAssignment {
    /// Creates an assignment.
    #[must_use]
    pub fn new(role_name: impl Into<String>, role_level: i32) -> Self {
        Self {
            role_name: role_name.into(),
            role_level,
        }
    }
}

/// A raw assignment row, before filtering.
///
/// Produced by the direct relational query used when the role
/// remote procedure is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignmentRecord {
    /// Role name from the joined role definition.
    pub role_name: String,
    /// Role level from the joined role definition.
    pub role_level: i32,
    /// Whether the assignment is switched on.
    pub is_active: bool,
    /// When the assignment lapses, if ever.
    pub expires_at: Option<DateTime<Utc>>,
}

impl RoleAssignmentRecord {
    /// Returns true if the assignment grants its role at `now`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires| expires > now)
    }
}

/// The set of roles held by a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: Vec<RoleAssignment>,
}

impl RoleSet {
    /// Creates an empty role set (no privileges).
    #[must_use]
    pub fn none() -> Self {
        Self { roles: Vec::new() }
    }

    /// Creates a role set from assignments, keeping their order.
    #[must_use]
    pub fn new(roles: Vec<RoleAssignment>) -> Self {
        Self { roles }
    }

    /// Builds a role set from raw assignment rows.
    ///
    /// Inactive and expired rows are dropped and the remainder is ordered
    /// by descending level.
    #[must_use]
    pub fn from_records(records: Vec<RoleAssignmentRecord>, now: DateTime<Utc>) -> Self {
        let mut roles: Vec<RoleAssignment> = records
            .into_iter()
            .filter(|record| record.is_effective_at(now))
            .map(|record| RoleAssignment::new(record.role_name, record.role_level))
            .collect();
        roles.sort_by(|a, b| b.role_level.cmp(&a.role_level));
        Self { roles }
    }

    /// Returns true if any assignment is named `name`.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role.role_name == name)
    }

    /// Returns true if any assignment has a level of at least `level`.
    #[must_use]
    pub fn has_minimum_role(&self, level: i32) -> bool {
        self.roles.iter().any(|role| role.role_level >= level)
    }

    /// Returns true if the well-known `role` is held.
    #[must_use]
    pub fn has(&self, role: Role) -> bool {
        self.has_role(role.as_str())
    }

    /// Returns true if `super_admin` is held.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.has(Role::SuperAdmin)
    }

    /// Returns true if `company_admin` is held.
    #[must_use]
    pub fn is_company_admin(&self) -> bool {
        self.has(Role::CompanyAdmin)
    }

    /// Returns true if `branch_admin` is held.
    #[must_use]
    pub fn is_branch_admin(&self) -> bool {
        self.has(Role::BranchAdmin)
    }

    /// Returns true if `customer` is held.
    #[must_use]
    pub fn is_customer(&self) -> bool {
        self.has(Role::Customer)
    }

    /// Returns the highest level held, if any role is held.
    #[must_use]
    pub fn highest_level(&self) -> Option<i32> {
        self.roles.iter().map(|role| role.role_level).max()
    }

    /// Compares two sets ignoring order.
    #[must_use]
    pub fn same_assignments(&self, other: &Self) -> bool {
        let mut mine = self.roles.clone();
        let mut theirs = other.roles.clone();
        mine.sort_by(|a, b| (&a.role_name, a.role_level).cmp(&(&b.role_name, b.role_level)));
        theirs.sort_by(|a, b| (&a.role_name, a.role_level).cmp(&(&b.role_name, b.role_level)));
        mine == theirs
    }

    /// Returns the assignments as a slice.
    #[must_use]
    pub fn roles(&self) -> &[RoleAssignment] {
        &self.roles
    }

    /// Returns true if no role is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
