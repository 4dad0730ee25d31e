// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// - `Admin` - full access to all endpoints and users
/// - `Helpdesk` - read access plus self-service updates
/// - `Monitor` - read access plus self-service updates
///
/// The set is closed: there is no dynamic role registration. Ordinals 1..3
/// double as the stable role identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full administrative access
    Admin = 1,
    /// Support staff
    Helpdesk = 2,
    /// Read-mostly monitoring access
    Monitor = 3,
}

/// Returned when a role name is not part of the closed role set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid role {0}")]
pub struct InvalidRole(pub String);

impl Role {
    /// Parse a role from its name (case-insensitive).
    pub fn parse(s: &str) -> Result<Role, InvalidRole> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "HELPDESK" => Ok(Role::Helpdesk),
            "MONITOR" => Ok(Role::Monitor),
            _ => Err(InvalidRole(s.to_string())),
        }
    }

    /// The canonical role name as carried inside tokens.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Helpdesk => "HELPDESK",
            Role::Monitor => "MONITOR",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a list of role names into roles, rejecting unknown names.
pub fn parse_roles(names: &[String]) -> Result<Vec<Role>, InvalidRole> {
    names.iter().map(|n| Role::parse(n)).collect()
}

/// Render roles back to their canonical names.
pub fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.name().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Ok(Role::Admin));
        assert_eq!(Role::parse("ADMIN"), Ok(Role::Admin));
        assert_eq!(Role::parse("HelpDesk"), Ok(Role::Helpdesk));
        assert_eq!(Role::parse("monitor"), Ok(Role::Monitor));
    }

    #[test]
    fn parse_rejects_unknown_roles() {
        let err = Role::parse("superuser").unwrap_err();
        assert_eq!(err, InvalidRole("superuser".to_string()));
    }

    #[test]
    fn parse_roles_fails_on_any_unknown_name() {
        let names = vec!["ADMIN".to_string(), "bogus".to_string()];
        assert!(parse_roles(&names).is_err());
    }

    #[test]
    fn names_round_trip() {
        let roles = vec![Role::Admin, Role::Monitor];
        let names = role_names(&roles);
        assert_eq!(names, vec!["ADMIN", "MONITOR"]);
        assert_eq!(parse_roles(&names).unwrap(), roles);
    }

    #[test]
    fn ordinals_are_stable() {
        assert_eq!(Role::Admin as u8, 1);
        assert_eq!(Role::Helpdesk as u8, 2);
        assert_eq!(Role::Monitor as u8, 3);
    }
}
