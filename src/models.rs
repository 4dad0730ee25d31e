// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Domain models: users and security events.

use axum::http::Method;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::roles::Role;

/// Authenticating-domain tag for password logins.
pub const INTERNAL_DOMAIN: &str = "INTERNAL";
/// Authenticating-domain tag for machine-to-machine logins.
pub const EXTERNAL_DOMAIN: &str = "EXTERNAL";

/// Identifier of the seeded administrator account. Never deletable.
pub const DEFAULT_ADMIN_ID: u64 = 1;

/// A local account.
///
/// The password hash never leaves the service; responses carry the record
/// without it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    /// Bumped on every update.
    pub version: u32,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for account creation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Partial update for an account. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Vec<String>>,
}

/// Classification of a recorded security event.
///
/// Ordinals 1..6 are stable identifiers; the wire representation is the
/// lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Cleared = 1,
    Indeterminate = 2,
    Warning = 3,
    Minor = 4,
    Major = 5,
    Critical = 6,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Cleared,
        Severity::Indeterminate,
        Severity::Warning,
        Severity::Minor,
        Severity::Major,
        Severity::Critical,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Cleared => "cleared",
            Severity::Indeterminate => "indeterminate",
            Severity::Warning => "warning",
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A recorded security event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Event {
    pub id: u64,
    pub username: String,
    /// Which domain authenticated the subject, when applicable.
    pub authn_domain: String,
    pub description: String,
    /// When the condition occurred.
    pub activated: DateTime<Utc>,
    /// When the record was last touched.
    pub modified: DateTime<Utc>,
    pub severity: Severity,
}

impl Event {
    fn new(
        username: impl Into<String>,
        domain: impl Into<String>,
        description: String,
        severity: Severity,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username: username.into(),
            authn_domain: domain.into(),
            description,
            activated: now,
            modified: now,
            severity,
        }
    }

    /// A successful authentication, from either domain.
    pub fn successful_login(username: &str, domain: &str, ip: &str) -> Self {
        Self::new(
            username,
            domain,
            format!("Login successful from IP {ip}"),
            Severity::Cleared,
        )
    }

    /// A failed authentication attempt.
    pub fn unsuccessful_login(username: &str, domain: &str, ip: &str) -> Self {
        Self::new(
            username,
            domain,
            format!("Login unsuccessful from IP {ip}"),
            Severity::Warning,
        )
    }

    /// An administrative change to a user record, labeled by HTTP method.
    pub fn user_change(method: &Method, username: &str) -> Self {
        let description = match *method {
            Method::POST => format!("Added user: {username}"),
            Method::PATCH => format!("Updated user: {username}"),
            Method::DELETE => format!("Deleted user: {username}"),
            _ => format!("Unknown user operation: {username}"),
        };
        Self::new(username, "", description, Severity::Cleared)
    }

    /// Token signing failed for an authenticated subject.
    pub fn signing_failure(username: &str, domain: &str) -> Self {
        Self::new(
            username,
            domain,
            "Failed creating new session token".to_string(),
            Severity::Warning,
        )
    }
}
