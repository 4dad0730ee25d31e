// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! JWT claim shapes.
//!
//! Two explicit claim variants are used instead of one structure serving
//! both purposes:
//!
//! - [`StandardClaims`] - renew tokens (no roles, no domain tag)
//! - [`AccessClaims`] - access tokens, carrying roles and the
//!   authenticating domain so that authorization for machine callers is
//!   entirely token-derived
//!
//! Verification selects the expected variant by context (access endpoint vs
//! renew endpoint) rather than relying on structural leniency.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer tag stamped into every access token minted by this service.
pub const SERVICE_ISSUER: &str = "idp";

/// Registered JWT claims common to both token kinds.
///
/// Invariant on issuance: `exp > iat >= nbf`. The `jti` is a fresh UUID per
/// issuance and is never persisted; token validity is purely a function of
/// signature and time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardClaims {
    /// Subject: the principal's username.
    pub sub: String,
    /// Issuer tag identifying the authenticating domain or service.
    pub iss: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Not-before (Unix seconds).
    pub nbf: i64,
    /// Expires-at (Unix seconds).
    pub exp: i64,
    /// Unique token identifier.
    pub jti: Uuid,
}

impl StandardClaims {
    /// Build renew-token claims for a subject.
    ///
    /// The issuer is set to the authenticating domain; the renew handler
    /// reads it back to preserve the domain across renewals.
    pub fn new(subject: impl Into<String>, issuer: impl Into<String>, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: subject.into(),
            iss: issuer.into(),
            iat: now,
            nbf: now,
            exp: now + ttl_secs,
            jti: Uuid::new_v4(),
        }
    }
}

/// Access-token claims: the standard set plus roles and the authenticating
/// domain tag (`azt`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub standard: StandardClaims,
    /// Role names granted to the subject, carried inside the token.
    /// Defaults to empty on decode; externally-issued tokens may omit it.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Authenticating domain: `"EXTERNAL"` for machine callers, the
    /// internal domain tag for password logins.
    #[serde(default)]
    pub azt: String,
}

impl AccessClaims {
    /// Build access-token claims for a subject.
    ///
    /// A TTL of zero is legal and produces an immediately-expired token,
    /// used to prove credential validity without granting a session.
    pub fn new(
        subject: impl Into<String>,
        roles: Vec<String>,
        domain: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        Self {
            standard: StandardClaims::new(subject, SERVICE_ISSUER, ttl_secs),
            roles,
            azt: domain.into(),
        }
    }
}
