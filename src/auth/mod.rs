// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Authentication and authorization.
//!
//! - [`claims`] - JWT claim shapes for access and renew tokens
//! - [`token`] - signing and verification, single-mode per deployment
//! - [`keys`] - PEM/DER key material loading
//! - [`roles`] - the closed role set
//! - [`authz`] - role-based request authorization
//! - [`ext_cache`] - role grants for machine-to-machine subjects
//! - [`middleware`] - bearer-token middleware for protected routes

pub mod authz;
pub mod claims;
pub mod ext_cache;
pub mod keys;
pub mod middleware;
pub mod roles;
pub mod token;
