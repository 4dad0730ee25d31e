// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Role-based authorization decisions.
//!
//! The decision is a pure function of the token's role names, the HTTP
//! method and the caller/target identity, so it is trivially testable and
//! independent of where the roles came from (local user record or a cached
//! external grant).

use axum::http::Method;

/// Decide whether a request against a protected resource is allowed.
///
/// Rules, in order:
///
/// 1. Any `ADMIN` role (case-insensitive) allows everything.
/// 2. Non-admins may not create or delete (`POST`, `DELETE`).
/// 3. Non-admins may `PATCH` only their own record: `target` must be
///    present and equal to `self_id`.
/// 4. Everything else (reads) is allowed.
pub fn authorize(roles: &[String], method: &Method, self_id: &str, target: Option<&str>) -> bool {
    if roles.iter().any(|r| r.eq_ignore_ascii_case("ADMIN")) {
        return true;
    }
    match *method {
        Method::POST | Method::DELETE => false,
        Method::PATCH => target.is_some_and(|t| t == self_id),
        _ => true,
    }
}
