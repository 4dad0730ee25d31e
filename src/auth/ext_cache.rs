// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Cache of externally-authenticated subjects and their role grants.
//!
//! Machine callers never exist in the user store; their roles are supplied
//! at session creation and must survive until token verification on later
//! requests. Entries live for the process lifetime and the map is
//! unbounded, so a hostile set of trusted issuers could grow it without
//! limit. Acceptable here because issuers are operator-configured.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::auth::roles::Role;

/// Subject -> granted roles for machine-to-machine sessions.
#[derive(Debug, Default)]
pub struct ExternalUserCache {
    inner: Mutex<HashMap<String, Vec<Role>>>,
}

impl ExternalUserCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Lock poisoning is recovered rather than propagated; the map holds
    // plain data and stays consistent even if a holder panicked.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Role>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record (or replace) the role grant for an external subject.
    pub fn insert(&self, subject: impl Into<String>, roles: Vec<Role>) {
        self.lock().insert(subject.into(), roles);
    }

    /// Roles granted to an external subject, if it has an active session.
    pub fn roles_of(&self, subject: &str) -> Option<Vec<Role>> {
        self.lock().get(subject).cloned()
    }

    /// Drop an external subject's grant.
    pub fn remove(&self, subject: &str) {
        self.lock().remove(subject);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let cache = ExternalUserCache::new();
        cache.insert("svc-a", vec![Role::Monitor]);

        assert_eq!(cache.roles_of("svc-a"), Some(vec![Role::Monitor]));
        assert_eq!(cache.roles_of("svc-b"), None);
    }

    #[test]
    fn reinsert_replaces_grant() {
        let cache = ExternalUserCache::new();
        cache.insert("svc-a", vec![Role::Monitor]);
        cache.insert("svc-a", vec![Role::Admin, Role::Monitor]);

        assert_eq!(
            cache.roles_of("svc-a"),
            Some(vec![Role::Admin, Role::Monitor])
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_clears_grant() {
        let cache = ExternalUserCache::new();
        cache.insert("svc-a", vec![Role::Monitor]);
        cache.remove("svc-a");

        assert!(cache.roles_of("svc-a").is_none());
        assert!(cache.is_empty());
    }
}
