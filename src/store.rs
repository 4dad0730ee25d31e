// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Storage traits and in-memory implementations.
//!
//! Handlers depend on the [`UserStore`] and [`EventStore`] traits only, so
//! a database-backed implementation can replace the in-memory maps without
//! touching the API layer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use thiserror::Error;

use crate::auth::roles::{self, Role};
use crate::models::{Event, NewUser, Severity, User, UserUpdate, DEFAULT_ADMIN_ID};
use crate::password;

/// Storage-level failure, mapped to HTTP status by the API layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record does not exist (404).
    #[error("{0}")]
    NotFound(String),
    /// The request is well-formed but violates a constraint (400).
    #[error("{0}")]
    Invalid(String),
    /// The backend itself failed (500).
    #[error("{0}")]
    Internal(String),
}

/// Account storage.
pub trait UserStore: Send + Sync {
    /// Create an account. Fails on empty or duplicate usernames, unknown
    /// roles and policy-violating passwords.
    fn create(&self, new: NewUser) -> Result<User, StoreError>;

    /// Look up an account by numeric id or username.
    fn get(&self, name_or_id: &str) -> Result<User, StoreError>;

    /// All accounts, ordered by id.
    fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Apply a partial update and bump the record version.
    fn update(&self, name_or_id: &str, update: UserUpdate) -> Result<User, StoreError>;

    /// Delete an account, returning the removed record. The seeded
    /// administrator cannot be deleted.
    fn delete(&self, name_or_id: &str) -> Result<User, StoreError>;

    /// Check a username/password pair, returning the account on success.
    fn validate_credentials(&self, username: &str, password: &str) -> Option<User>;

    /// Ensure the default administrator account exists.
    ///
    /// The seed bypasses the password policy; operators are expected to
    /// rotate the bootstrap credentials immediately.
    fn seed_default_admin(&self) -> Result<(), StoreError>;
}

/// Security event storage.
pub trait EventStore: Send + Sync {
    /// Record an event, assigning its id.
    fn record(&self, event: Event) -> Result<Event, StoreError>;

    /// One page of events, newest first. Pages are 1-based.
    fn list(&self, page_number: usize, page_size: usize) -> Vec<Event>;

    /// Number of recorded events with the given severity.
    fn count_by_severity(&self, severity: Severity) -> usize;

    /// Total number of recorded events.
    fn total(&self) -> usize;

    /// Delete the oldest events until at most `max_events` remain.
    /// Returns how many were removed.
    fn prune(&self, max_events: usize) -> usize;
}

/// Resolve a path parameter that may be a numeric id or a username.
fn parse_id(name_or_id: &str) -> Option<u64> {
    name_or_id.parse::<u64>().ok()
}

/// In-memory account storage behind an `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<u64, User>>,
    next_id: AtomicU64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(DEFAULT_ADMIN_ID + 1),
        }
    }

    fn find(users: &HashMap<u64, User>, name_or_id: &str) -> Option<User> {
        if let Some(id) = parse_id(name_or_id) {
            users.get(&id).cloned()
        } else {
            users.values().find(|u| u.username == name_or_id).cloned()
        }
    }

    fn not_found(name_or_id: &str) -> StoreError {
        StoreError::NotFound(format!("user {name_or_id} not present in database"))
    }
}

impl UserStore for InMemoryUserStore {
    fn create(&self, new: NewUser) -> Result<User, StoreError> {
        if new.username.is_empty() {
            return Err(StoreError::Invalid("username cannot be empty".into()));
        }
        let parsed_roles =
            roles::parse_roles(&new.roles).map_err(|e| StoreError::Invalid(e.to_string()))?;
        password::validate_password(&new.password).map_err(|e| {
            StoreError::Invalid(format!("password does not meet security requirements: {e}"))
        })?;
        let password_hash =
            password::hash_password(&new.password).map_err(|e| StoreError::Internal(e.to_string()))?;

        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Internal("user store poisoned".into()))?;
        if users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Invalid(format!(
                "user {} already present in database",
                new.username
            )));
        }

        let now = Utc::now();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            username: new.username,
            password_hash,
            version: 1,
            roles: parsed_roles,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get(&self, name_or_id: &str) -> Result<User, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::Internal("user store poisoned".into()))?;
        Self::find(&users, name_or_id).ok_or_else(|| Self::not_found(name_or_id))
    }

    fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::Internal("user store poisoned".into()))?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by_key(|u| u.id);
        Ok(all)
    }

    fn update(&self, name_or_id: &str, update: UserUpdate) -> Result<User, StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Internal("user store poisoned".into()))?;
        let current =
            Self::find(&users, name_or_id).ok_or_else(|| Self::not_found(name_or_id))?;

        let mut updated = current;
        if let Some(names) = &update.roles {
            if !names.is_empty() {
                updated.roles =
                    roles::parse_roles(names).map_err(|e| StoreError::Invalid(e.to_string()))?;
            }
        }
        if let Some(username) = update.username.filter(|u| !u.is_empty()) {
            if users
                .values()
                .any(|u| u.username == username && u.id != updated.id)
            {
                return Err(StoreError::Invalid(format!(
                    "user {username} already present in database"
                )));
            }
            updated.username = username;
        }
        if let Some(pw) = update.password.filter(|p| !p.is_empty()) {
            password::validate_password(&pw).map_err(|e| {
                StoreError::Invalid(format!("password does not meet security requirements: {e}"))
            })?;
            updated.password_hash =
                password::hash_password(&pw).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        updated.version += 1;
        updated.updated_at = Utc::now();

        users.insert(updated.id, updated.clone());
        Ok(updated)
    }

    fn delete(&self, name_or_id: &str) -> Result<User, StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Internal("user store poisoned".into()))?;
        let user = Self::find(&users, name_or_id).ok_or_else(|| Self::not_found(name_or_id))?;
        if user.id == DEFAULT_ADMIN_ID {
            return Err(StoreError::Invalid(format!(
                "user with id {DEFAULT_ADMIN_ID} cannot be deleted"
            )));
        }
        users.remove(&user.id);
        Ok(user)
    }

    fn validate_credentials(&self, username: &str, password: &str) -> Option<User> {
        let users = self.users.read().ok()?;
        let user = users.values().find(|u| u.username == username)?;
        if password::verify_password(password, &user.password_hash) {
            Some(user.clone())
        } else {
            None
        }
    }

    fn seed_default_admin(&self) -> Result<(), StoreError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StoreError::Internal("user store poisoned".into()))?;
        if users.contains_key(&DEFAULT_ADMIN_ID) {
            return Ok(());
        }
        let password_hash =
            password::hash_password("admin").map_err(|e| StoreError::Internal(e.to_string()))?;
        let now = Utc::now();
        users.insert(
            DEFAULT_ADMIN_ID,
            User {
                id: DEFAULT_ADMIN_ID,
                username: "admin".into(),
                password_hash,
                version: 1,
                roles: vec![Role::Admin],
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }
}

/// In-memory event log behind an `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<Event>>,
    next_id: AtomicU64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl EventStore for InMemoryEventStore {
    fn record(&self, mut event: Event) -> Result<Event, StoreError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| StoreError::Internal("event store poisoned".into()))?;
        event.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        events.push(event.clone());
        Ok(event)
    }

    fn list(&self, page_number: usize, page_size: usize) -> Vec<Event> {
        let events = match self.events.read() {
            Ok(events) => events,
            Err(_) => return Vec::new(),
        };
        if page_size == 0 || page_number == 0 {
            return Vec::new();
        }
        // Newest first, id-ordered.
        events
            .iter()
            .rev()
            .skip(page_size * (page_number - 1))
            .take(page_size)
            .cloned()
            .collect()
    }

    fn count_by_severity(&self, severity: Severity) -> usize {
        match self.events.read() {
            Ok(events) => events.iter().filter(|e| e.severity == severity).count(),
            Err(_) => 0,
        }
    }

    fn total(&self) -> usize {
        match self.events.read() {
            Ok(events) => events.len(),
            Err(_) => 0,
        }
    }

    fn prune(&self, max_events: usize) -> usize {
        let mut events = match self.events.write() {
            Ok(events) => events,
            Err(_) => return 0,
        };
        if events.len() <= max_events {
            return 0;
        }
        let excess = events.len() - max_events;
        // Records are appended in order, so the front is the oldest.
        events.drain(..excess);
        excess
    }
}
