// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | Shared secret; non-empty selects HMAC signing | empty |
//! | `JWT_PUBLIC_KEY` | PEM value or file path for the verification key | `/run/secrets/jwt_public` |
//! | `JWT_PRIVATE_KEY` | PEM value or file path for the signing key | `/run/secrets/jwt_private` |
//! | `JWT_ACCESS_TTL_SECS` | Access token lifetime in seconds | `300` |
//! | `JWT_RENEW_TTL_SECS` | Renew token lifetime in seconds | `144000` |
//! | `JWT_RENEW_ENABLED` | Issue renew tokens at login | `true` |
//! | `JWT_TRUSTED_KEYS_DIR` | Directory of trusted issuer public keys | `/run/pubkeys` |
//! | `MAX_EVENTS` | Events kept after each pruning run | `100` |
//! | `EVENT_PRUNE_INTERVAL_SECS` | Seconds between pruning runs | `86400` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |
//!
//! When `JWT_SECRET` is empty the service signs with RS256 and the key pair
//! is mandatory; when set, HS256 is used and the key pair is ignored.

use std::env;

use thiserror::Error;

/// A configuration value that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid value for {var}: {value}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Runtime configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Non-empty selects HMAC signing.
    pub jwt_secret: String,
    /// PEM value or file path. Used only in RSA mode.
    pub jwt_public_key: String,
    /// PEM value or file path. Used only in RSA mode.
    pub jwt_private_key: String,
    pub access_ttl_secs: i64,
    pub renew_ttl_secs: i64,
    pub renew_enabled: bool,
    pub trusted_keys_dir: String,
    pub max_events: usize,
    pub prune_interval_secs: u64,
}

impl Config {
    /// Load configuration from the environment, applying defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 8080)?,
            jwt_secret: var_or("JWT_SECRET", ""),
            jwt_public_key: var_or("JWT_PUBLIC_KEY", "/run/secrets/jwt_public"),
            jwt_private_key: var_or("JWT_PRIVATE_KEY", "/run/secrets/jwt_private"),
            access_ttl_secs: parse_var("JWT_ACCESS_TTL_SECS", 300)?,
            renew_ttl_secs: parse_var("JWT_RENEW_TTL_SECS", 144_000)?,
            renew_enabled: parse_var("JWT_RENEW_ENABLED", true)?,
            trusted_keys_dir: var_or("JWT_TRUSTED_KEYS_DIR", "/run/pubkeys"),
            max_events: parse_var("MAX_EVENTS", 100)?,
            prune_interval_secs: parse_var("EVENT_PRUNE_INTERVAL_SECS", 86_400)?,
        })
    }

    /// Renew-token lifetime, `None` when the renew flow is disabled.
    pub fn renew_ttl(&self) -> Option<i64> {
        if self.renew_enabled && self.renew_ttl_secs > 0 {
            Some(self.renew_ttl_secs)
        } else {
            None
        }
    }

    /// True when the deployment signs with a shared secret.
    pub fn uses_hmac(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError { var: name, value }),
        Err(_) => Ok(default),
    }
}
