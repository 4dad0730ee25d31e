// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Identity provider service.
//!
//! Issues and verifies signed session tokens for two kinds of callers:
//! local accounts authenticating with a password, and trusted machine
//! callers presenting a token minted by an external issuer. Sessions use a
//! dual-token scheme: a short-lived access token carrying roles and a
//! longer-lived renew token used to mint fresh access tokens.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod event_pruner;
pub mod models;
pub mod password;
pub mod state;
pub mod store;

use auth::keys::{self, KeyError};
use auth::token::{TokenSigner, TrustedKeys};
use config::{Config, ConfigError};
use event_pruner::EventPruner;
use state::AppState;
use store::{InMemoryEventStore, InMemoryUserStore, StoreError, UserStore};

/// A startup failure. All of these are fatal; the process should log the
/// error and exit non-zero.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("key material error: {0}")]
    Key(#[from] KeyError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid bind address {0}")]
    BindAddress(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Initialize the tracing subscriber. `LOG_FORMAT=json` selects JSON
/// output; anything else logs human-readable lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the token signer for the configured signing mode.
fn build_signer(config: &Config) -> Result<TokenSigner, KeyError> {
    if config.uses_hmac() {
        info!("signing mode: HS256 (shared secret)");
        return Ok(TokenSigner::hmac(&config.jwt_secret));
    }

    let pub_der = keys::read_key_material(&config.jwt_public_key)?;
    let pvt_der = keys::read_key_material(&config.jwt_private_key)?;
    let certificate = keys::is_certificate(&pub_der);
    info!(
        certificate,
        "signing mode: RS256 (configured key pair)"
    );
    let (public, private) = keys::read_key_pair(&pub_der, &pvt_der, certificate)?;
    TokenSigner::rsa(&public, &private)
}

/// Assemble application state from configuration.
pub fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let signer = build_signer(config)?;

    let trusted_keys = keys::load_trusted_keys(std::path::Path::new(&config.trusted_keys_dir));
    let trusted = TrustedKeys::from_public_keys(&trusted_keys)?;
    if trusted.is_empty() {
        warn!("no trusted issuer keys loaded; machine-to-machine logins will fail");
    } else {
        info!(count = trusted.len(), "loaded trusted issuer keys");
    }

    let users = InMemoryUserStore::new();
    users.seed_default_admin()?;

    Ok(AppState {
        users: Arc::new(users),
        events: Arc::new(InMemoryEventStore::new()),
        signer: Arc::new(signer),
        trusted: Arc::new(trusted),
        ext_users: Arc::new(auth::ext_cache::ExternalUserCache::new()),
        access_ttl_secs: config.access_ttl_secs,
        renew_ttl_secs: config.renew_ttl(),
    })
}

/// Run the service until interrupted.
pub async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    let state = build_state(&config)?;

    let shutdown = CancellationToken::new();
    let pruner = EventPruner::new(
        state.events.clone(),
        config.max_events,
        Duration::from_secs(config.prune_interval_secs),
    );
    let pruner_handle = tokio::spawn(pruner.run(shutdown.clone()));

    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| StartupError::BindAddress(format!("{}:{}", config.host, config.port)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "identity provider listening (docs at /docs)");

    let serve_shutdown = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        serve_shutdown.cancel();
    })
    .await?;

    shutdown.cancel();
    let _ = pruner_handle.await;
    Ok(())
}
