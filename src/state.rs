// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

use std::sync::Arc;

use crate::auth::ext_cache::ExternalUserCache;
use crate::auth::token::{TokenSigner, TrustedKeys};
use crate::store::{EventStore, UserStore};

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub events: Arc<dyn EventStore>,
    pub signer: Arc<TokenSigner>,
    pub trusted: Arc<TrustedKeys>,
    pub ext_users: Arc<ExternalUserCache>,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Renew token lifetime in seconds, `None` when renewal is disabled.
    pub renew_ttl_secs: Option<i64>,
}
