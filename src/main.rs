// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

use tracing::error;

#[tokio::main]
async fn main() {
    idp_server::init_tracing();

    if let Err(err) = idp_server::run().await {
        error!(error = %err, "startup failed");
        std::process::exit(1);
    }
}
