// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Service metadata endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Version tag of the current API surface.
pub const API_VERSION: &str = "v1.0";

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiVersionInfo {
    pub id: u32,
    pub version: &'static str,
    pub deprecated: bool,
}

/// Build and version information about the running service.
#[derive(Debug, Serialize, ToSchema)]
pub struct SystemInfo {
    pub app_name: &'static str,
    pub app_version: &'static str,
    pub api_version: &'static str,
}

#[utoipa::path(
    get,
    path = "/versions",
    tag = "System",
    responses((status = 200, body = [ApiVersionInfo]))
)]
pub async fn list_versions() -> Json<Vec<ApiVersionInfo>> {
    Json(vec![ApiVersionInfo {
        id: 1,
        version: API_VERSION,
        deprecated: false,
    }])
}

#[utoipa::path(
    get,
    path = "/v1/system",
    tag = "System",
    responses((status = 200, body = SystemInfo))
)]
pub async fn system_info() -> Json<SystemInfo> {
    Json(SystemInfo {
        app_name: env!("CARGO_PKG_NAME"),
        app_version: env!("CARGO_PKG_VERSION"),
        api_version: API_VERSION,
    })
}
