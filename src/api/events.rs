// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 IdP Service Authors

//! Security event endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::models::{Event, Severity};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 25;
const DEFAULT_PAGE_NUMBER: usize = 1;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// 1-based page number.
    #[serde(rename = "page[number]")]
    pub page_number: Option<usize>,
    #[serde(rename = "page[size]")]
    pub page_size: Option<usize>,
    /// Include per-severity counts and the page total.
    #[serde(default)]
    pub summary: bool,
}

/// Number of recorded events per severity.
#[derive(Debug, Serialize, ToSchema)]
pub struct SeverityCounts {
    pub cleared: usize,
    pub indeterminate: usize,
    pub warning: usize,
    pub minor: usize,
    pub major: usize,
    pub critical: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventSummary {
    pub severity_counts: SeverityCounts,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<EventSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/v1/event",
    params(EventsQuery),
    tag = "Events",
    responses((status = 200, body = EventsResponse))
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let page_number = query.page_number.unwrap_or(DEFAULT_PAGE_NUMBER);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    let events = state.events.list(page_number, page_size);

    if !query.summary {
        return Ok(Json(EventsResponse {
            events,
            summary: None,
            total_pages: None,
        }));
    }

    let count = |severity| state.events.count_by_severity(severity);
    let counts = SeverityCounts {
        cleared: count(Severity::Cleared),
        indeterminate: count(Severity::Indeterminate),
        warning: count(Severity::Warning),
        minor: count(Severity::Minor),
        major: count(Severity::Major),
        critical: count(Severity::Critical),
    };
    let total_pages = 1 + state.events.total() / page_size.max(1);

    Ok(Json(EventsResponse {
        events,
        summary: Some(EventSummary {
            severity_counts: counts,
        }),
        total_pages: Some(total_pages),
    }))
}
