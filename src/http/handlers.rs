use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::auth::ApiError;
use super::state::AppState;
use crate::error::FirewallError;
use crate::model::{DomainList, DomainLog, MetaResponse, ListSource, ListType, canonical_domain};
use crate::store::EntryFilter;
use crate::validation::is_valid_domain;

const DEFAULT_LIMIT: i64 = 50;

fn paging(params: &HashMap<String, String>) -> (i64, i64) {
    let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_LIMIT);
    (offset, limit)
}

#[derive(Serialize)]
pub struct LogsResponse {
    logs: Vec<DomainLog>,
    meta: MetaResponse,
}

pub async fn list_domain_logs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<LogsResponse>, ApiError> {
    let (offset, limit) = paging(&params);
    let keyword = params.get("keyword").map(String::as_str);

    let (logs, total) = state.store.list_logs(offset, limit, keyword).await?;
    Ok(Json(LogsResponse {
        logs,
        meta: MetaResponse { total, offset, limit },
    }))
}

#[derive(Serialize)]
pub struct DomainsResponse {
    domains: Vec<DomainList>,
    meta: MetaResponse,
}

pub async fn list_domains(
    State(state): State<AppState>,
    Path((source, list_type)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<DomainsResponse>, ApiError> {
    let source = ListSource::from_str(&source)?;
    let list_type = ListType::from_str(&list_type)?;
    let (offset, limit) = paging(&params);

    let filter = EntryFilter {
        source: Some(source),
        list_type: Some(list_type),
        active_only: source == ListSource::Llm,
    };

    let (domains, total) = state.store.list_entries(&filter, offset, limit).await?;
    Ok(Json(DomainsResponse {
        domains,
        meta: MetaResponse { total, offset, limit },
    }))
}

#[derive(Deserialize)]
pub struct InsertDomainBody {
    domain: String,
}

pub async fn insert_manual_domain(
    State(state): State<AppState>,
    Path(list_type): Path<String>,
    Json(body): Json<InsertDomainBody>,
) -> Result<StatusCode, ApiError> {
    if !is_valid_domain(&body.domain) {
        return Err(ApiError(FirewallError::InvalidDomain(body.domain)));
    }
    let list_type = ListType::from_str(&list_type)?;

    let entry = DomainList {
        domain: canonical_domain(&body.domain),
        list_type,
        source: ListSource::Manual,
        created_at: chrono::Utc::now(),
        expires_at: None,
    };

    state.store.insert_entry(&entry).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_domain(
    State(state): State<AppState>,
    Path((source, list_type, domain)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let source = ListSource::from_str(&source)?;
    let list_type = ListType::from_str(&list_type)?;
    let domain = canonical_domain(&domain);

    state.store.delete_entry(&domain, list_type, source).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct StatsEntry {
    list_type: ListType,
    source: ListSource,
    count: i64,
}

/// `GET /metrics`: Prometheus text exposition of the process's counters.
/// Unauthenticated, same as the Control API's other monitoring surface.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(state.metrics.render())
        .unwrap()
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Vec<StatsEntry>>, ApiError> {
    let rows = state.store.stats().await?;
    Ok(Json(
        rows.into_iter()
            .map(|(list_type, source, count)| StatsEntry { list_type, source, count })
            .collect(),
    ))
}
