//! Cache administration: status, clearing, search and health.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use genesphere_cache::key::{ALL_GENES_PATTERN, GENE_KEY_PREFIX, escape_glob, normalize_name};
use genesphere_cache::pattern::is_wildcard_only;
use genesphere_cache::{CacheStatus, ClearResult, GeneCacheService, HealthReport, PatternValidation};
use genesphere_core::GeneRecord;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

const DEFAULT_MAX_KEYS: usize = 100;
const MAX_KEYS_LIMIT: usize = 1000;

pub fn cache_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cache/status", get(status))
        .route("/api/cache/clear", delete(clear_by_pattern))
        .route("/api/cache/clear/{gene}", delete(clear_gene))
        .route("/api/cache/search", get(search))
        .route("/api/cache/keys", get(keys))
        .route("/api/cache/health", get(health))
        .route("/api/cache/ping", get(ping))
}

/// GET /api/cache/status
async fn status(State(state): State<AppState>) -> Json<CacheStatus> {
    Json(state.cache.get_status().await)
}

#[derive(Debug, Deserialize)]
struct PatternQuery {
    pattern: Option<String>,
}

/// Rejected patterns answer 400; store failures answer 503.
async fn run_clear(cache: &GeneCacheService, pattern: &str) -> (StatusCode, Json<ClearResult>) {
    let max_length = cache.settings().max_pattern_length;
    let valid = PatternValidation::of(pattern, max_length).is_valid();
    let result = cache.clear_by_pattern(pattern).await;
    let status = if result.is_success() {
        StatusCode::OK
    } else if !valid {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(result))
}

/// DELETE /api/cache/clear?pattern=gene:*
async fn clear_by_pattern(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> (StatusCode, Json<ClearResult>) {
    match query.pattern {
        Some(pattern) => run_clear(&state.cache, &pattern).await,
        None => {
            let result = state.cache.clear_cache().await;
            let status = if result.is_success() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            (status, Json(result))
        }
    }
}

/// DELETE /api/cache/clear/{gene}
///
/// Clears exactly one gene; glob characters in the name match literally.
async fn clear_gene(
    State(state): State<AppState>,
    Path(gene): Path<String>,
) -> ApiResult<(StatusCode, Json<ClearResult>)> {
    let name = normalize_name(&gene)
        .ok_or_else(|| ApiError::bad_request("Gene name must not be blank"))?;
    let pattern = format!("{GENE_KEY_PREFIX}{}", escape_glob(&name));
    Ok(run_clear(&state.cache, &pattern).await)
}

/// GET /api/cache/search?pattern=TP
async fn search(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> ApiResult<Json<Vec<GeneRecord>>> {
    let pattern = query.pattern.unwrap_or_default();
    if is_wildcard_only(&pattern) {
        return Err(ApiError::bad_request(
            "Search pattern must contain more than wildcards",
        ));
    }
    Ok(Json(state.cache.search(&pattern).await))
}

#[derive(Debug, Deserialize)]
struct KeysQuery {
    pattern: Option<String>,
    max_keys: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeysResponse {
    pattern: String,
    count: usize,
    keys: Vec<String>,
}

/// GET /api/cache/keys?pattern=gene:*&max_keys=100
async fn keys(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> ApiResult<Json<KeysResponse>> {
    let max_keys = query.max_keys.unwrap_or(DEFAULT_MAX_KEYS);
    if !(1..=MAX_KEYS_LIMIT).contains(&max_keys) {
        return Err(ApiError::bad_request(format!(
            "max_keys must be between 1 and {MAX_KEYS_LIMIT}"
        )));
    }

    let pattern = query
        .pattern
        .unwrap_or_else(|| ALL_GENES_PATTERN.to_string());
    let max_length = state.cache.settings().max_pattern_length;
    if let Some(reason) = PatternValidation::of(&pattern, max_length).rejection_message(max_length)
    {
        return Err(ApiError::bad_request(reason));
    }

    let keys = state.cache.keys_by_pattern(&pattern, max_keys).await;
    Ok(Json(KeysResponse {
        pattern: pattern.trim().to_string(),
        count: keys.len(),
        keys,
    }))
}

/// GET /api/cache/health
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.check().await;
    let status = if report.is_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

#[derive(Debug, Serialize)]
struct PingResponse {
    status: &'static str,
    response: String,
    backend: &'static str,
}

/// GET /api/cache/ping
async fn ping(State(state): State<AppState>) -> ApiResult<Json<PingResponse>> {
    let response = state
        .cache
        .ping()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(format!("Cache store ping failed: {e}")))?;
    Ok(Json(PingResponse {
        status: "UP",
        response,
        backend: state.backend_mode,
    }))
}
