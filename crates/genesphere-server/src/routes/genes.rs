//! Gene lookups through the cache, plus record maintenance.
//!
//! Writes go to the repository first and then evict the cached copy, so the
//! next lookup reloads the new version.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use genesphere_cache::CacheEntryInfo;
use genesphere_core::{GeneRecord, GeneRepository};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

pub fn gene_routes() -> Router<AppState> {
    Router::new()
        .route("/api/genes", get(list_genes).post(save_gene))
        .route("/api/genes/{name}", get(get_gene).delete(delete_gene))
        .route("/api/genes/{name}/cached", get(gene_cache_state))
        .route("/api/genes/{name}/refresh", get(refresh_gene))
}

fn require_name(name: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::bad_request("Gene name must not be blank"));
    }
    Ok(())
}

fn not_found(name: &str) -> ApiError {
    ApiError::not_found(format!("Gene not found: {}", name.trim()))
}

/// GET /api/genes/{name}
async fn get_gene(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<GeneRecord>> {
    require_name(&name)?;
    state
        .cache
        .lookup(&name)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&name))
}

/// GET /api/genes/{name}/refresh
async fn refresh_gene(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<GeneRecord>> {
    require_name(&name)?;
    info!(gene = %name, "Refreshing gene from source");
    state
        .cache
        .refresh(&name)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&name))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheStateResponse {
    gene: String,
    cached: bool,
    ttl_seconds: Option<u64>,
    info: String,
}

/// GET /api/genes/{name}/cached
async fn gene_cache_state(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<CacheStateResponse>> {
    require_name(&name)?;
    let gene = name.trim().to_uppercase();
    let cached = state.cache.is_gene_in_cache(&gene).await;
    let entry = state.cache.gene_cache_info(&gene).await;
    let ttl_seconds = match entry {
        CacheEntryInfo::Cached { ttl: Some(ttl) } => Some(ttl.as_secs()),
        _ => None,
    };
    Ok(Json(CacheStateResponse {
        info: entry.describe(&gene),
        gene,
        cached,
        ttl_seconds,
    }))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
}

/// GET /api/genes?search=
///
/// Reads the repository directly; listing never goes through the cache.
async fn list_genes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<GeneRecord>>> {
    let genes = match query.search.as_deref().map(str::trim) {
        Some(fragment) if !fragment.is_empty() => {
            state.repository.search_by_name(fragment).await?
        }
        _ => state.repository.find_all().await?,
    };
    Ok(Json(genes))
}

/// POST /api/genes
async fn save_gene(
    State(state): State<AppState>,
    Json(gene): Json<GeneRecord>,
) -> ApiResult<impl IntoResponse> {
    require_name(&gene.name)?;
    let saved = state.repository.save(gene).await?;
    state.cache.evict(&saved.name).await;
    info!(gene = %saved.name, "Saved gene and evicted cached copy");
    Ok((StatusCode::CREATED, Json(saved)))
}

/// DELETE /api/genes/{name}
async fn delete_gene(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    require_name(&name)?;
    let existed = state.repository.delete_by_name(&name).await?;
    state.cache.evict(&name).await;
    if !existed {
        return Err(not_found(&name));
    }
    info!(gene = %name, "Deleted gene and evicted cached copy");
    Ok(StatusCode::NO_CONTENT)
}
