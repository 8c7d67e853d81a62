//! HTTP surface tests driven through the router with `oneshot`.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use genesphere_cache::{
    CacheBackend, CacheHealthIndicator, CacheSettings, CacheStore, GeneCacheService,
    MemoryLockProvider, StoreError,
};
use genesphere_core::{GeneRecord, InMemoryGeneRepository};
use genesphere_server::{AppState, build_app};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn seeded_repository() -> InMemoryGeneRepository {
    InMemoryGeneRepository::with_genes([
        GeneRecord::new("KRAS").with_description("Kirsten rat sarcoma viral oncogene homolog"),
        GeneRecord::new("TP53").with_description("Tumor protein p53"),
        GeneRecord::new("BRAF").with_description("B-Raf proto-oncogene"),
    ])
}

fn app() -> Router {
    let backend = CacheBackend::new_local();
    build_app(AppState::new(
        &backend,
        seeded_repository(),
        CacheSettings::default(),
    ))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None).await
}

#[tokio::test]
async fn gene_lookup_populates_cache() {
    let app = app();

    let (status, body) = get(&app, "/api/genes/kras").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "KRAS");
    assert_eq!(body["description"], "Kirsten rat sarcoma viral oncogene homolog");

    let (status, body) = get(&app, "/api/genes/KRAS/cached").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gene"], "KRAS");
    assert_eq!(body["cached"], true);
    assert!(body["ttlSeconds"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn unknown_and_blank_genes() {
    let app = app();

    let (status, body) = get(&app, "/api/genes/NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(body["message"], "Gene not found: NOPE");

    let (status, body) = get(&app, "/api/genes/NOPE/cached").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], false);

    let (status, _) = get(&app, "/api/genes/%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn saving_a_gene_evicts_the_stale_copy() {
    let app = app();
    get(&app, "/api/genes/TP53").await;

    let updated = json!({ "name": "TP53", "description": "Guardian of the genome" });
    let (status, body) = send(&app, Method::POST, "/api/genes", Some(updated)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["description"], "Guardian of the genome");

    let (_, body) = get(&app, "/api/genes/tp53").await;
    assert_eq!(body["description"], "Guardian of the genome");
}

#[tokio::test]
async fn deleting_a_gene_removes_it_everywhere() {
    let app = app();
    get(&app, "/api/genes/BRAF").await;

    let (status, _) = delete(&app, "/api/genes/BRAF").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app, "/api/genes/BRAF").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = delete(&app, "/api/genes/BRAF").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_and_searching_the_repository() {
    let app = app();

    let (status, body) = get(&app, "/api/genes").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["BRAF", "KRAS", "TP53"]);

    let (_, body) = get(&app, "/api/genes?search=ra").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn clear_rejects_unsafe_patterns() {
    let app = app();
    get(&app, "/api/genes/KRAS").await;

    for uri in [
        "/api/cache/clear?pattern=*",
        "/api/cache/clear?pattern=",
        "/api/cache/clear?pattern=KRAS",
    ] {
        let (status, body) = delete(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false);
        assert_eq!(body["deletedCount"], 0);
    }

    let (_, body) = get(&app, "/api/genes/KRAS/cached").await;
    assert_eq!(body["cached"], true);
}

#[tokio::test]
async fn clear_by_pattern_and_by_gene() {
    let app = app();
    for gene in ["KRAS", "TP53", "BRAF"] {
        get(&app, &format!("/api/genes/{gene}")).await;
    }

    let (status, body) = delete(&app, "/api/cache/clear?pattern=gene:KRAS").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deletedCount"], 1);
    assert_eq!(body["pattern"], "gene:KRAS");

    let (status, body) = delete(&app, "/api/cache/clear/tp53").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 1);

    let (status, body) = delete(&app, "/api/cache/clear").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 1);
    assert_eq!(body["pattern"], "gene:*");

    let (_, body) = get(&app, "/api/cache/status").await;
    assert_eq!(body["geneKeys"], 0);
    assert_eq!(body["status"], "AVAILABLE");
}

#[tokio::test]
async fn search_and_key_listing() {
    let app = app();
    for gene in ["KRAS", "TP53", "BRAF"] {
        get(&app, &format!("/api/genes/{gene}")).await;
    }

    let (status, _) = get(&app, "/api/cache/search?pattern=*").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/api/cache/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/cache/search?pattern=ra").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["BRAF", "KRAS"]);

    let (status, body) = get(&app, "/api/cache/keys").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (status, _) = get(&app, "/api/cache/keys?max_keys=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/api/cache/keys?max_keys=1001").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/api/cache/keys?pattern=lock:*").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_ping_on_local_backend() {
    let app = app();

    let (status, body) = get(&app, "/api/cache/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["details"]["read_write"], "OK");

    let (status, body) = get(&app, "/api/cache/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "PONG");
    assert_eq!(body["backend"], "local");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let request = Request::builder()
        .uri("/api/cache/status")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

/// A store that refuses every call.
struct DownStore;

#[async_trait]
impl CacheStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::connection("refused"))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::connection("refused"))
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::connection("refused"))
    }

    async fn delete_many(&self, _keys: &[String]) -> Result<u64, StoreError> {
        Err(StoreError::connection("refused"))
    }

    async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::connection("refused"))
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Option<Duration>>, StoreError> {
        Err(StoreError::connection("refused"))
    }

    async fn scan(
        &self,
        _pattern: &str,
        _page_size: usize,
        _limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        Err(StoreError::connection("refused"))
    }

    async fn count(&self, _pattern: &str, _page_size: usize) -> Result<u64, StoreError> {
        Err(StoreError::connection("refused"))
    }

    async fn ping(&self) -> Result<String, StoreError> {
        Err(StoreError::connection("refused"))
    }
}

fn app_with_down_store() -> Router {
    let repository = Arc::new(seeded_repository());
    let store: Arc<dyn CacheStore> = Arc::new(DownStore);
    let cache = GeneCacheService::new(
        store.clone(),
        Arc::new(MemoryLockProvider::new()),
        repository.clone(),
        CacheSettings::default(),
    );
    build_app(AppState {
        cache,
        repository,
        health: CacheHealthIndicator::new(store),
        backend_mode: "redis",
    })
}

#[tokio::test]
async fn store_outage_degrades_instead_of_failing() {
    let app = app_with_down_store();

    // Lookups still answer from the repository.
    let (status, body) = get(&app, "/api/genes/KRAS").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "KRAS");

    let (_, body) = get(&app, "/api/cache/status").await;
    assert_eq!(body["status"], "UNAVAILABLE");

    let (status, body) = delete(&app, "/api/cache/clear?pattern=gene:*").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);

    let (status, body) = get(&app, "/api/cache/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "DOWN");
    assert_eq!(body["details"]["error_type"], "connection");

    let (status, body) = get(&app, "/api/cache/ping").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);
}

#[tokio::test]
async fn metrics_endpoint_renders_prometheus_text() {
    genesphere_server::metrics::init_metrics();
    let app = app();
    get(&app, "/api/genes/KRAS").await;

    let (status, body) = get(&app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("gene_cache_misses_total"));
}
