use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use genesphere_cache::{CacheBackend, CacheHealthIndicator, CacheSettings, GeneCacheService};
use genesphere_core::{GeneRepository, GeneSource, InMemoryGeneRepository};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig, create_cache_backend, metrics, middleware as app_middleware, routes,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub cache: GeneCacheService,
    pub repository: Arc<dyn GeneRepository>,
    pub health: CacheHealthIndicator,
    /// `"local"` or `"redis"`
    pub backend_mode: &'static str,
}

impl AppState {
    /// Wires the gene cache over `backend` in front of `repository`.
    pub fn new<R>(backend: &CacheBackend, repository: R, settings: CacheSettings) -> Self
    where
        R: GeneRepository + 'static,
    {
        let repository = Arc::new(repository);
        let source: Arc<dyn GeneSource> = repository.clone();
        let store = backend.store();
        let cache = GeneCacheService::new(store.clone(), backend.locks(), source, settings)
            .with_events(Arc::new(metrics::PrometheusEvents));

        Self {
            cache,
            repository,
            health: CacheHealthIndicator::new(store),
            backend_mode: backend.mode(),
        }
    }
}

pub struct GeneSphereServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(app_middleware::http_metrics))
        .with_state(state)
        // Middleware stack, innermost first: cors -> compression -> trace -> request id
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let req_id = app_middleware::request_id_of(req);
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = tracing::field::Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        // Outermost so the trace span already sees the id.
        .layer(middleware::from_fn(app_middleware::request_id))
}

/// GET /metrics
async fn metrics_handler() -> Response {
    match metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
    }
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Loads seed data, selects the cache backend and assembles the router.
    pub async fn build(self) -> anyhow::Result<GeneSphereServer> {
        metrics::init_metrics();

        let repository = match self.config.storage.seed_path.as_deref() {
            Some(path) => InMemoryGeneRepository::from_json_file(path)
                .with_context(|| format!("failed to load gene seed data from {path}"))?,
            None => {
                tracing::warn!("No storage.seed_path configured, starting with an empty gene repository");
                InMemoryGeneRepository::new()
            }
        };

        let backend = create_cache_backend(&self.config.redis).await;
        tracing::info!(mode = backend.mode(), "Cache backend ready");

        let state = AppState::new(&backend, repository, self.config.cache.clone());
        Ok(GeneSphereServer {
            addr: self.addr,
            app: build_app(state),
        })
    }
}

impl GeneSphereServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
