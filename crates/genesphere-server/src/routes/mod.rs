pub mod cache;
pub mod genes;

use axum::Router;

use crate::server::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(genes::gene_routes())
        .merge(cache::cache_routes())
}
