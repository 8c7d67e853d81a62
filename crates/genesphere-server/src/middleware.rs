use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::metrics::record_http_request;

const REQUEST_ID: &str = "x-request-id";

// Request ID middleware: preserves an incoming x-request-id or generates one,
// and echoes it on the response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let req_id_value = req
        .headers()
        .get(REQUEST_ID)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    if let Some(ref value) = req_id_value {
        req.extensions_mut().insert(value.clone());
    }

    let mut res = next.run(req).await;

    if let Some(value) = req_id_value {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID), value);
    }
    res
}

/// The request id assigned by [`request_id`], or the raw header when that
/// middleware has not run. Empty when neither is present.
pub fn request_id_of<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<HeaderValue>()
        .or_else(|| req.headers().get(REQUEST_ID))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

// Records request count and latency per route template, so path parameters
// do not explode label cardinality.
pub async fn http_metrics(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let res = next.run(req).await;

    record_http_request(&method, &route, res.status().as_u16(), started.elapsed());
    res
}
