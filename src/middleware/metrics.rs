//! Request correlation and HTTP metrics

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Label used for requests that matched no route
const UNMATCHED_ROUTE: &str = "unmatched";

/// Correlation ID of the current request, available as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Decrements the in-flight gauge even when the request future is dropped
struct InFlight;

impl InFlight {
    fn start() -> Self {
        gauge!("bct_http_requests_in_flight").increment(1.0);
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!("bct_http_requests_in_flight").decrement(1.0);
    }
}

/// Route template for metric labels, so path parameters never become label values
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

fn request_id(request: &Request) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Tag the request with an ID, echo it back and record request metrics.
///
/// Must be installed with `Router::layer` so `MatchedPath` is already set.
pub async fn track_requests(mut request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = route_label(&request);
    let id = request_id(&request);
    request.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("request", request_id = %id, %method, %route);
    let _in_flight = InFlight::start();
    let start = Instant::now();

    let mut response = next.run(request).instrument(span).await;

    let status = response.status().as_u16().to_string();
    counter!(
        "bct_http_requests_total",
        "method" => method.clone(),
        "path" => route.clone(),
        "status" => status
    )
    .increment(1);
    histogram!("bct_http_request_duration_seconds", "method" => method, "path" => route)
        .record(start.elapsed().as_secs_f64());

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
