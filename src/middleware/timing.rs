use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info, warn};

static RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time-us");
static SERVER_TIMING: HeaderName = HeaderName::from_static("server-timing");

/// Stamps every response with its wall time:
///
///   X-Response-Time-Us: 412
///   Server-Timing: total;dur=0.412
///
/// and logs one event per request. Health probes log at debug so a
/// monitoring loop does not flood the service log.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros() as u64;

    let headers = response.headers_mut();
    headers.insert(RESPONSE_TIME.clone(), HeaderValue::from(us));
    if let Ok(val) = HeaderValue::from_str(&format!("total;dur={:.3}", us as f64 / 1000.0)) {
        headers.insert(SERVER_TIMING.clone(), val);
    }

    let status = response.status().as_u16();
    if status >= 400 {
        warn!(%method, %path, status, us, "request failed");
    } else if path == "/health" {
        debug!(%method, %path, status, us, "request");
    } else {
        info!(%method, %path, status, us, "request");
    }

    response
}
