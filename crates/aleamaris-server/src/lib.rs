//! HTTP entropy server.
//!
//! Serves raw queue bytes (`/trng/*`) and DRBG-backed bytes/integers
//! (`/rng/*`) over a small axum router, one handler per route in the
//! boundary contract.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use aleamaris_core::error::AleaMarisError;
use aleamaris_core::orchestrator::Pipeline;
use aleamaris_core::rng::SeedProvider;

/// Shared server state: the running pipeline plus the ingest API key.
struct AppState {
    pipeline: Pipeline,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers
}

// ---- /trng/ingest ----

#[derive(Serialize)]
struct IngestResponse {
    received: usize,
    dropped: usize,
    available: usize,
}

async fn handle_trng_ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(expected) = &state.api_key {
        let supplied = headers
            .get("X-API-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if supplied != expected {
            let err = AleaMarisError::Unauthorized;
            return (
                cors_headers(),
                error_response(status_for(&err), err.to_string()),
            )
                .into_response();
        }
    }

    let received = body.len();
    let mut queue = state.pipeline.queue().lock().unwrap();
    let accepted = queue.offer(&body);
    let available = queue.available();
    drop(queue);
    let dropped = received - accepted;

    (
        cors_headers(),
        Json(IngestResponse {
            received,
            dropped,
            available,
        }),
    )
        .into_response()
}

// ---- /trng/bytes, /trng/raw ----

#[derive(Deserialize)]
struct TrngBytesParams {
    count: Option<usize>,
}

async fn handle_trng_bytes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrngBytesParams>,
) -> Response {
    let count = params.count.unwrap_or(256).clamp(1, 4096);
    let mut queue = state.pipeline.queue().lock().unwrap();
    let bytes = queue.poll(count);
    let available_after = queue.available();
    drop(queue);

    let mut headers = cors_headers();
    headers.insert(
        "X-Available-After",
        HeaderValue::from_str(&available_after.to_string()).unwrap(),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    (headers, bytes).into_response()
}

// ---- /trng/health ----

#[derive(Serialize)]
struct TrngHealthResponse {
    available: usize,
    status: &'static str,
}

async fn handle_trng_health(State(state): State<Arc<AppState>>) -> Response {
    let available = state.pipeline.queue().lock().unwrap().available();
    (
        cors_headers(),
        Json(TrngHealthResponse {
            available,
            status: "ok",
        }),
    )
        .into_response()
}

// ---- shared reseed helper ----

async fn maybe_reseed(state: &Arc<AppState>, reseed: bool) {
    if !reseed {
        return;
    }
    let reseed_bytes = state.pipeline.config().reseed_bytes;
    let mut provider = state.pipeline.seed_provider();
    let entropy = provider.provide(reseed_bytes);
    if !entropy.is_empty() {
        state.pipeline.rng().lock().await.reseed(&entropy);
    }
}

// ---- /rng/bytes ----

#[derive(Deserialize)]
struct RngBytesParams {
    count: Option<usize>,
    reseed: Option<bool>,
}

async fn handle_rng_bytes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RngBytesParams>,
) -> Response {
    let count = params.count.unwrap_or(256).clamp(1, 1_048_576);
    maybe_reseed(&state, params.reseed.unwrap_or(false)).await;

    let mut provider = state.pipeline.seed_provider();
    let bytes = state
        .pipeline
        .rng()
        .lock()
        .await
        .random_bytes(count, &mut provider);

    let mut headers = cors_headers();
    headers.insert(
        "X-Count",
        HeaderValue::from_str(&count.to_string()).unwrap(),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    (headers, bytes).into_response()
}

// ---- /rng/ints ----

#[derive(Deserialize)]
struct RngIntsParams {
    min: i64,
    max: i64,
    count: Option<usize>,
    reseed: Option<bool>,
    fmt: Option<String>,
}

async fn handle_rng_ints(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RngIntsParams>,
) -> Response {
    if params.min > params.max {
        let err = AleaMarisError::InvalidRange;
        return (
            cors_headers(),
            error_response(status_for(&err), "min>max"),
        )
            .into_response();
    }
    let count = params.count.unwrap_or(100).clamp(1, 100_000);
    maybe_reseed(&state, params.reseed.unwrap_or(false)).await;

    let mut provider = state.pipeline.seed_provider();
    let rng_handle = state.pipeline.rng();
    let mut rng = rng_handle.lock().await;
    let values: Vec<i64> = (0..count)
        .map(|_| rng.randint(params.min, params.max, &mut provider).unwrap())
        .collect();
    drop(rng);

    match params.fmt.as_deref() {
        Some("bin") => {
            let mut body = Vec::with_capacity(count * 4);
            for v in &values {
                body.extend_from_slice(&(*v as i32).to_le_bytes());
            }
            let mut headers = cors_headers();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            (headers, body).into_response()
        }
        _ => (cors_headers(), Json(values)).into_response(),
    }
}

// ---- /rng/u32.bin ----

#[derive(Deserialize)]
struct U32BinParams {
    count: Option<usize>,
    endian: Option<String>,
    reseed: Option<bool>,
}

async fn handle_u32_bin(
    State(state): State<Arc<AppState>>,
    Query(params): Query<U32BinParams>,
) -> Response {
    let count = params.count.unwrap_or(1024).clamp(1, 25_000_000);
    let big_endian = matches!(params.endian.as_deref(), Some("be"));
    maybe_reseed(&state, params.reseed.unwrap_or(false)).await;

    let mut provider = state.pipeline.seed_provider();
    let rng_handle = state.pipeline.rng();
    let mut rng = rng_handle.lock().await;
    let mut body = Vec::with_capacity(count * 4);
    for _ in 0..count {
        let word = rng.randint(0, u32::MAX as i64, &mut provider).unwrap() as u32;
        if big_endian {
            body.extend_from_slice(&word.to_be_bytes());
        } else {
            body.extend_from_slice(&word.to_le_bytes());
        }
    }
    drop(rng);

    let mut headers = cors_headers();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    (headers, body).into_response()
}

// ---- /rng/u32.jsonl ----

#[derive(Deserialize)]
struct U32JsonlParams {
    count: Option<usize>,
    reseed: Option<bool>,
}

async fn handle_u32_jsonl(
    State(state): State<Arc<AppState>>,
    Query(params): Query<U32JsonlParams>,
) -> Response {
    let count = params.count.unwrap_or(1024).clamp(1, 2_000_000);
    maybe_reseed(&state, params.reseed.unwrap_or(false)).await;

    let mut provider = state.pipeline.seed_provider();
    let rng_handle = state.pipeline.rng();
    let mut rng = rng_handle.lock().await;
    let mut body = String::with_capacity(count * 11);
    for _ in 0..count {
        let word = rng.randint(0, u32::MAX as i64, &mut provider).unwrap();
        body.push_str(&word.to_string());
        body.push('\n');
    }
    drop(rng);

    let mut headers = cors_headers();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-ndjson"),
    );
    (headers, body).into_response()
}

// ---- /rng/reseed ----

#[derive(Serialize)]
struct ReseedResponse {
    received: usize,
    status: &'static str,
}

async fn handle_rng_reseed(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let received = body.len();
    state.pipeline.rng().lock().await.reseed(&body);
    (
        cors_headers(),
        Json(ReseedResponse {
            received,
            status: "ok",
        }),
    )
        .into_response()
}

// ---- /rng/stats ----

#[derive(Serialize)]
struct StatsResponse {
    queue_available: usize,
    generated_since_reseed: u64,
    reseed_interval_bytes: u64,
}

async fn handle_rng_stats(State(state): State<Arc<AppState>>) -> Response {
    let queue_available = state.pipeline.queue().lock().unwrap().available();
    let rng_handle = state.pipeline.rng();
    let rng = rng_handle.lock().await;
    let body = StatsResponse {
        queue_available,
        generated_since_reseed: rng.generated_since_reseed(),
        reseed_interval_bytes: rng.reseed_interval_bytes(),
    };
    drop(rng);
    (cors_headers(), Json(body)).into_response()
}

/// Map a core-crate error to the HTTP status spec.md's §7 assigns it.
fn status_for(err: &AleaMarisError) -> StatusCode {
    match err {
        AleaMarisError::InvalidRange => StatusCode::BAD_REQUEST,
        AleaMarisError::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the axum router over an already-booted pipeline.
pub fn build_router(pipeline: Pipeline, api_key: Option<String>) -> Router {
    let state = Arc::new(AppState { pipeline, api_key });

    Router::new()
        .route("/trng/ingest", post(handle_trng_ingest))
        .route("/trng/bytes", get(handle_trng_bytes))
        .route("/trng/raw", get(handle_trng_bytes))
        .route("/trng/health", get(handle_trng_health))
        .route("/rng/bytes", get(handle_rng_bytes))
        .route("/rng/ints", get(handle_rng_ints))
        .route("/rng/u32.bin", get(handle_u32_bin))
        .route("/rng/u32.jsonl", get(handle_u32_jsonl))
        .route("/rng/reseed", post(handle_rng_reseed))
        .route("/rng/stats", get(handle_rng_stats))
        .with_state(state)
}

/// Run the HTTP entropy server until the process is killed.
pub async fn run_server(pipeline: Pipeline, host: &str, port: u16, api_key: Option<String>) {
    let app = build_router(pipeline, api_key);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    println!("aleamaris-server listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_for_maps_invalid_range_to_bad_request() {
        assert_eq!(
            status_for(&AleaMarisError::InvalidRange),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn status_for_maps_unauthorized() {
        assert_eq!(
            status_for(&AleaMarisError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn cors_headers_allow_any_origin() {
        let headers = cors_headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
