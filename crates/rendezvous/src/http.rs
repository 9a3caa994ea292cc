//! HTTP surface of the rendezvous store.
//!
//! JSON bodies, no authentication. `sdp` is an opaque blob; the store
//! relays it without ever parsing the contents.
//!
//! | Method & path           | Success                  | Failure       |
//! |-------------------------|--------------------------|---------------|
//! | POST /api/session       | 200 `{token}`            | none          |
//! | POST /api/offer         | 200 `{ok:true}`          | 404, 409      |
//! | GET  /api/offer?token=  | 200 `{sdp}`              | 204, 404      |
//! | POST /api/answer        | 200 `{ok:true}`          | 404           |
//! | GET  /api/answer?token= | 200 `{sdp}`              | 204, 404      |
//! | GET  /api/debug?token=  | 200 `{hasOffer,...}`     | 404           |

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::store::{SlotStore, StoreError};
use crate::token;

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct PutDescription {
    token: String,
    sdp: String,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: String,
}

#[derive(Debug, Serialize)]
struct SdpResponse {
    sdp: String,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugResponse {
    has_offer: bool,
    has_answer: bool,
    /// Milliseconds since the Unix epoch.
    updated_at: i64,
}

struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self.0 {
            StoreError::NotFound => (StatusCode::NOT_FOUND, "no session"),
            StoreError::Conflict => (StatusCode::CONFLICT, "already used"),
        };
        (status, axum::Json(ErrorResponse { error })).into_response()
    }
}

/// Malformed tokens get "no session" semantics before touching the store.
fn checked(token: &str) -> Result<&str, ApiError> {
    if token::is_valid(token) {
        Ok(token)
    } else {
        Err(ApiError(StoreError::NotFound))
    }
}

async fn create_session(State(store): State<Arc<SlotStore>>) -> axum::Json<TokenResponse> {
    let token = store.create_slot();
    axum::Json(TokenResponse { token })
}

async fn put_offer(
    State(store): State<Arc<SlotStore>>,
    axum::Json(body): axum::Json<PutDescription>,
) -> Result<axum::Json<OkResponse>, ApiError> {
    store.put_offer(checked(&body.token)?, body.sdp)?;
    Ok(axum::Json(OkResponse { ok: true }))
}

async fn get_offer(
    State(store): State<Arc<SlotStore>>,
    Query(q): Query<TokenQuery>,
) -> Result<Response, ApiError> {
    match store.get_offer(checked(&q.token)?)? {
        Some(sdp) => Ok(axum::Json(SdpResponse { sdp }).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn put_answer(
    State(store): State<Arc<SlotStore>>,
    axum::Json(body): axum::Json<PutDescription>,
) -> Result<axum::Json<OkResponse>, ApiError> {
    store.put_answer(checked(&body.token)?, body.sdp)?;
    Ok(axum::Json(OkResponse { ok: true }))
}

async fn get_answer(
    State(store): State<Arc<SlotStore>>,
    Query(q): Query<TokenQuery>,
) -> Result<Response, ApiError> {
    match store.get_answer(checked(&q.token)?)? {
        Some(sdp) => Ok(axum::Json(SdpResponse { sdp }).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn debug_slot(
    State(store): State<Arc<SlotStore>>,
    Query(q): Query<TokenQuery>,
) -> Result<axum::Json<DebugResponse>, ApiError> {
    let d = store.debug_slot(checked(&q.token)?)?;
    Ok(axum::Json(DebugResponse {
        has_offer: d.has_offer,
        has_answer: d.has_answer,
        updated_at: d.updated_at.timestamp_millis(),
    }))
}

/// Builds the API router over a shared store.
pub fn router(store: Arc<SlotStore>) -> Router {
    Router::new()
        .route("/api/session", post(create_session))
        .route("/api/offer", post(put_offer).get(get_offer))
        .route("/api/answer", post(put_answer).get(get_answer))
        .route("/api/debug", get(debug_slot))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Serves the API until cancellation.
pub async fn serve(
    store: Arc<SlotStore>,
    listener: tokio::net::TcpListener,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!("rendezvous listening on http://{addr}");
    axum::serve(listener, router(store))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
