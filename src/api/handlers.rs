//! HTTP request handlers

use super::stream::voice_stream;
use super::types::{ErrorResponse, HealthResponse};
use super::AppState;
use crate::signature::SIGNATURE_HEADER;
use crate::transport::{handle_turn, TurnRequest};
use crate::turn::Response as TurnResponse;
use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};

/// Largest stateless request body accepted
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Stateless turns, signature checked before routing
        .route(
            "/voice/turn",
            post(voice_turn).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_signature,
            )),
        )
        // Streaming calls
        .route("/voice/stream", get(voice_stream))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Stateless turns
// ============================================================

async fn voice_turn(
    State(state): State<AppState>,
    Form(request): Form<TurnRequest>,
) -> Json<TurnResponse> {
    Json(handle_turn(&state.router, request).await)
}

/// Reject requests whose signature does not match `canonical_url || body`
async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("Unreadable body: {e}")))?;

    let signature = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let path = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = state.config.canonical_url(path);

    if !state.verifier.verify(signature, &url, &bytes) {
        tracing::warn!(url = %url, has_signature = signature.is_some(), "Rejected unsigned or mis-signed turn");
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

// ============================================================
// Operations
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.len().await,
        capacity: state.sessions.capacity(),
    })
}

async fn get_version() -> &'static str {
    concat!("raider-hotline ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub(super) enum AppError {
    /// Fixed message; never says why verification failed
    Unauthorized,
    Busy,
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication failed".to_string()),
            AppError::Busy => (
                StatusCode::SERVICE_UNAVAILABLE,
                "All hotline lines are busy".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
