use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::sms::{MessagingProvider, ProviderResponse};

/// Application state shared across handlers
pub struct AppState {
    /// `None` when provider credentials were not configured
    pub provider: Option<MessagingProvider>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub sms_configured: bool,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        sms_configured: state.provider.is_some(),
    })
}

// ============================================================================
// Send
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SendRequest {
    /// Both fields, when present and non-empty
    fn fields(&self) -> Option<(&str, &str)> {
        let to = self.to.as_deref().filter(|s| !s.is_empty())?;
        let message = self.message.as_deref().filter(|s| !s.is_empty())?;
        Some((to, message))
    }
}

pub async fn send_sms(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let (to, message) = request
        .fields()
        .ok_or_else(|| ApiError::BadRequest("to and message required".to_string()))?;

    let provider = state
        .provider
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("SMS provider not configured".to_string()))?;

    let reply = provider.send(to, message).await.map_err(|e| {
        tracing::error!(error = %e, "send-sms failed");
        ApiError::Internal(e.to_string())
    })?;

    if !reply.is_success() {
        tracing::warn!(status = reply.status, "Provider rejected message");
    }

    Ok(relay_response(reply))
}

/// Relay the provider's status code with its JSON body
fn relay_response(reply: ProviderResponse) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(reply.body)).into_response()
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotConfigured(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
