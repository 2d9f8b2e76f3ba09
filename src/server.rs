//! HTTP surface.
//!
//! Three routes: single-lead generation, multi-lead generation, and health.
//! Every internal failure is flattened to `500 {"detail": ...}` regardless of
//! root cause; callers can distinguish failure kinds only by the detail text.
//! Per-lead failures inside a multi-lead run do not produce a 500 — they
//! appear as error-content entries in the 200 response.

use crate::config::{OutreachConfig, ServerConfig};
use crate::draft::{DraftOutcome, EmailDraft, LeadRecord, ProductDetails};
use crate::error::ApiError;
use crate::generation::EmailGenerator;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

/// Shared per-process state: the generator holds the provider client and the
/// immutable generation settings.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<EmailGenerator>,
}

#[derive(Debug, Deserialize)]
pub struct SingleEmailRequest {
    pub lead: LeadRecord,
    pub product: ProductDetails,
}

#[derive(Debug, Deserialize)]
pub struct MultipleEmailsRequest {
    pub leads: Vec<LeadRecord>,
    pub product: ProductDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorDetail {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

async fn generate_single_email(
    State(state): State<AppState>,
    Json(request): Json<SingleEmailRequest>,
) -> Result<Json<EmailDraft>, ApiError> {
    let draft = state
        .generator
        .generate_single(&request.lead, &request.product)
        .await?;
    Ok(Json(draft))
}

async fn generate_multiple_emails(
    State(state): State<AppState>,
    Json(request): Json<MultipleEmailsRequest>,
) -> Result<Json<Vec<EmailDraft>>, ApiError> {
    let outcomes = state
        .generator
        .generate_batch(&request.leads, &request.product)
        .await?;
    Ok(Json(
        outcomes.into_iter().map(DraftOutcome::into_draft).collect(),
    ))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Assemble the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/generate-single-email", post(generate_single_email))
        .route("/generate-multiple-emails", post(generate_multiple_emails))
        .route("/health", get(health))
        .with_state(state)
}

/// CORS layer for the configured origins; an empty list means permissive.
pub fn cors_layer(config: &ServerConfig) -> Result<CorsLayer, ApiError> {
    if config.allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                ApiError::ConfigError(format!("Invalid CORS origin '{}': {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Run the HTTP server until shutdown.
pub async fn serve(config: OutreachConfig) -> anyhow::Result<()> {
    let generator = EmailGenerator::from_config(&config)?;
    let state = AppState {
        generator: Arc::new(generator),
    };

    let app = build_router(state).layer(cors_layer(&config.server)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %config.server.bind, "outreach service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_origin_list_is_permissive() {
        let config = ServerConfig::default();
        assert!(cors_layer(&config).is_ok());
    }

    #[test]
    fn invalid_origin_is_a_config_error() {
        let config = ServerConfig {
            bind: "0.0.0.0:8001".into(),
            allowed_origins: vec!["http://ok.example".into(), "bad\u{0}origin".into()],
        };
        assert!(matches!(
            cors_layer(&config).unwrap_err(),
            ApiError::ConfigError(_)
        ));
    }

    #[test]
    fn api_error_flattens_to_generic_500() {
        let response = ApiError::InvalidRequest("No leads provided in the list".into())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
