//! Encuesta HTTP API
//!
//! Axum-based HTTP server for the presentation feedback site. The three
//! navigable routes return the data a rendering layer needs; votes are
//! submitted to `/votar` and the dashboard reads `/resultados`.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to an
//! inner function returning `(StatusCode, body)`. The inner functions are
//! directly testable without axum dispatch.
//!
//! Endpoints:
//! - GET  /  landing data and share link
//! - GET  /votar  vote form descriptor
//! - POST /votar  submit a vote
//! - GET  /resultados  aggregated results (optional `group` filter)
//! - GET  /resultados/export  CSV download of the filtered responses
//! - GET  /health  backend reachability
//! - GET  /version  server version info

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use encuesta_core::aggregate::load_all;
use encuesta_core::export::{export_filename, ExportOptions, EXPORT_CONTENT_TYPE};
use encuesta_core::models::Rating;
use encuesta_core::results::{LoadState, ResultsPage};
use encuesta_core::routes::{share_link, Route};
use encuesta_core::submission::{SubmissionInput, SubmitError, Submitter};
use encuesta_core::{EncuestaConfig, GroupFilter, ResponseStore};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

const INVALID_BODY_MESSAGE: &str = "No pudimos leer tu respuesta. Por favor, intenta nuevamente.";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<dyn ResponseStore>,
    pub config: EncuestaConfig,
}

impl HttpState {
    pub fn new(store: Arc<dyn ResponseStore>, config: EncuestaConfig) -> Self {
        Self { store, config }
    }

    fn export_options(&self) -> ExportOptions {
        ExportOptions::from(&self.config.export)
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route(Route::Landing.path(), get(landing_handler))
        .route(Route::Vote.path(), get(vote_form_handler).post(submit_handler))
        .route(Route::Results.path(), get(results_handler))
        .route("/resultados/export", get(export_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    store: Arc<dyn ResponseStore>,
    config: EncuestaConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let share = share_link(&config.site.base_url);
    let state = Arc::new(HttpState::new(store, config));

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Encuesta HTTP API listening on http://{}", addr);
    tracing::info!("Vote link: {}", share);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ResultsQuery {
    pub group: Option<String>,
}

impl ResultsQuery {
    pub fn filter(&self) -> GroupFilter {
        GroupFilter::from_selector(self.group.as_deref())
    }
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    fn into_value(self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"status": "error"}))
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner landing: the call to action and the link behind the QR code.
pub fn landing_inner(config: &EncuestaConfig) -> serde_json::Value {
    let routes: serde_json::Map<String, serde_json::Value> = Route::ALL
        .iter()
        .map(|r| {
            let name = serde_json::to_value(r)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            (name, serde_json::json!(r.path()))
        })
        .collect();

    serde_json::json!({
        "title": "¿Crees que nuestra solución es el camino correcto?",
        "call_to_action": "Escanea y vota por nuestra presentación",
        "instructions": "Usa la cámara de tu dispositivo móvil para escanear el código QR",
        "share_link": share_link(&config.site.base_url),
        "routes": routes,
    })
}

/// Inner vote form: questions, rating captions and the confirmation delay.
pub fn vote_form_inner(config: &EncuestaConfig) -> serde_json::Value {
    let labels: Vec<serde_json::Value> = Rating::all()
        .map(|r| serde_json::json!({ "value": r.get(), "label": r.label() }))
        .collect();

    serde_json::json!({
        "title": "Danos tu opinión",
        "fields": [
            { "name": "group", "label": "Grupo", "required": true },
            { "name": "presentation_rating", "label": "¿Qué te pareció nuestra presentación?", "required": true, "min": Rating::MIN, "max": Rating::MAX },
            { "name": "proposal_rating", "label": "¿Qué opinas de nuestra propuesta de licitación?", "required": true, "min": Rating::MIN, "max": Rating::MAX },
            { "name": "comment", "label": "¿Qué deberíamos mejorar?", "required": false },
        ],
        "rating_labels": labels,
        "confirmation_seconds": config.form.confirmation_seconds,
        "notice": "Tu voto es anónimo y confidencial",
    })
}

/// Inner submit: validates and persists one vote.
pub async fn submit_inner(
    state: &HttpState,
    input: SubmissionInput,
) -> (StatusCode, serde_json::Value) {
    let submitter = Submitter::new(state.store.clone());

    match submitter.submit(input).await {
        Ok(stored) => (
            StatusCode::CREATED,
            serde_json::json!({
                "status": "ok",
                "message": "¡Gracias por tu feedback!",
                "response": stored,
                "confirmation_seconds": state.config.form.confirmation_seconds,
            }),
        ),
        Err(SubmitError::Validation(e)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::new(e.user_message())
                .with_code(e.code())
                .into_value(),
        ),
        Err(e @ SubmitError::Persistence(_)) => (
            StatusCode::BAD_GATEWAY,
            ErrorResponse::new(e.user_message()).into_value(),
        ),
    }
}

/// A body that is not a JSON object at all. Field-level problems never get
/// here; they surface as validation errors from `submit_inner`.
pub fn invalid_body(rejection: &JsonRejection) -> (StatusCode, serde_json::Value) {
    tracing::warn!(error = %rejection.body_text(), "Rejected vote body");
    (
        rejection.status(),
        ErrorResponse::new(INVALID_BODY_MESSAGE)
            .with_code("invalid_body")
            .into_value(),
    )
}

/// Load once and walk the results page state machine.
async fn load_page(state: &HttpState, filter: GroupFilter) -> ResultsPage {
    let mut page = ResultsPage::with_filter(filter);
    page.finish_load(load_all(state.store.as_ref()).await);
    page
}

/// Inner results: averages, group selector and the filtered responses.
pub async fn results_inner(
    state: &HttpState,
    query: ResultsQuery,
) -> (StatusCode, serde_json::Value) {
    let page = load_page(state, query.filter()).await;

    if let LoadState::LoadError(message) = page.state() {
        return (
            StatusCode::BAD_GATEWAY,
            ErrorResponse::new(message.clone()).into_value(),
        );
    }

    match page
        .view(&state.export_options())
        .and_then(|view| serde_json::to_value(view).ok())
    {
        Some(body) => (StatusCode::OK, body),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new("results unavailable").into_value(),
        ),
    }
}

/// A rendered CSV download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub body: String,
}

/// Inner export: CSV of the filtered responses, named after `today`.
pub async fn export_inner(
    state: &HttpState,
    query: ResultsQuery,
    today: NaiveDate,
) -> std::result::Result<ExportFile, (StatusCode, serde_json::Value)> {
    let page = load_page(state, query.filter()).await;

    match page.view(&state.export_options()) {
        Some(view) => Ok(ExportFile {
            filename: export_filename(today),
            body: view.export,
        }),
        None => {
            let message = match page.state() {
                LoadState::LoadError(m) => m.clone(),
                _ => "results unavailable".to_string(),
            };
            Err((StatusCode::BAD_GATEWAY, ErrorResponse::new(message).into_value()))
        }
    }
}

/// Inner health: a select against the backend proves it is reachable.
pub async fn health_inner(store: &dyn ResponseStore) -> (StatusCode, serde_json::Value) {
    match store.select().await {
        Ok(rows) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "backend": store.name(),
                "responses": rows.len(),
            }),
        ),
        Err(e) => {
            tracing::error!(backend = store.name(), error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "version": env!("CARGO_PKG_VERSION"),
                    "backend": store.name(),
                }),
            )
        }
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": "encuesta",
    })
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn landing_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(landing_inner(&state.config)))
}

pub async fn vote_form_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(vote_form_inner(&state.config)))
}

pub async fn submit_handler(
    State(state): State<Arc<HttpState>>,
    payload: std::result::Result<Json<SubmissionInput>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(input)) => submit_inner(&state, input).await,
        Err(rejection) => invalid_body(&rejection),
    };
    (status, Json(body))
}

pub async fn results_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ResultsQuery>,
) -> impl IntoResponse {
    let (status, body) = results_inner(&state, query).await;
    (status, Json(body))
}

pub async fn export_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ResultsQuery>,
) -> Response {
    match export_inner(&state, query, Utc::now().date_naive()).await {
        Ok(file) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, EXPORT_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.filename),
                ),
            ],
            file.body,
        )
            .into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
