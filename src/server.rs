//! HTTP surface: one handler per dashboard control

use crate::data::CustomerTable;
use crate::model::{ChurnModel, PredictionRequest};
use crate::views::{self, Section};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Process-wide read-only inputs shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<CustomerTable>,
    pub model: Arc<ChurnModel>,
}

impl AppState {
    pub fn new(table: Arc<CustomerTable>, model: Arc<ChurnModel>) -> Self {
        Self { table, model }
    }
}

/// Raw prediction form fields; bounds are applied by [`PredictionRequest::clamped`]
#[derive(Debug, Deserialize)]
pub struct PredictForm {
    pub recency: f64,
    pub frequency: f64,
    pub monetary: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub customers: usize,
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_introduction))
        .route(
            "/sections/predict-churn",
            get(serve_prediction_form).post(submit_prediction),
        )
        .route("/sections/:slug", get(serve_section).post(not_found))
        .route("/health", get(health_check))
        .fallback(not_found)
        .with_state(state)
}

/// GET /
async fn serve_introduction(State(state): State<AppState>) -> Response {
    render_section(Section::default(), &state)
}

/// GET /sections/:slug
async fn serve_section(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    match Section::from_slug(&slug) {
        Some(section) => render_section(section, &state),
        None => not_found_page(&format!("/sections/{}", slug)),
    }
}

/// GET /sections/predict-churn
async fn serve_prediction_form(State(state): State<AppState>) -> Response {
    render_section(Section::PredictChurn, &state)
}

/// POST /sections/predict-churn. Other sections take no form.
async fn submit_prediction(
    State(state): State<AppState>,
    Form(form): Form<PredictForm>,
) -> Response {
    let request = PredictionRequest::clamped(form.recency, form.frequency, form.monetary);
    let outcome = state.model.predict(&request);
    let status = match &outcome {
        Ok(label) => {
            info!(?request, label = label.as_flag(), "Prediction served");
            StatusCode::OK
        }
        Err(e) => {
            error!(?request, "Prediction failed: {}", e);
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };

    (status, Html(views::render_prediction_page(&request, &outcome))).into_response()
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        customers: state.table.len(),
    })
}

async fn not_found(uri: axum::http::Uri) -> Response {
    not_found_page(uri.path())
}

fn not_found_page(path: &str) -> Response {
    (StatusCode::NOT_FOUND, Html(views::render_not_found(path))).into_response()
}

fn render_section(section: Section, state: &AppState) -> Response {
    debug!("Rendering section {}", section);
    match views::render_page(section, &state.table) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render {}: {:#}", section, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(views::render_error_page(section, &format!("{:#}", e))),
            )
                .into_response()
        }
    }
}
