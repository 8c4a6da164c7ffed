//! HTTP form surface: `GET /` form, `POST /submit` multipart pipeline run, `GET /health`.

pub mod page;

use crate::commands::{self, Submission};
use crate::config::AppConfig;
use crate::error::{Stage, StageError};
use crate::models::InferenceContext;
use crate::types::UploadedFile;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub ctx: InferenceContext,
    pub config: Arc<AppConfig>,
    /// Logo read once at startup, as a `data:` URI.
    pub logo: Option<Arc<str>>,
}

impl AppState {
    pub fn new(ctx: InferenceContext, config: AppConfig) -> Self {
        let logo = page::logo_data_uri(&config.logo_path).map(Arc::from);
        Self {
            ctx,
            config: Arc::new(config),
            logo,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/submit", post(submit))
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::form_page(&Default::default(), None, state.logo.as_deref()))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "features": state.ctx.scaler.n_features(),
    }))
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission, MultipartError> {
    let mut submission = Submission::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "equipment_name" => submission.equipment.equipment_name = field.text().await?,
            "company" => submission.equipment.company = field.text().await?,
            "model" => submission.equipment.model = field.text().await?,
            "logs" | "manual" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await?.to_vec();
                // Browsers send an empty part for an untouched file input.
                let file = (!bytes.is_empty()).then(|| UploadedFile::new(file_name, bytes));
                if name == "logs" {
                    submission.log_file = file;
                } else {
                    submission.manual_file = file;
                }
            }
            other => warn!(field = other, "Ignoring unknown form field"),
        }
    }
    Ok(submission)
}

fn status_for(err: &StageError) -> StatusCode {
    if err.is_user_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn submit(State(state): State<AppState>, multipart: Multipart) -> (StatusCode, Html<String>) {
    let logo = state.logo.as_deref();
    let submission = match read_submission(multipart).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Malformed upload");
            let message = format!("Upload failed: {}", e.body_text());
            return (e.status(), Html(page::form_page(&Default::default(), Some(message.as_str()), logo)));
        }
    };

    let equipment = submission.equipment.clone();
    let ctx = state.ctx.clone();
    let config = state.config.clone();
    let joined = tokio::task::spawn_blocking(move || commands::process_submission(&ctx, &config, &submission)).await;

    match joined {
        Ok(Ok(outcome)) => {
            if let Some(alert) = &outcome.alert {
                info!(delay_secs = alert.delay.as_secs_f64(), "Failure alert sent, sound plays after the delay");
            }
            (StatusCode::OK, Html(page::result_page(&outcome, logo)))
        }
        Ok(Err(err)) => {
            if err.stage == Stage::Input {
                info!("{}", err.source);
            } else {
                warn!(stage = %err.stage, error = %err.source, "Submission failed");
            }
            let message = match err.stage {
                Stage::Input => err.source.to_string(),
                _ => format!("Processing error: {}", err),
            };
            (status_for(&err), Html(page::form_page(&equipment, Some(message.as_str()), logo)))
        }
        Err(join_err) => {
            error!(error = %join_err, "Pipeline task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page::form_page(
                    &equipment,
                    Some("Processing error: internal failure, please resubmit."),
                    logo,
                )),
            )
        }
    }
}
