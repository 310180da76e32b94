//! HTTP routes and handlers

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use smsguard_classifiers::MAX_UPLOAD_BYTES;
use smsguard_core::{Error, PredictionResult};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::results::ResultRow;
use crate::state::AppState;

/// Preview rows returned when the caller sends no usable `preview_limit`
const DEFAULT_PREVIEW_LIMIT: usize = 20;
const MIN_PREVIEW_LIMIT: usize = 10;
const MAX_PREVIEW_LIMIT: usize = 50;

/// Multipart framing overhead allowed on top of the upload cap, so oversized
/// files reach the ingester and are reported as such.
const BODY_LIMIT: usize = MAX_UPLOAD_BYTES * 2;

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/models", get(list_models))
        .route("/predict", post(predict))
        .route("/predict-file", post(predict_file))
        .route("/download/*name", get(download))
        .route("/metrics", get(metrics));

    if let Some(dir) = &state.frontend_dir {
        info!("Serving UI from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler error, rendered as `{"detail": ...}`
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] Error),

    #[error("inference task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Core(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Core(err) => err.kind(),
            Self::Task(_) => "task",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Core(Error::invalid_input(rejection.body_text()))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        Self::Core(Error::invalid_input(format!(
            "malformed upload: {}",
            err.body_text()
        )))
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Core(Error::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::counter!("smsguard_errors_total", "kind" => self.kind()).increment(1);

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

async fn health() -> impl IntoResponse {
    count_request("/health");
    Json(json!({
        "status": "ok",
        "time_utc": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    count_request("/models");
    Json(json!({ "models": state.engine.list_models() }))
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    threshold: Option<f64>,
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, AppError> {
    count_request("/predict");
    let Json(request) = payload?;

    let model_id = required(request.model_id, "model_id")?;
    let text = required(request.text, "text")?;
    let threshold = request.threshold;

    let result = tokio::task::spawn_blocking(move || {
        state.engine.predict_one(&model_id, &text, threshold)
    })
    .await??;

    Ok(Json(result))
}

/// Response of a batch upload
#[derive(Debug, Serialize)]
struct BatchResponse {
    model_id: String,
    total_rows: usize,
    text_column_used: String,
    preview: Vec<ResultRow>,
    download_url: String,
}

#[derive(Debug, Default)]
struct BatchForm {
    file: Option<(String, Vec<u8>)>,
    model_id: Option<String>,
    text_column: Option<String>,
    threshold: Option<String>,
    preview_limit: Option<String>,
}

impl BatchForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let content = field.bytes().await?;
                    form.file = Some((filename, content.to_vec()));
                }
                "model_id" => form.model_id = Some(field.text().await?),
                "text_column" => form.text_column = Some(field.text().await?),
                "threshold" => form.threshold = Some(field.text().await?),
                "preview_limit" => form.preview_limit = Some(field.text().await?),
                other => debug!("Ignoring form field '{}'", other),
            }
        }

        Ok(form)
    }
}

async fn predict_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    count_request("/predict-file");
    let form = BatchForm::read(multipart?).await?;

    let (filename, content) = form
        .file
        .ok_or_else(|| Error::invalid_input("missing upload file"))?;
    let model_id = required(form.model_id, "model_id")?;
    let threshold = parse_threshold(form.threshold.as_deref())?;
    let preview_limit = parse_preview_limit(form.preview_limit.as_deref());
    let text_column = form.text_column;

    let response = tokio::task::spawn_blocking(move || -> Result<BatchResponse, Error> {
        let batch = state
            .ingester
            .ingest(&filename, &content, text_column.as_deref())?;
        let predictions = state
            .engine
            .predict_batch(&model_id, &batch.messages, threshold)?;

        let rows = ResultRow::from_predictions(predictions);
        let stored = state.results.write(&model_id, &rows)?;

        info!(
            "Classified {} rows from '{}' with '{}'",
            rows.len(),
            filename,
            model_id
        );

        let total_rows = rows.len();
        let preview = rows.into_iter().take(preview_limit).collect();
        Ok(BatchResponse {
            model_id,
            total_rows,
            text_column_used: batch.column,
            preview,
            download_url: format!("/download/{}", stored),
        })
    })
    .await??;

    Ok(Json(response))
}

async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    count_request("/download");
    let path = state.results.locate(&name)?;
    let content = tokio::fs::read(&path).await.map_err(Error::from)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        content,
    )
        .into_response())
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

fn count_request(route: &'static str) {
    metrics::counter!("smsguard_requests_total", "route" => route).increment(1);
}

fn required(value: Option<String>, field: &str) -> Result<String, Error> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::invalid_input(format!("missing `{}`", field)))
}

fn parse_threshold(raw: Option<&str>) -> Result<Option<f64>, Error> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::invalid_input("`threshold` must be a number between 0 and 1")),
    }
}

fn parse_preview_limit(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .map(|limit| limit.clamp(MIN_PREVIEW_LIMIT as i64, MAX_PREVIEW_LIMIT as i64) as usize)
        .unwrap_or(DEFAULT_PREVIEW_LIMIT)
}
