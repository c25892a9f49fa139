use std::{any::Any, sync::Arc};

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Local;
use hemavision_core::{Backend, Mode};
use hemavision_types::{format_percent, prelude::*};
use serde::Serialize;
use serde_json::json;

use crate::{
    error::{AppError, INTERNAL_ERROR, INVALID_CELL_TYPE, NOT_FOUND, NO_FILE_PROVIDED},
    upload::UploadStore,
    AppState,
};

const UPLOAD_FIELD: &str = "file";

pub async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub predicted_cell: CellType,
    pub confidence: String,
    pub all_predictions: PercentageMap,
    pub report: DiagnosticReport,
    pub chart: Option<String>,
    pub uploaded_file: String,
}

#[axum::debug_handler]
pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "request is not multipart");
        AppError::validation(NO_FILE_PROVIDED)
    })?;

    let (filename, bytes) = loop {
        let Some(field) = multipart.next_field().await? else {
            return Err(AppError::validation(NO_FILE_PROVIDED));
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        // A part without a filename is a plain form value, not a file.
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        UploadStore::check(&filename)?;
        break (filename, field.bytes().await?);
    };

    let (stored, diagnosis) = tokio::task::spawn_blocking(move || -> Result<_, AppError> {
        let stored = state.uploads.store(&filename, &bytes)?;
        let diagnosis = state
            .pipeline
            .diagnose(&bytes, &stored.source_name, &stored.stored_name)?;
        Ok((stored, diagnosis))
    })
    .await
    .map_err(|err| AppError::Internal(format!("prediction task failed: {err}")))??;

    let (predicted, confidence) = diagnosis.probabilities.top();
    Ok(Json(PredictResponse {
        success: true,
        predicted_cell: predicted,
        confidence: format_percent(confidence, 2),
        all_predictions: PercentageMap(diagnosis.probabilities),
        report: diagnosis.report,
        chart: diagnosis.chart,
        uploaded_file: stored.stored_name,
    }))
}

pub async fn cell_info(
    Path(cell_type): Path<String>,
) -> Result<Json<&'static CellInfo>, AppError> {
    let cell: CellType = cell_type
        .parse()
        .map_err(|_| AppError::validation(INVALID_CELL_TYPE))?;
    Ok(Json(cell.info()))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub mode: Mode,
    pub model_loaded: bool,
    pub timestamp: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    let backend = state.pipeline.backend();
    Json(Health {
        status: "ok",
        mode: backend.mode(),
        model_loaded: matches!(backend, Backend::Model(_)) && backend.is_ready(),
        timestamp: Local::now().to_rfc3339(),
    })
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": NOT_FOUND })))
}

pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": INTERNAL_ERROR })),
    )
        .into_response()
}
