use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};

use crate::error::{Error, Result};
use crate::middleware::identity::StudentId;
use crate::services::progress_service::ProgressService;
use crate::AppState;

#[axum::debug_handler]
pub async fn latest_progress(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
) -> Result<Response> {
    let svc = ProgressService::new(state.store.clone());
    let record = svc
        .latest(student_id)
        .await?
        .ok_or_else(|| Error::NotFound("no progress recorded yet".to_string()))?;
    Ok(Json(record).into_response())
}

#[axum::debug_handler]
pub async fn progress_history(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
) -> Result<Response> {
    let svc = ProgressService::new(state.store.clone());
    let history = svc.history(student_id).await?;
    Ok(Json(history).into_response())
}
