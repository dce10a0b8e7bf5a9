use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::identity::StudentId;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/attempts/{attempt_id}/result",
    params(
        ("attempt_id" = Uuid, Path, description = "Completed attempt to grade")
    ),
    responses(
        (status = 201, description = "Attempt graded; result and progress recorded", body = Json<serde_json::Value>),
        (status = 404, description = "Attempt not found"),
        (status = 409, description = "Attempt not completed or already graded"),
    )
)]
#[axum::debug_handler]
pub async fn create_result(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(attempt_id): Path<Uuid>,
) -> Result<Response> {
    let graded = state
        .result_service
        .create_result(student_id, attempt_id)
        .await?;
    Ok((StatusCode::CREATED, Json(graded)).into_response())
}

#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
) -> Result<Response> {
    let results = state.result_service.list_results(student_id).await?;
    Ok(Json(results).into_response())
}

#[axum::debug_handler]
pub async fn latest_result(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
) -> Result<Response> {
    let result = state.result_service.latest_result(student_id).await?;
    Ok(Json(result).into_response())
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let result = state.result_service.get_result(student_id, id).await?;
    Ok(Json(result).into_response())
}
