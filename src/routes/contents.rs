use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::CreateContentRequest;
use crate::error::Result;
use crate::middleware::identity::StudentId;
use crate::models::content::ContentKind;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/contents",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Study material stored", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing student identity"),
    )
)]
#[axum::debug_handler]
pub async fn create_content(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Json(req): Json<CreateContentRequest>,
) -> Result<Response> {
    req.validate()?;
    let kind: ContentKind = req.kind.parse()?;
    let content = state
        .exam_service
        .create_content(student_id, req.title, kind, req.body)
        .await?;
    Ok((StatusCode::CREATED, Json(content)).into_response())
}

#[axum::debug_handler]
pub async fn get_content(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let content = state.exam_service.get_content(student_id, id).await?;
    Ok(Json(content).into_response())
}
