use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::{
    AnswerResponse, AttemptResponse, SubmitAnswerRequest, SubmitAnswersRequest,
};
use crate::error::Result;
use crate::middleware::identity::StudentId;
use crate::services::attempt_service::AttemptService;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/exams/{id}/attempts",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    responses(
        (status = 200, description = "The student's attempt, created on first call", body = Json<AttemptResponse>),
        (status = 404, description = "Exam not found"),
    )
)]
#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(exam_id): Path<Uuid>,
) -> Result<Response> {
    let svc = AttemptService::new(state.store.clone());
    let attempt = svc.start_attempt(exam_id, student_id).await?;
    Ok(Json(AttemptResponse::from(attempt)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/exams/{id}/questions/{question_id}/answer",
    request_body = SubmitAnswerRequest,
    responses(
        (status = 201, description = "Answer stored", body = Json<AnswerResponse>),
        (status = 404, description = "No attempt started or unknown question"),
        (status = 409, description = "Question already answered or attempt completed"),
    )
)]
#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path((exam_id, question_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Response> {
    req.validate()?;
    let svc = AttemptService::new(state.store.clone());
    let answer = svc
        .submit_answer(exam_id, student_id, question_id, req.response)
        .await?;
    Ok((StatusCode::CREATED, Json(AnswerResponse::from(answer))).into_response())
}

#[axum::debug_handler]
pub async fn submit_answers(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(exam_id): Path<Uuid>,
    Json(req): Json<SubmitAnswersRequest>,
) -> Result<Response> {
    req.validate()?;
    let svc = AttemptService::new(state.store.clone());
    let responses = req
        .answers
        .into_iter()
        .map(|a| (a.question_id, a.response))
        .collect();
    let answers = svc.submit_answers(exam_id, student_id, responses).await?;
    let body: Vec<AnswerResponse> = answers.into_iter().map(AnswerResponse::from).collect();
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

#[axum::debug_handler]
pub async fn complete_attempt(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path((exam_id, attempt_id)): Path<(Uuid, Uuid)>,
) -> Result<Response> {
    let svc = AttemptService::new(state.store.clone());
    let attempt = svc.complete_attempt(exam_id, student_id, attempt_id).await?;
    Ok(Json(AttemptResponse::from(attempt)).into_response())
}
