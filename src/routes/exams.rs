use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{CreateExamRequest, ExamDetailResponse, ExamQuestionsResponse};
use crate::error::Result;
use crate::middleware::identity::StudentId;
use crate::models::question::{Difficulty, QuestionType};
use crate::services::exam_service::NewExam;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/exams",
    request_body = CreateExamRequest,
    responses(
        (status = 201, description = "Exam generated and stored", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid payload or unsupported question type"),
        (status = 404, description = "Referenced content not found"),
        (status = 502, description = "Question generator failed or returned malformed output"),
    )
)]
#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Json(req): Json<CreateExamRequest>,
) -> Result<Response> {
    req.validate()?;
    let question_type: QuestionType = req.question_type.parse()?;
    let difficulty: Difficulty = req.difficulty.parse()?;
    tracing::info!(
        student_id = %student_id,
        question_type = %question_type,
        count = req.num_questions,
        "creating exam"
    );

    let (exam, questions) = state
        .exam_service
        .create_exam(
            student_id,
            NewExam {
                content_ids: req.content_ids,
                title: req.title,
                question_type,
                difficulty,
                num_questions: req.num_questions,
                marks_per_question: req.marks_per_question,
                time_limit: req.time_limit,
                language: req.language,
                profile_summary: req.profile_summary,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ExamDetailResponse { exam, questions }),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
) -> Result<Response> {
    let exams = state.exam_service.list_exams(student_id).await?;
    Ok(Json(exams).into_response())
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let exam = state.exam_service.get_exam(student_id, id).await?;
    Ok(Json(exam).into_response())
}

#[axum::debug_handler]
pub async fn get_full_exam(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let (exam, questions) = state.exam_service.full_exam(student_id, id).await?;
    Ok(Json(ExamDetailResponse { exam, questions }).into_response())
}

#[utoipa::path(
    get,
    path = "/api/exams/{id}/questions",
    params(
        ("id" = Uuid, Path, description = "Exam ID")
    ),
    responses(
        (status = 200, description = "Questions without answer keys", body = Json<serde_json::Value>),
        (status = 404, description = "Exam not found"),
    )
)]
#[axum::debug_handler]
pub async fn get_exam_questions(
    State(state): State<AppState>,
    StudentId(_student_id): StudentId,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let (exam, questions) = state.exam_service.student_questions(id).await?;
    Ok(Json(ExamQuestionsResponse { exam, questions }).into_response())
}
