pub mod attempts;
pub mod contents;
pub mod exams;
pub mod health;
pub mod progress;
pub mod results;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/contents", post(contents::create_content))
        .route("/api/contents/:id", get(contents::get_content))
        .route("/api/exams", get(exams::list_exams).post(exams::create_exam))
        .route("/api/exams/:id", get(exams::get_exam))
        .route("/api/exams/:id/full", get(exams::get_full_exam))
        .route("/api/exams/:id/questions", get(exams::get_exam_questions))
        .route("/api/exams/:id/attempts", post(attempts::start_attempt))
        .route(
            "/api/exams/:id/questions/:question_id/answer",
            post(attempts::submit_answer),
        )
        .route("/api/exams/:id/answers", post(attempts::submit_answers))
        .route(
            "/api/exams/:id/attempts/:attempt_id/complete",
            post(attempts::complete_attempt),
        )
        .route(
            "/api/attempts/:attempt_id/result",
            post(results::create_result),
        )
        .route("/api/results", get(results::list_results))
        .route("/api/results/latest", get(results::latest_result))
        .route("/api/results/:id", get(results::get_result))
        .route("/api/progress/latest", get(progress::latest_progress))
        .route("/api/progress/history", get(progress::progress_history))
}
