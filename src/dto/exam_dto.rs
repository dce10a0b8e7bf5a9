use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::services::exam_service::StudentQuestion;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateContentRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub kind: String,
    #[validate(length(min = 1, max = 200000))]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExamRequest {
    pub content_ids: Vec<Uuid>,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    pub question_type: String,
    pub difficulty: String,
    #[validate(range(min = 1))]
    pub num_questions: u32,
    #[validate(range(min = 1))]
    pub marks_per_question: i32,
    #[validate(range(min = 1))]
    pub time_limit: Option<i32>,
    #[validate(length(min = 1, max = 64))]
    pub language: Option<String>,
    #[validate(length(max = 2000))]
    pub profile_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamDetailResponse {
    pub exam: Exam,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamQuestionsResponse {
    pub exam: Exam,
    pub questions: Vec<StudentQuestion>,
}
