use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::grade::LetterGrade;
use crate::models::question::QuestionType;

/// Outcome of grading one question. Returned to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedQuestionResult {
    pub question_id: Uuid,
    pub question_type: QuestionType,
    pub statement: String,
    pub response: String,
    pub marks_possible: i32,
    pub marks_obtained: i32,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub student_id: Uuid,
    pub exam_title: String,
    pub total_marks: i32,
    pub obtained_marks: i32,
    pub percentage: f64,
    pub grade: LetterGrade,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}
