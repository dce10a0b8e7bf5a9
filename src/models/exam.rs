use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::content::ContentKind;
use crate::models::question::{Difficulty, QuestionType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub title: String,
    pub student_id: Uuid,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub num_questions: i32,
    pub marks_per_question: i32,
    pub total_marks: i32,
    pub time_limit: Option<i32>,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One piece of study material handed to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceExcerpt {
    pub title: String,
    pub kind: ContentKind,
    pub body: String,
}

/// Everything needed to generate one exam. Fixed once the exam is created.
#[derive(Debug, Clone)]
pub struct ExamSpecification {
    pub title: String,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub count: u32,
    pub source_material: Vec<SourceExcerpt>,
    pub profile_summary: String,
    pub marks_per_question: i32,
    pub time_limit: Option<i32>,
    pub language: Option<String>,
}
