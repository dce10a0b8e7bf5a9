use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::grade::LetterGrade;

/// Append-only snapshot of a student's cumulative performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub last_exam_score: i32,
    pub total_exams_taken: i32,
    pub exams_passed: i32,
    pub exams_failed: i32,
    pub total_points: i64,
    pub overall_percentage: f64,
    pub overall_grade: Option<LetterGrade>,
}
