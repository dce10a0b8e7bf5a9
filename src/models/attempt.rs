use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub student_id: Uuid,
    pub completed: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    pub fn new(exam_id: Uuid, student_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_id,
            student_id,
            completed: false,
            submitted_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn status(&self) -> AttemptStatus {
        if self.completed {
            AttemptStatus::Completed
        } else {
            AttemptStatus::InProgress
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(attempt_id: Uuid, question_id: Uuid, response: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt_id,
            question_id,
            response,
            created_at: Utc::now(),
        }
    }
}
