use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::attempt::{Answer, Attempt, AttemptStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 20000))]
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerItem {
    pub question_id: Uuid,
    #[validate(length(min = 1, max = 20000))]
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswersRequest {
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub answers: Vec<AnswerItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResponse {
    pub attempt_id: Uuid,
    pub exam_id: Uuid,
    pub status: AttemptStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Attempt> for AttemptResponse {
    fn from(attempt: Attempt) -> Self {
        Self {
            status: attempt.status(),
            attempt_id: attempt.id,
            exam_id: attempt.exam_id,
            submitted_at: attempt.submitted_at,
            created_at: attempt.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub saved: bool,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            saved: true,
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            timestamp: answer.created_at,
        }
    }
}
