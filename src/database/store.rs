use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::attempt::{Answer, Attempt};
use crate::models::content::Content;
use crate::models::exam::Exam;
use crate::models::progress::ProgressRecord;
use crate::models::question::Question;
use crate::models::result::ExamResult;

/// Builds the next progress snapshot from the latest prior snapshot and the
/// student's full result history (the new result included, oldest first).
pub type ProgressFn<'a> =
    &'a (dyn Fn(Option<&ProgressRecord>, &[ExamResult]) -> ProgressRecord + Send + Sync);

/// Persistence seam for everything the exam flows read and write.
///
/// Each method is one transaction. Implementations must uphold the uniqueness
/// rules even under concurrent callers: one attempt per (exam, student), one
/// answer per (attempt, question), one result per attempt.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn create_content(&self, content: &Content) -> Result<()>;

    async fn get_content(&self, id: Uuid) -> Result<Content>;

    /// Returns the owner's rows among `ids`, in the order requested. Unknown
    /// or foreign ids are skipped.
    async fn contents_by_ids(&self, student_id: Uuid, ids: &[Uuid]) -> Result<Vec<Content>>;

    /// Persists the exam and its whole question set, or nothing.
    async fn create_exam(&self, exam: &Exam, questions: &[Question]) -> Result<()>;

    async fn get_exam(&self, id: Uuid) -> Result<Exam>;

    /// Newest first.
    async fn list_exams(&self, student_id: Uuid) -> Result<Vec<Exam>>;

    /// Ordered by position.
    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>>;

    async fn find_or_create_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Attempt>;

    async fn find_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Option<Attempt>>;

    async fn get_attempt(&self, id: Uuid) -> Result<Attempt>;

    /// All-or-nothing. `Conflict` if the attempt is completed or any question
    /// already has an answer in it.
    async fn insert_answers(&self, attempt_id: Uuid, answers: &[Answer]) -> Result<()>;

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>>;

    /// `Conflict` if the attempt was already completed.
    async fn complete_attempt(&self, attempt_id: Uuid, at: DateTime<Utc>) -> Result<Attempt>;

    /// Stores the result and the progress snapshot `progress` derives for it.
    /// Snapshots for one student are produced one at a time.
    async fn record_result(
        &self,
        result: &ExamResult,
        progress: ProgressFn<'_>,
    ) -> Result<ProgressRecord>;

    async fn get_result(&self, id: Uuid) -> Result<ExamResult>;

    async fn find_result_for_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamResult>>;

    /// Oldest first.
    async fn list_results(&self, student_id: Uuid) -> Result<Vec<ExamResult>>;

    async fn latest_progress(&self, student_id: Uuid) -> Result<Option<ProgressRecord>>;

    /// Oldest first.
    async fn list_progress(&self, student_id: Uuid) -> Result<Vec<ProgressRecord>>;
}
