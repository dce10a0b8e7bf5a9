use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::store::{ExamStore, ProgressFn};
use crate::error::{Error, Result};
use crate::models::attempt::{Answer, Attempt};
use crate::models::content::Content;
use crate::models::exam::Exam;
use crate::models::progress::ProgressRecord;
use crate::models::question::Question;
use crate::models::result::ExamResult;

#[derive(Default)]
struct Tables {
    contents: Vec<Content>,
    exams: Vec<Exam>,
    questions: Vec<Question>,
    attempts: Vec<Attempt>,
    answers: Vec<Answer>,
    results: Vec<ExamResult>,
    progress: Vec<ProgressRecord>,
}

/// In-process store with the same uniqueness and atomicity rules as the
/// Postgres one. Every operation runs under a single lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Internal("memory store mutex poisoned".to_string()))
    }

    pub fn answer_count(&self, attempt_id: Uuid) -> usize {
        self.lock()
            .map(|t| t.answers.iter().filter(|a| a.attempt_id == attempt_id).count())
            .unwrap_or(0)
    }

    pub fn attempt_count(&self, exam_id: Uuid) -> usize {
        self.lock()
            .map(|t| t.attempts.iter().filter(|a| a.exam_id == exam_id).count())
            .unwrap_or(0)
    }

    pub fn exam_count(&self) -> usize {
        self.lock().map(|t| t.exams.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn create_content(&self, content: &Content) -> Result<()> {
        let mut t = self.lock()?;
        if t.contents.iter().any(|c| c.id == content.id) {
            return Err(Error::Conflict(format!("content {} already exists", content.id)));
        }
        t.contents.push(content.clone());
        Ok(())
    }

    async fn get_content(&self, id: Uuid) -> Result<Content> {
        let t = self.lock()?;
        t.contents
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("content {} not found", id)))
    }

    async fn contents_by_ids(&self, student_id: Uuid, ids: &[Uuid]) -> Result<Vec<Content>> {
        let t = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                t.contents
                    .iter()
                    .find(|c| c.id == *id && c.student_id == student_id)
                    .cloned()
            })
            .collect())
    }

    async fn create_exam(&self, exam: &Exam, questions: &[Question]) -> Result<()> {
        let mut t = self.lock()?;
        if t.exams.iter().any(|e| e.id == exam.id) {
            return Err(Error::Conflict(format!("exam {} already exists", exam.id)));
        }
        let mut positions = HashSet::new();
        for q in questions {
            if q.exam_id != exam.id {
                return Err(Error::Internal(format!(
                    "question {} does not belong to exam {}",
                    q.id, exam.id
                )));
            }
            if !positions.insert(q.position) || t.questions.iter().any(|e| e.id == q.id) {
                return Err(Error::Conflict(format!(
                    "duplicate question at position {}",
                    q.position
                )));
            }
        }
        t.exams.push(exam.clone());
        t.questions.extend(questions.iter().cloned());
        Ok(())
    }

    async fn get_exam(&self, id: Uuid) -> Result<Exam> {
        let t = self.lock()?;
        t.exams
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("exam {} not found", id)))
    }

    async fn list_exams(&self, student_id: Uuid) -> Result<Vec<Exam>> {
        let t = self.lock()?;
        Ok(t.exams
            .iter()
            .rev()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_questions(&self, exam_id: Uuid) -> Result<Vec<Question>> {
        let t = self.lock()?;
        let mut questions: Vec<Question> = t
            .questions
            .iter()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.position);
        Ok(questions)
    }

    async fn find_or_create_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Attempt> {
        let mut t = self.lock()?;
        if !t.exams.iter().any(|e| e.id == exam_id) {
            return Err(Error::NotFound(format!("exam {} not found", exam_id)));
        }
        if let Some(existing) = t
            .attempts
            .iter()
            .find(|a| a.exam_id == exam_id && a.student_id == student_id)
        {
            return Ok(existing.clone());
        }
        let attempt = Attempt::new(exam_id, student_id);
        t.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Option<Attempt>> {
        let t = self.lock()?;
        Ok(t.attempts
            .iter()
            .find(|a| a.exam_id == exam_id && a.student_id == student_id)
            .cloned())
    }

    async fn get_attempt(&self, id: Uuid) -> Result<Attempt> {
        let t = self.lock()?;
        t.attempts
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("attempt {} not found", id)))
    }

    async fn insert_answers(&self, attempt_id: Uuid, answers: &[Answer]) -> Result<()> {
        let mut t = self.lock()?;
        let attempt = t
            .attempts
            .iter()
            .find(|a| a.id == attempt_id)
            .ok_or_else(|| Error::NotFound(format!("attempt {} not found", attempt_id)))?;
        if attempt.completed {
            return Err(Error::Conflict(format!(
                "attempt {} is already completed",
                attempt_id
            )));
        }
        let mut seen = HashSet::new();
        for answer in answers {
            let already_stored = t
                .answers
                .iter()
                .any(|a| a.attempt_id == attempt_id && a.question_id == answer.question_id);
            if already_stored || !seen.insert(answer.question_id) {
                return Err(Error::Conflict(format!(
                    "question {} has already been answered",
                    answer.question_id
                )));
            }
        }
        t.answers.extend(answers.iter().cloned());
        Ok(())
    }

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>> {
        let t = self.lock()?;
        Ok(t.answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn complete_attempt(&self, attempt_id: Uuid, at: DateTime<Utc>) -> Result<Attempt> {
        let mut t = self.lock()?;
        let attempt = t
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id)
            .ok_or_else(|| Error::NotFound(format!("attempt {} not found", attempt_id)))?;
        if attempt.completed {
            return Err(Error::Conflict(format!(
                "attempt {} is already completed",
                attempt_id
            )));
        }
        attempt.completed = true;
        attempt.submitted_at = Some(at);
        Ok(attempt.clone())
    }

    async fn record_result(
        &self,
        result: &ExamResult,
        progress: ProgressFn<'_>,
    ) -> Result<ProgressRecord> {
        let mut t = self.lock()?;
        if t.results.iter().any(|r| r.attempt_id == result.attempt_id) {
            return Err(Error::Conflict(format!(
                "a result already exists for attempt {}",
                result.attempt_id
            )));
        }
        let prior = t
            .progress
            .iter()
            .filter(|p| p.student_id == result.student_id)
            .last()
            .cloned();
        let mut history: Vec<ExamResult> = t
            .results
            .iter()
            .filter(|r| r.student_id == result.student_id)
            .cloned()
            .collect();
        history.push(result.clone());

        let record = progress(prior.as_ref(), &history);
        t.results.push(result.clone());
        t.progress.push(record.clone());
        Ok(record)
    }

    async fn get_result(&self, id: Uuid) -> Result<ExamResult> {
        let t = self.lock()?;
        t.results
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("result {} not found", id)))
    }

    async fn find_result_for_attempt(&self, attempt_id: Uuid) -> Result<Option<ExamResult>> {
        let t = self.lock()?;
        Ok(t.results.iter().find(|r| r.attempt_id == attempt_id).cloned())
    }

    async fn list_results(&self, student_id: Uuid) -> Result<Vec<ExamResult>> {
        let t = self.lock()?;
        Ok(t.results
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn latest_progress(&self, student_id: Uuid) -> Result<Option<ProgressRecord>> {
        let t = self.lock()?;
        Ok(t.progress
            .iter()
            .filter(|p| p.student_id == student_id)
            .last()
            .cloned())
    }

    async fn list_progress(&self, student_id: Uuid) -> Result<Vec<ProgressRecord>> {
        let t = self.lock()?;
        Ok(t.progress
            .iter()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect())
    }
}
