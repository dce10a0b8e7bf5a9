use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::ExamStore;
use crate::error::{Error, Result};
use crate::models::attempt::{Answer, Attempt};

/// Drives an attempt from start to completion. Grading happens elsewhere,
/// once the attempt is completed.
#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn ExamStore>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Returns the student's attempt on the exam, creating it on first call.
    /// Any student may attempt any exam; attempts are keyed by (exam, student).
    pub async fn start_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Attempt> {
        self.store.get_exam(exam_id).await?;
        let attempt = self.store.find_or_create_attempt(exam_id, student_id).await?;
        tracing::info!(
            exam_id = %exam_id,
            attempt_id = %attempt.id,
            student_id = %student_id,
            completed = attempt.completed,
            "attempt started"
        );
        Ok(attempt)
    }

    async fn open_attempt(&self, exam_id: Uuid, student_id: Uuid) -> Result<Attempt> {
        let attempt = self
            .store
            .find_attempt(exam_id, student_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("no attempt has been started for exam {}", exam_id))
            })?;
        if attempt.completed {
            return Err(Error::Conflict(format!(
                "attempt {} is already completed",
                attempt.id
            )));
        }
        Ok(attempt)
    }

    pub async fn submit_answer(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
        question_id: Uuid,
        response: String,
    ) -> Result<Answer> {
        let mut stored = self
            .submit_answers(exam_id, student_id, vec![(question_id, response)])
            .await?;
        stored
            .pop()
            .ok_or_else(|| Error::Internal("answer was not stored".to_string()))
    }

    /// Stores every answer or none of them.
    pub async fn submit_answers(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
        responses: Vec<(Uuid, String)>,
    ) -> Result<Vec<Answer>> {
        if responses.is_empty() {
            return Err(Error::Validation("no answers supplied".to_string()));
        }
        let attempt = self.open_attempt(exam_id, student_id).await?;

        let question_ids: HashSet<Uuid> = self
            .store
            .list_questions(exam_id)
            .await?
            .into_iter()
            .map(|q| q.id)
            .collect();
        if let Some((unknown, _)) = responses.iter().find(|(id, _)| !question_ids.contains(id)) {
            return Err(Error::NotFound(format!(
                "question {} is not part of exam {}",
                unknown, exam_id
            )));
        }

        let answers: Vec<Answer> = responses
            .into_iter()
            .map(|(question_id, response)| Answer::new(attempt.id, question_id, response))
            .collect();
        self.store.insert_answers(attempt.id, &answers).await?;

        tracing::info!(
            attempt_id = %attempt.id,
            count = answers.len(),
            "answers recorded"
        );
        Ok(answers)
    }

    pub async fn complete_attempt(
        &self,
        exam_id: Uuid,
        student_id: Uuid,
        attempt_id: Uuid,
    ) -> Result<Attempt> {
        let attempt = self.store.get_attempt(attempt_id).await?;
        if attempt.exam_id != exam_id || attempt.student_id != student_id {
            return Err(Error::NotFound(format!("attempt {} not found", attempt_id)));
        }
        let completed = self.store.complete_attempt(attempt_id, Utc::now()).await?;
        tracing::info!(attempt_id = %attempt_id, exam_id = %exam_id, "attempt completed");
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::attempt::AttemptStatus;
    use crate::models::exam::Exam;
    use crate::models::question::{
        Difficulty, Question, QuestionPayload, QuestionType, TrueFalseDetails,
    };

    async fn seed(store: &MemoryStore, student_id: Uuid) -> (Exam, Vec<Question>) {
        let exam = Exam {
            id: Uuid::new_v4(),
            title: "Physics".into(),
            student_id,
            question_type: QuestionType::TrueFalse,
            difficulty: Difficulty::Easy,
            num_questions: 2,
            marks_per_question: 1,
            total_marks: 2,
            time_limit: None,
            language: None,
            created_at: Utc::now(),
        };
        let questions: Vec<Question> = (1..=2)
            .map(|pos| {
                Question::new(
                    exam.id,
                    pos,
                    format!("Statement {}", pos),
                    1,
                    QuestionPayload::TrueFalse(TrueFalseDetails {
                        correct_answer: true,
                        explanation: None,
                    }),
                )
            })
            .collect();
        store.create_exam(&exam, &questions).await.unwrap();
        (exam, questions)
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, _) = seed(&store, student).await;
        let svc = AttemptService::new(store.clone());

        let first = svc.start_attempt(exam.id, student).await.unwrap();
        let second = svc.start_attempt(exam.id, student).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.status(), AttemptStatus::InProgress);
        assert_eq!(store.attempt_count(exam.id), 1);
    }

    #[tokio::test]
    async fn concurrent_starts_yield_one_attempt() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, _) = seed(&store, student).await;
        let svc = AttemptService::new(store.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                let exam_id = exam.id;
                tokio::spawn(async move { svc.start_attempt(exam_id, student).await })
            })
            .collect();
        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap().id);
        }
        assert_eq!(ids.len(), 1);
        assert_eq!(store.attempt_count(exam.id), 1);
    }

    #[tokio::test]
    async fn second_answer_for_a_question_conflicts_and_keeps_the_first() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, questions) = seed(&store, student).await;
        let svc = AttemptService::new(store.clone());
        let attempt = svc.start_attempt(exam.id, student).await.unwrap();

        svc.submit_answer(exam.id, student, questions[0].id, "true".into())
            .await
            .unwrap();
        let err = svc
            .submit_answer(exam.id, student, questions[0].id, "false".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let answers = store.list_answers(attempt.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].response, "true");
    }

    #[tokio::test]
    async fn batch_with_a_duplicate_stores_nothing() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, questions) = seed(&store, student).await;
        let svc = AttemptService::new(store.clone());
        let attempt = svc.start_attempt(exam.id, student).await.unwrap();

        let err = svc
            .submit_answers(
                exam.id,
                student,
                vec![
                    (questions[0].id, "true".into()),
                    (questions[1].id, "false".into()),
                    (questions[0].id, "false".into()),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.answer_count(attempt.id), 0);
    }

    #[tokio::test]
    async fn answers_require_a_started_attempt_and_a_known_question() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, _) = seed(&store, student).await;
        let svc = AttemptService::new(store.clone());

        let err = svc
            .submit_answer(exam.id, student, Uuid::new_v4(), "true".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        svc.start_attempt(exam.id, student).await.unwrap();
        let err = svc
            .submit_answer(exam.id, student, Uuid::new_v4(), "true".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn completed_attempt_rejects_answers_and_second_completion() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, questions) = seed(&store, student).await;
        let svc = AttemptService::new(store.clone());
        let attempt = svc.start_attempt(exam.id, student).await.unwrap();

        let done = svc.complete_attempt(exam.id, student, attempt.id).await.unwrap();
        assert_eq!(done.status(), AttemptStatus::Completed);
        assert!(done.submitted_at.is_some());

        let err = svc
            .submit_answer(exam.id, student, questions[0].id, "true".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = svc
            .complete_attempt(exam.id, student, attempt.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_answers_to_one_question_keep_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, questions) = seed(&store, student).await;
        let svc = AttemptService::new(store.clone());
        let attempt = svc.start_attempt(exam.id, student).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let svc = svc.clone();
                let exam_id = exam.id;
                let question_id = questions[0].id;
                let response = if i % 2 == 0 { "true" } else { "false" };
                tokio::spawn(async move {
                    svc.submit_answer(exam_id, student, question_id, response.to_string())
                        .await
                })
            })
            .collect();

        let mut stored = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => stored += 1,
                Err(Error::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(stored, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(store.answer_count(attempt.id), 1);
    }

    #[tokio::test]
    async fn two_students_take_the_same_exam_independently() {
        let store = Arc::new(MemoryStore::new());
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();
        let (exam, questions) = seed(&store, creator).await;
        let svc = AttemptService::new(store.clone());

        let mine = svc.start_attempt(exam.id, creator).await.unwrap();
        let theirs = svc.start_attempt(exam.id, other).await.unwrap();
        assert_ne!(mine.id, theirs.id);
        assert_eq!(theirs.student_id, other);
        assert_eq!(store.attempt_count(exam.id), 2);

        svc.submit_answer(exam.id, creator, questions[0].id, "true".into())
            .await
            .unwrap();
        svc.submit_answer(exam.id, other, questions[0].id, "false".into())
            .await
            .unwrap();
        svc.complete_attempt(exam.id, other, theirs.id).await.unwrap();

        assert_eq!(store.answer_count(mine.id), 1);
        assert_eq!(store.answer_count(theirs.id), 1);
        assert!(!store.get_attempt(mine.id).await.unwrap().completed);
        assert!(matches!(
            svc.complete_attempt(exam.id, other, mine.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
