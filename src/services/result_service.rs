use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::ExamStore;
use crate::error::{Error, Result};
use crate::models::progress::ProgressRecord;
use crate::models::result::{ExamResult, GradedQuestionResult};
use crate::services::grading_service::GradingService;
use crate::services::progress_service::record_progress;

#[derive(Debug, Clone, Serialize)]
pub struct GradedAttempt {
    pub result: ExamResult,
    pub questions: Vec<GradedQuestionResult>,
    pub progress: ProgressRecord,
}

#[derive(Clone)]
pub struct ResultService {
    store: Arc<dyn ExamStore>,
    grading: GradingService,
}

impl ResultService {
    pub fn new(store: Arc<dyn ExamStore>, grading: GradingService) -> Self {
        Self { store, grading }
    }

    /// Grades a completed attempt, stores its result and appends a progress
    /// snapshot. Only one result may exist per attempt.
    pub async fn create_result(&self, student_id: Uuid, attempt_id: Uuid) -> Result<GradedAttempt> {
        let attempt = self.store.get_attempt(attempt_id).await?;
        if attempt.student_id != student_id {
            return Err(Error::NotFound(format!("attempt {} not found", attempt_id)));
        }
        if !attempt.completed {
            return Err(Error::Conflict(format!(
                "attempt {} must be completed before it can be graded",
                attempt_id
            )));
        }
        // record_result rejects duplicates too; this avoids evaluator calls.
        if self.store.find_result_for_attempt(attempt.id).await?.is_some() {
            return Err(Error::Conflict(format!(
                "a result already exists for attempt {}",
                attempt.id
            )));
        }

        let exam = self.store.get_exam(attempt.exam_id).await?;
        let questions = self.store.list_questions(exam.id).await?;
        let answers: HashMap<Uuid, String> = self
            .store
            .list_answers(attempt.id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a.response))
            .collect();

        let graded = self.grading.grade_attempt(&questions, &answers).await?;

        let result = ExamResult {
            id: Uuid::new_v4(),
            attempt_id: attempt.id,
            student_id,
            exam_title: exam.title.clone(),
            total_marks: graded.total_marks,
            obtained_marks: graded.obtained_marks,
            percentage: graded.percentage,
            grade: graded.grade,
            feedback: graded.feedback.clone(),
            created_at: Utc::now(),
        };

        let progress = self
            .store
            .record_result(&result, &|prior: Option<&ProgressRecord>, history: &[ExamResult]| {
                record_progress(student_id, &result, prior, history)
            })
            .await?;

        tracing::info!(
            attempt_id = %attempt.id,
            exam_id = %exam.id,
            student_id = %student_id,
            percentage = result.percentage,
            grade = %result.grade,
            "attempt graded"
        );

        Ok(GradedAttempt {
            result,
            questions: graded.questions,
            progress,
        })
    }

    pub async fn get_result(&self, student_id: Uuid, result_id: Uuid) -> Result<ExamResult> {
        let result = self.store.get_result(result_id).await?;
        if result.student_id != student_id {
            return Err(Error::NotFound(format!("result {} not found", result_id)));
        }
        Ok(result)
    }

    pub async fn list_results(&self, student_id: Uuid) -> Result<Vec<ExamResult>> {
        self.store.list_results(student_id).await
    }

    pub async fn latest_result(&self, student_id: Uuid) -> Result<ExamResult> {
        self.store
            .list_results(student_id)
            .await?
            .pop()
            .ok_or_else(|| Error::NotFound("no results recorded yet".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::models::exam::Exam;
    use crate::models::grade::LetterGrade;
    use crate::models::question::{
        Difficulty, Question, QuestionPayload, QuestionType, ShortAnswerDetails,
    };
    use crate::services::ai_service::{Evaluation, MockAnswerEvaluator};
    use crate::services::attempt_service::AttemptService;
    use crate::services::registry::QuestionRegistry;

    async fn seed_short_answer_exam(store: &MemoryStore, student_id: Uuid, n: i32) -> (Exam, Vec<Question>) {
        let exam = Exam {
            id: Uuid::new_v4(),
            title: "History".into(),
            student_id,
            question_type: QuestionType::ShortAnswer,
            difficulty: Difficulty::Medium,
            num_questions: n,
            marks_per_question: 5,
            total_marks: 5 * n,
            time_limit: None,
            language: None,
            created_at: Utc::now(),
        };
        let questions: Vec<Question> = (1..=n)
            .map(|pos| {
                Question::new(
                    exam.id,
                    pos,
                    format!("Question {}", pos),
                    5,
                    QuestionPayload::ShortAnswer(ShortAnswerDetails { guidance: None }),
                )
            })
            .collect();
        store.create_exam(&exam, &questions).await.unwrap();
        (exam, questions)
    }

    fn services(store: Arc<MemoryStore>, evaluator: MockAnswerEvaluator) -> (AttemptService, ResultService) {
        let grading = GradingService::new(Arc::new(QuestionRegistry::standard()), Arc::new(evaluator));
        (
            AttemptService::new(store.clone()),
            ResultService::new(store, grading),
        )
    }

    #[tokio::test]
    async fn grading_requires_a_completed_attempt() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, _) = seed_short_answer_exam(&store, student, 1).await;
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator.expect_evaluate().never();
        let (attempts, results) = services(store, evaluator);

        let attempt = attempts.start_attempt(exam.id, student).await.unwrap();
        let err = results.create_result(student, attempt.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn result_and_progress_are_recorded_once() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, questions) = seed_short_answer_exam(&store, student, 2).await;
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator
            .expect_evaluate()
            .returning(|_| Ok(Evaluation { marks: 4, feedback: "Close".into() }));
        let (attempts, results) = services(store.clone(), evaluator);

        let attempt = attempts.start_attempt(exam.id, student).await.unwrap();
        attempts
            .submit_answer(exam.id, student, questions[0].id, "an answer".into())
            .await
            .unwrap();
        attempts
            .complete_attempt(exam.id, student, attempt.id)
            .await
            .unwrap();

        let graded = results.create_result(student, attempt.id).await.unwrap();
        assert_eq!(graded.result.total_marks, 10);
        assert_eq!(graded.result.obtained_marks, 4);
        assert_eq!(graded.result.percentage, 40.0);
        assert_eq!(graded.result.grade, LetterGrade::D);
        assert_eq!(graded.questions[1].response, "Unattempted");
        assert_eq!(graded.progress.total_exams_taken, 1);
        assert_eq!(graded.progress.total_points, 4);
        assert_eq!(
            results.latest_result(student).await.unwrap().id,
            graded.result.id
        );

        let err = results.create_result(student, attempt.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.list_progress(student).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn regrading_is_rejected_before_any_evaluator_call() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, questions) = seed_short_answer_exam(&store, student, 1).await;
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator
            .expect_evaluate()
            .times(1)
            .returning(|_| Ok(Evaluation { marks: 5, feedback: "Good".into() }));
        let (attempts, results) = services(store.clone(), evaluator);

        let attempt = attempts.start_attempt(exam.id, student).await.unwrap();
        attempts
            .submit_answer(exam.id, student, questions[0].id, "an answer".into())
            .await
            .unwrap();
        attempts
            .complete_attempt(exam.id, student, attempt.id)
            .await
            .unwrap();
        results.create_result(student, attempt.id).await.unwrap();

        let err = results.create_result(student, attempt.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.list_results(student).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn results_are_private_to_their_student() {
        let store = Arc::new(MemoryStore::new());
        let student = Uuid::new_v4();
        let (exam, _) = seed_short_answer_exam(&store, student, 1).await;
        let evaluator = MockAnswerEvaluator::new();
        let (attempts, results) = services(store, evaluator);

        let attempt = attempts.start_attempt(exam.id, student).await.unwrap();
        attempts
            .complete_attempt(exam.id, student, attempt.id)
            .await
            .unwrap();
        let graded = results.create_result(student, attempt.id).await.unwrap();

        let stranger = Uuid::new_v4();
        assert!(matches!(
            results.get_result(stranger, graded.result.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            results.create_result(stranger, attempt.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            results.latest_result(stranger).await,
            Err(Error::NotFound(_))
        ));
    }
}
