use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::grade::LetterGrade;
use crate::models::question::Question;
use crate::models::result::GradedQuestionResult;
use crate::services::ai_service::{AnswerEvaluator, EvaluationRequest};
use crate::services::grade_scale::grade_for;
use crate::services::registry::{GradingStrategy, QuestionRegistry};

pub const UNATTEMPTED: &str = "Unattempted";
const UNATTEMPTED_FEEDBACK: &str = "Question was not attempted.";

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptGrade {
    pub questions: Vec<GradedQuestionResult>,
    pub total_marks: i32,
    pub obtained_marks: i32,
    pub percentage: f64,
    pub grade: LetterGrade,
    /// Non-empty per-question feedback joined with " | ".
    pub feedback: Option<String>,
}

#[derive(Clone)]
pub struct GradingService {
    registry: Arc<QuestionRegistry>,
    evaluator: Arc<dyn AnswerEvaluator>,
}

impl GradingService {
    pub fn new(registry: Arc<QuestionRegistry>, evaluator: Arc<dyn AnswerEvaluator>) -> Self {
        Self {
            registry,
            evaluator,
        }
    }

    /// Grades every question in order. A failed evaluator call zeroes that
    /// question only.
    pub async fn grade_attempt(
        &self,
        questions: &[Question],
        answers: &HashMap<Uuid, String>,
    ) -> Result<AttemptGrade> {
        let mut graded = Vec::with_capacity(questions.len());

        for question in questions {
            let result = match answers.get(&question.id) {
                Some(response) => self.grade_question(question, response).await?,
                None => GradedQuestionResult {
                    question_id: question.id,
                    question_type: question.question_type,
                    statement: question.statement.clone(),
                    response: UNATTEMPTED.to_string(),
                    marks_possible: question.marks,
                    marks_obtained: 0,
                    feedback: UNATTEMPTED_FEEDBACK.to_string(),
                },
            };
            graded.push(result);
        }

        Ok(aggregate(graded))
    }

    async fn grade_question(&self, question: &Question, response: &str) -> Result<GradedQuestionResult> {
        // Registry and payload errors mean stored data is corrupt and abort the
        // whole call; only evaluator failures are scored per question.
        let kind = self.registry.kind(question.question_type)?;

        let (marks_obtained, feedback) = match kind.grading {
            GradingStrategy::Deterministic(check) => {
                let verdict = check(&question.payload, response).map_err(Error::Internal)?;
                let marks = if verdict.correct { question.marks } else { 0 };
                (marks, verdict.feedback)
            }
            GradingStrategy::Judged(context) => {
                let context = context(&question.payload).map_err(Error::Internal)?;
                let request = EvaluationRequest {
                    question_type: question.question_type,
                    statement: question.statement.clone(),
                    response: response.to_string(),
                    max_marks: question.marks,
                    context,
                };
                match self.judge(&request).await {
                    Ok(scored) => scored,
                    Err(err) => {
                        tracing::warn!(
                            question_id = %question.id,
                            question_type = %question.question_type,
                            error = %err,
                            "judged grading failed; scoring question as zero"
                        );
                        (0, format!("grading failed: {}", err))
                    }
                }
            }
        };

        Ok(GradedQuestionResult {
            question_id: question.id,
            question_type: question.question_type,
            statement: question.statement.clone(),
            response: response.to_string(),
            marks_possible: question.marks,
            marks_obtained,
            feedback,
        })
    }

    async fn judge(&self, request: &EvaluationRequest) -> Result<(i32, String)> {
        let evaluation = self.evaluator.evaluate(request).await?;
        if evaluation.marks < 0 || evaluation.marks > i64::from(request.max_marks) {
            return Err(Error::Grading(format!(
                "evaluator awarded {} marks, outside 0..={}",
                evaluation.marks, request.max_marks
            )));
        }
        Ok((evaluation.marks as i32, evaluation.feedback))
    }
}

fn aggregate(questions: Vec<GradedQuestionResult>) -> AttemptGrade {
    let total_marks: i32 = questions.iter().map(|q| q.marks_possible).sum();
    let obtained_marks: i32 = questions.iter().map(|q| q.marks_obtained).sum();
    let percentage = if total_marks > 0 {
        f64::from(obtained_marks) / f64::from(total_marks) * 100.0
    } else {
        0.0
    };

    let joined = questions
        .iter()
        .map(|q| q.feedback.trim())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

    AttemptGrade {
        total_marks,
        obtained_marks,
        percentage,
        grade: grade_for(percentage),
        feedback: (!joined.is_empty()).then_some(joined),
        questions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{
        EssayDetails, QuestionPayload, QuestionType, ShortAnswerDetails, TrueFalseDetails,
    };
    use crate::services::ai_service::{Evaluation, MockAnswerEvaluator};

    fn question(marks: i32, payload: QuestionPayload, statement: &str) -> Question {
        Question::new(Uuid::new_v4(), 1, statement.to_string(), marks, payload)
    }

    fn true_false(correct: bool) -> QuestionPayload {
        QuestionPayload::TrueFalse(TrueFalseDetails {
            correct_answer: correct,
            explanation: Some(format!("It is {}", correct)),
        })
    }

    fn service(evaluator: MockAnswerEvaluator) -> GradingService {
        GradingService::new(Arc::new(QuestionRegistry::standard()), Arc::new(evaluator))
    }

    #[tokio::test]
    async fn deterministic_grading_and_aggregation() {
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator.expect_evaluate().never();

        let q1 = question(5, true_false(true), "Sky is blue");
        let q2 = question(5, true_false(false), "Fire is cold");
        let answers = HashMap::from([
            (q1.id, "true".to_string()),
            (q2.id, "true".to_string()),
        ]);

        let grade = service(evaluator)
            .grade_attempt(&[q1, q2], &answers)
            .await
            .unwrap();
        assert_eq!(grade.total_marks, 10);
        assert_eq!(grade.obtained_marks, 5);
        assert_eq!(grade.percentage, 50.0);
        assert_eq!(grade.grade, LetterGrade::CMinus);
        assert_eq!(grade.feedback.as_deref(), Some("It is true | It is false"));
    }

    #[tokio::test]
    async fn unattempted_questions_score_zero_without_evaluator() {
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator.expect_evaluate().never();

        let q = question(4, QuestionPayload::Essay(EssayDetails { guidance: None }), "Discuss");
        let grade = service(evaluator)
            .grade_attempt(std::slice::from_ref(&q), &HashMap::new())
            .await
            .unwrap();

        let result = &grade.questions[0];
        assert_eq!(result.response, UNATTEMPTED);
        assert_eq!(result.marks_obtained, 0);
        assert_eq!(result.marks_possible, 4);
        assert!(!result.feedback.is_empty());
        assert_eq!(grade.grade, LetterGrade::F);
    }

    #[tokio::test]
    async fn one_failed_judgement_does_not_abort_the_rest() {
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator
            .expect_evaluate()
            .withf(|req| req.statement == "Explain osmosis")
            .returning(|_| Err(Error::Service("timeout".into())));
        evaluator
            .expect_evaluate()
            .withf(|req| req.statement == "Define diffusion")
            .returning(|_| Ok(Evaluation { marks: 3, feedback: "Good".into() }));

        let short = |s: &str| {
            question(
                4,
                QuestionPayload::ShortAnswer(ShortAnswerDetails { guidance: None }),
                s,
            )
        };
        let q1 = short("Explain osmosis");
        let q2 = short("Define diffusion");
        let q3 = question(2, true_false(true), "Cells divide");
        let answers = HashMap::from([
            (q1.id, "water moves".to_string()),
            (q2.id, "particles spread".to_string()),
            (q3.id, "TRUE".to_string()),
        ]);

        let grade = service(evaluator)
            .grade_attempt(&[q1, q2, q3], &answers)
            .await
            .unwrap();

        assert_eq!(grade.questions.len(), 3);
        assert_eq!(grade.questions[0].marks_obtained, 0);
        assert!(grade.questions[0].feedback.starts_with("grading failed: "));
        assert_eq!(grade.questions[1].marks_obtained, 3);
        assert_eq!(grade.questions[2].marks_obtained, 2);
        assert_eq!(grade.obtained_marks, 5);
        assert_eq!(grade.total_marks, 10);
    }

    #[tokio::test]
    async fn out_of_range_marks_are_rejected_per_question() {
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator
            .expect_evaluate()
            .returning(|_| Ok(Evaluation { marks: 7, feedback: "Excellent".into() }));

        let q = question(
            5,
            QuestionPayload::Essay(EssayDetails {
                guidance: Some("two causes".into()),
            }),
            "Why did Rome fall?",
        );
        let answers = HashMap::from([(q.id, "many reasons".to_string())]);
        let grade = service(evaluator).grade_attempt(&[q], &answers).await.unwrap();

        assert_eq!(grade.obtained_marks, 0);
        assert!(grade.questions[0].feedback.contains("outside 0..=5"));
    }

    #[tokio::test]
    async fn evaluator_receives_type_context_and_max_marks() {
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator
            .expect_evaluate()
            .withf(|req| {
                req.max_marks == 6
                    && req.response == "my essay"
                    && req.context.guidance.as_deref() == Some("cite sources")
            })
            .times(1)
            .returning(|_| Ok(Evaluation { marks: 6, feedback: String::new() }));

        let q = question(
            6,
            QuestionPayload::Essay(EssayDetails {
                guidance: Some("cite sources".into()),
            }),
            "Essay",
        );
        let answers = HashMap::from([(q.id, "my essay".to_string())]);
        let grade = service(evaluator).grade_attempt(&[q], &answers).await.unwrap();
        assert_eq!(grade.percentage, 100.0);
        assert_eq!(grade.grade, LetterGrade::APlus);
        assert_eq!(grade.feedback, None);
    }

    #[tokio::test]
    async fn corrupt_question_aborts_grading() {
        let mut evaluator = MockAnswerEvaluator::new();
        evaluator.expect_evaluate().never();

        let mut corrupt = question(
            5,
            QuestionPayload::Essay(EssayDetails { guidance: None }),
            "Discuss",
        );
        corrupt.question_type = QuestionType::TrueFalse;
        let fine = question(5, true_false(true), "Sky is blue");
        let answers = HashMap::from([
            (corrupt.id, "true".to_string()),
            (fine.id, "true".to_string()),
        ]);

        let err = service(evaluator)
            .grade_attempt(&[fine, corrupt], &answers)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn no_questions_means_zero_percent() {
        let evaluator = MockAnswerEvaluator::new();
        let grade = service(evaluator)
            .grade_attempt(&[], &HashMap::new())
            .await
            .unwrap();
        assert_eq!(grade.total_marks, 0);
        assert_eq!(grade.percentage, 0.0);
        assert_eq!(grade.grade, LetterGrade::F);
    }
}
