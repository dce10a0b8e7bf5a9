use chrono::Utc;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::ExamStore;
use crate::error::{Error, Result};
use crate::models::exam::{Exam, ExamSpecification};
use crate::models::question::{Question, QuestionType};
use crate::services::ai_service::{GenerationRequest, QuestionGenerator};
use crate::services::registry::{GeneratedItem, QuestionRegistry};

/// Turns an exam specification into a persisted exam and question set.
#[derive(Clone)]
pub struct GenerationService {
    store: Arc<dyn ExamStore>,
    registry: Arc<QuestionRegistry>,
    generator: Arc<dyn QuestionGenerator>,
    max_questions: u32,
}

impl GenerationService {
    pub fn new(
        store: Arc<dyn ExamStore>,
        registry: Arc<QuestionRegistry>,
        generator: Arc<dyn QuestionGenerator>,
        max_questions: u32,
    ) -> Self {
        Self {
            store,
            registry,
            generator,
            max_questions,
        }
    }

    pub async fn generate_exam(
        &self,
        student_id: Uuid,
        spec: ExamSpecification,
    ) -> Result<(Exam, Vec<Question>)> {
        self.validate(&spec)?;
        let kind = self.registry.kind(spec.question_type)?;

        let request = GenerationRequest {
            question_type: spec.question_type,
            count: spec.count,
            difficulty: spec.difficulty,
            source_material: spec.source_material.clone(),
            profile_summary: spec.profile_summary.clone(),
            language: spec.language.clone(),
            instructions: kind.instructions,
        };

        let raw = self.generator.generate(&request).await.map_err(|e| {
            tracing::error!(question_type = %spec.question_type, error = %e, "question generator failed");
            e
        })?;

        let items = extract_items(&raw, spec.question_type)?;
        if items.len() != spec.count as usize {
            return Err(generation_error(
                spec.question_type,
                format!("expected {} items, generator returned {}", spec.count, items.len()),
            ));
        }

        let parsed = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                (kind.parse)(item, spec.language.as_deref())
                    .map_err(|reason| {
                        generation_error(spec.question_type, format!("item {}: {}", idx + 1, reason))
                    })
            })
            .collect::<Result<Vec<GeneratedItem>>>()?;

        let count = spec.count as i32;
        let exam = Exam {
            id: Uuid::new_v4(),
            title: spec.title,
            student_id,
            question_type: spec.question_type,
            difficulty: spec.difficulty,
            num_questions: count,
            marks_per_question: spec.marks_per_question,
            total_marks: count * spec.marks_per_question,
            time_limit: spec.time_limit,
            language: spec.language,
            created_at: Utc::now(),
        };

        let questions: Vec<Question> = parsed
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                Question::new(
                    exam.id,
                    idx as i32 + 1,
                    item.statement,
                    spec.marks_per_question,
                    item.payload,
                )
            })
            .collect();

        self.store.create_exam(&exam, &questions).await?;
        tracing::info!(
            exam_id = %exam.id,
            student_id = %student_id,
            question_type = %exam.question_type,
            count = questions.len(),
            "exam generated"
        );
        Ok((exam, questions))
    }

    fn validate(&self, spec: &ExamSpecification) -> Result<()> {
        if spec.source_material.is_empty() {
            return Err(Error::Validation(
                "at least one piece of source material is required".to_string(),
            ));
        }
        if spec.count == 0 || spec.count > self.max_questions {
            return Err(Error::Validation(format!(
                "question count must be between 1 and {}",
                self.max_questions
            )));
        }
        if spec.marks_per_question < 1 {
            return Err(Error::Validation(
                "marks per question must be at least 1".to_string(),
            ));
        }
        let count = i32::try_from(spec.count)
            .map_err(|_| Error::Validation("question count is too large".to_string()))?;
        if count.checked_mul(spec.marks_per_question).is_none() {
            return Err(Error::Validation("total marks overflow".to_string()));
        }
        if spec.question_type == QuestionType::CodingProblem
            && spec.language.as_deref().map_or(true, |l| l.trim().is_empty())
        {
            return Err(Error::Validation(
                "coding problems need a target programming language".to_string(),
            ));
        }
        Ok(())
    }
}

fn generation_error(question_type: QuestionType, reason: String) -> Error {
    tracing::error!(question_type = %question_type, reason = %reason, "generator output rejected");
    Error::Generation {
        question_type,
        reason,
    }
}

fn extract_items(raw: &JsonValue, question_type: QuestionType) -> Result<&Vec<JsonValue>> {
    raw.get("questions")
        .and_then(|q| q.as_array())
        .or_else(|| raw.as_array())
        .ok_or_else(|| {
            generation_error(
                question_type,
                "output is neither a 'questions' array nor a bare array".to_string(),
            )
        })
}
