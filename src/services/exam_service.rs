use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::ExamStore;
use crate::error::{Error, Result};
use crate::models::content::{Content, ContentKind};
use crate::models::exam::{Exam, ExamSpecification, SourceExcerpt};
use crate::models::question::{Difficulty, Question, QuestionType};
use crate::services::generation_service::GenerationService;

pub struct NewExam {
    pub content_ids: Vec<Uuid>,
    pub title: Option<String>,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub num_questions: u32,
    pub marks_per_question: i32,
    pub time_limit: Option<i32>,
    pub language: Option<String>,
    pub profile_summary: Option<String>,
}

/// A question as shown to the student taking the exam.
#[derive(Debug, Clone, Serialize)]
pub struct StudentQuestion {
    pub id: Uuid,
    pub position: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub statement: String,
    pub marks: i32,
    pub details: JsonValue,
}

impl From<&Question> for StudentQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            position: q.position,
            question_type: q.question_type,
            statement: q.statement.clone(),
            marks: q.marks,
            details: q.payload.public_view(),
        }
    }
}

pub fn default_title(at: DateTime<Utc>) -> String {
    at.format("Exam on %Y-%m-%d at %H:%M:%S").to_string()
}

#[derive(Clone)]
pub struct ExamService {
    store: Arc<dyn ExamStore>,
    generation: GenerationService,
}

impl ExamService {
    pub fn new(store: Arc<dyn ExamStore>, generation: GenerationService) -> Self {
        Self { store, generation }
    }

    pub async fn create_content(
        &self,
        student_id: Uuid,
        title: String,
        kind: ContentKind,
        body: String,
    ) -> Result<Content> {
        let content = Content {
            id: Uuid::new_v4(),
            student_id,
            title,
            kind,
            body,
            created_at: Utc::now(),
        };
        self.store.create_content(&content).await?;
        tracing::info!(content_id = %content.id, student_id = %student_id, kind = kind.as_str(), "content stored");
        Ok(content)
    }

    pub async fn get_content(&self, student_id: Uuid, content_id: Uuid) -> Result<Content> {
        let content = self.store.get_content(content_id).await?;
        if content.student_id != student_id {
            return Err(Error::NotFound(format!("content {} not found", content_id)));
        }
        Ok(content)
    }

    pub async fn create_exam(
        &self,
        student_id: Uuid,
        request: NewExam,
    ) -> Result<(Exam, Vec<Question>)> {
        let contents = self
            .store
            .contents_by_ids(student_id, &request.content_ids)
            .await?;
        if let Some(missing) = request
            .content_ids
            .iter()
            .find(|id| !contents.iter().any(|c| c.id == **id))
        {
            return Err(Error::NotFound(format!("content {} not found", missing)));
        }

        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default_title(Utc::now()));

        let spec = ExamSpecification {
            title,
            question_type: request.question_type,
            difficulty: request.difficulty,
            count: request.num_questions,
            source_material: contents
                .into_iter()
                .map(|c| SourceExcerpt {
                    title: c.title,
                    kind: c.kind,
                    body: c.body,
                })
                .collect(),
            profile_summary: request.profile_summary.unwrap_or_default(),
            marks_per_question: request.marks_per_question,
            time_limit: request.time_limit,
            language: request.language,
        };

        self.generation.generate_exam(student_id, spec).await
    }

    pub async fn list_exams(&self, student_id: Uuid) -> Result<Vec<Exam>> {
        self.store.list_exams(student_id).await
    }

    pub async fn get_exam(&self, student_id: Uuid, exam_id: Uuid) -> Result<Exam> {
        let exam = self.store.get_exam(exam_id).await?;
        if exam.student_id != student_id {
            return Err(Error::NotFound(format!("exam {} not found", exam_id)));
        }
        Ok(exam)
    }

    /// Exam with answer keys, for its owner.
    pub async fn full_exam(&self, student_id: Uuid, exam_id: Uuid) -> Result<(Exam, Vec<Question>)> {
        let exam = self.get_exam(student_id, exam_id).await?;
        let questions = self.store.list_questions(exam_id).await?;
        Ok((exam, questions))
    }

    /// The exam as any student taking it sees it, answer keys stripped.
    pub async fn student_questions(&self, exam_id: Uuid) -> Result<(Exam, Vec<StudentQuestion>)> {
        let exam = self.store.get_exam(exam_id).await?;
        let questions = self.store.list_questions(exam_id).await?;
        Ok((exam, questions.iter().map(StudentQuestion::from).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::services::ai_service::MockQuestionGenerator;
    use crate::services::registry::QuestionRegistry;
    use chrono::TimeZone;
    use serde_json::json;

    fn service(store: Arc<MemoryStore>, generator: MockQuestionGenerator) -> ExamService {
        let generation = GenerationService::new(
            store.clone(),
            Arc::new(QuestionRegistry::standard()),
            Arc::new(generator),
            20,
        );
        ExamService::new(store, generation)
    }

    fn new_exam(content_ids: Vec<Uuid>) -> NewExam {
        NewExam {
            content_ids,
            title: None,
            question_type: QuestionType::MultipleChoice,
            difficulty: Difficulty::Easy,
            num_questions: 1,
            marks_per_question: 3,
            time_limit: None,
            language: None,
            profile_summary: None,
        }
    }

    #[test]
    fn default_title_uses_creation_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(default_title(at), "Exam on 2026-03-04 at 05:06:07");
    }

    #[tokio::test]
    async fn exam_is_built_from_owned_content_in_request_order() {
        let store = Arc::new(MemoryStore::new());
        let mut generator = MockQuestionGenerator::new();
        generator
            .expect_generate()
            .withf(|req| {
                req.source_material.len() == 2
                    && req.source_material[0].title == "Second"
                    && req.source_material[1].title == "First"
            })
            .returning(|_| {
                Ok(json!({"questions": [{
                    "question": "2 + 2?",
                    "option1": "3", "option2": "4", "option3": "5", "option4": "22",
                    "correct_option": "option2",
                    "explanation": "Basic arithmetic"
                }]}))
            });
        let svc = service(store, generator);
        let student = Uuid::new_v4();

        let first = svc
            .create_content(student, "First".into(), ContentKind::FreeText, "a".into())
            .await
            .unwrap();
        let second = svc
            .create_content(student, "Second".into(), ContentKind::Topic, "b".into())
            .await
            .unwrap();

        let (exam, questions) = svc
            .create_exam(student, new_exam(vec![second.id, first.id]))
            .await
            .unwrap();
        assert!(exam.title.starts_with("Exam on "));
        assert_eq!(exam.total_marks, 3);

        let (_, view) = svc.student_questions(exam.id).await.unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, questions[0].id);
        let rendered = serde_json::to_string(&view[0]).unwrap();
        assert!(!rendered.contains("correct_option"));
        assert!(!rendered.contains("Basic arithmetic"));
    }

    #[tokio::test]
    async fn foreign_content_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let mut generator = MockQuestionGenerator::new();
        generator.expect_generate().never();
        let svc = service(store, generator);

        let owner = Uuid::new_v4();
        let content = svc
            .create_content(owner, "Notes".into(), ContentKind::Article, "text".into())
            .await
            .unwrap();

        let err = svc
            .create_exam(Uuid::new_v4(), new_exam(vec![content.id]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(
            svc.get_content(Uuid::new_v4(), content.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn any_student_sees_questions_but_only_the_owner_sees_keys() {
        let store = Arc::new(MemoryStore::new());
        let mut generator = MockQuestionGenerator::new();
        generator.expect_generate().returning(|_| {
            Ok(json!([{
                "question": "Capital of France?",
                "option1": "Lyon", "option2": "Nice", "option3": "Paris", "option4": "Lille",
                "correct_option": "option3",
                "explanation": "Paris is the capital"
            }]))
        });
        let svc = service(store, generator);
        let owner = Uuid::new_v4();
        let content = svc
            .create_content(owner, "Geography".into(), ContentKind::Topic, "France".into())
            .await
            .unwrap();
        let (exam, _) = svc
            .create_exam(owner, new_exam(vec![content.id]))
            .await
            .unwrap();

        let (seen, view) = svc.student_questions(exam.id).await.unwrap();
        assert_eq!(seen.id, exam.id);
        assert_eq!(view.len(), 1);

        let other = Uuid::new_v4();
        assert!(matches!(
            svc.full_exam(other, exam.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            svc.get_exam(other, exam.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            svc.student_questions(Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn no_content_is_a_validation_error() {
        let store = Arc::new(MemoryStore::new());
        let mut generator = MockQuestionGenerator::new();
        generator.expect_generate().never();
        let svc = service(store, generator);

        let err = svc
            .create_exam(Uuid::new_v4(), new_exam(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
