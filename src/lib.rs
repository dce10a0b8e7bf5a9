pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::config::Config;
use crate::database::{postgres::PgStore, store::ExamStore};
use crate::error::{Error, Result};
use crate::services::{
    ai_service::{AIService, AnswerEvaluator, QuestionGenerator},
    exam_service::ExamService,
    generation_service::GenerationService,
    grading_service::GradingService,
    registry::QuestionRegistry,
    result_service::ResultService,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    pub registry: Arc<QuestionRegistry>,
    pub exam_service: ExamService,
    pub result_service: ResultService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;

        let ai_service = Arc::new(AIService::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            Duration::from_secs(config.llm_timeout_secs),
            http_client,
        ));

        Ok(Self::from_parts(
            Arc::new(PgStore::new(pool)),
            ai_service.clone(),
            ai_service,
            config.max_exam_questions,
        ))
    }

    /// Wires the services around any store and LLM collaborators.
    pub fn from_parts(
        store: Arc<dyn ExamStore>,
        generator: Arc<dyn QuestionGenerator>,
        evaluator: Arc<dyn AnswerEvaluator>,
        max_exam_questions: u32,
    ) -> Self {
        let registry = Arc::new(QuestionRegistry::standard());
        let generation = GenerationService::new(
            store.clone(),
            registry.clone(),
            generator,
            max_exam_questions,
        );
        let grading = GradingService::new(registry.clone(), evaluator);

        Self {
            exam_service: ExamService::new(store.clone(), generation),
            result_service: ResultService::new(store.clone(), grading),
            store,
            registry,
        }
    }
}
