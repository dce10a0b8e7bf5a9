use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::exam::SourceExcerpt;
use crate::models::question::{Difficulty, QuestionType};

/// Input for one generation call. `instructions` is the item schema the
/// registry expects back for `question_type`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub question_type: QuestionType,
    pub count: u32,
    pub difficulty: Difficulty,
    pub source_material: Vec<SourceExcerpt>,
    pub profile_summary: String,
    pub language: Option<String>,
    #[serde(skip)]
    pub instructions: &'static str,
}

/// Type-specific context handed to the evaluator alongside the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JudgeContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRequest {
    pub question_type: QuestionType,
    pub statement: String,
    pub response: String,
    pub max_marks: i32,
    pub context: JudgeContext,
}

/// Raw evaluator verdict. Range checking against the question's maximum is
/// the grader's job.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub marks: i64,
    pub feedback: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Returns the generator's structured output, either `{"questions": [...]}`
    /// or a bare array of items.
    async fn generate(&self, request: &GenerationRequest) -> Result<JsonValue>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation>;
}

#[derive(Clone)]
pub struct AIService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl AIService {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
        }
    }

    async fn chat_openai(&self, system_prompt: String, user_content: JsonValue) -> Result<JsonValue> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content.to_string()}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7
        });

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Service(format!("request to LLM failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Service(format!("OpenAI API error {}: {}", status, text)));
        }

        let body: JsonValue = res
            .json()
            .await
            .map_err(|e| Error::Service(format!("unreadable LLM response: {}", e)))?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| Error::Service("invalid OpenAI response format".to_string()))
    }
}

fn generation_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "You are an experienced examiner. Write exactly {count} {difficulty} {kind} questions \
         grounded only in the study material supplied by the user, tailored to the student \
         profile when one is given.\n\
         Return a JSON object with a single field 'questions' holding an array of {count} items.\n\
         Each item must have this shape:\n{schema}",
        count = request.count,
        difficulty = request.difficulty.as_str(),
        kind = request.question_type.as_str().replace('_', " "),
        schema = request.instructions,
    );
    if let Some(language) = &request.language {
        prompt.push_str(&format!(
            "\nAll code, sample input and sample output must target {}.",
            language
        ));
    }
    prompt
}

fn evaluation_prompt(request: &EvaluationRequest) -> String {
    format!(
        "You are grading one {kind} exam answer. Award an integer number of marks between 0 \
         and {max} inclusive, judged against the question and any context provided. \
         Return a JSON object: {{ \"marks\": <integer>, \"feedback\": \"<short explanation \
         addressed to the student>\" }}.",
        kind = request.question_type.as_str().replace('_', " "),
        max = request.max_marks,
    )
}

/// Pulls `{marks, feedback}` out of the evaluator's JSON.
pub fn parse_evaluation(raw: &JsonValue) -> Result<Evaluation> {
    let marks = raw
        .get("marks")
        .and_then(|m| m.as_i64())
        .ok_or_else(|| Error::Grading("evaluator response lacks integer 'marks'".to_string()))?;
    let feedback = raw
        .get("feedback")
        .and_then(|f| f.as_str())
        .ok_or_else(|| Error::Grading("evaluator response lacks string 'feedback'".to_string()))?;
    Ok(Evaluation {
        marks,
        feedback: feedback.trim().to_string(),
    })
}

#[async_trait]
impl QuestionGenerator for AIService {
    async fn generate(&self, request: &GenerationRequest) -> Result<JsonValue> {
        tracing::info!(
            question_type = %request.question_type,
            count = request.count,
            model = %self.model,
            "requesting question generation"
        );
        let user_content = json!({
            "difficulty": request.difficulty,
            "required_count": request.count,
            "student_profile": request.profile_summary,
            "language": request.language,
            "material": request.source_material,
        });
        self.chat_openai(generation_prompt(request), user_content).await
    }
}

#[async_trait]
impl AnswerEvaluator for AIService {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation> {
        let user_content = json!({
            "question": request.statement,
            "student_response": request.response,
            "max_marks": request.max_marks,
            "context": request.context,
        });
        let raw = self.chat_openai(evaluation_prompt(request), user_content).await?;
        parse_evaluation(&raw)
    }
}
