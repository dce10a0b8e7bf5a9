use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::question::{
    option_index, CaseStudyDetails, CodingProblemDetails, EssayDetails, FillInTheBlankDetails,
    MultipleChoiceDetails, QuestionPayload, QuestionType, ShortAnswerDetails, TrueFalseDetails,
};
use crate::services::ai_service::JudgeContext;

/// One validated generator item, ready to become a `Question`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedItem {
    pub statement: String,
    pub payload: QuestionPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub correct: bool,
    pub feedback: String,
}

pub type ParseFn = fn(&JsonValue, Option<&str>) -> std::result::Result<GeneratedItem, String>;
pub type CheckFn = fn(&QuestionPayload, &str) -> std::result::Result<Verdict, String>;
pub type ContextFn = fn(&QuestionPayload) -> std::result::Result<JudgeContext, String>;

#[derive(Clone, Copy)]
pub enum GradingStrategy {
    /// Exact comparison against the stored key.
    Deterministic(CheckFn),
    /// Scored by the external evaluator with the context this builds.
    Judged(ContextFn),
}

#[derive(Clone)]
pub struct QuestionKind {
    pub question_type: QuestionType,
    pub instructions: &'static str,
    pub parse: ParseFn,
    pub grading: GradingStrategy,
}

/// Dispatch table from question type to its generation schema, item parser
/// and grading strategy. Built once at startup.
pub struct QuestionRegistry {
    kinds: HashMap<QuestionType, QuestionKind>,
}

impl QuestionRegistry {
    pub fn standard() -> Self {
        let kinds = [
            QuestionKind {
                question_type: QuestionType::MultipleChoice,
                instructions: MULTIPLE_CHOICE_SCHEMA,
                parse: parse_multiple_choice,
                grading: GradingStrategy::Deterministic(check_multiple_choice),
            },
            QuestionKind {
                question_type: QuestionType::TrueFalse,
                instructions: TRUE_FALSE_SCHEMA,
                parse: parse_true_false,
                grading: GradingStrategy::Deterministic(check_true_false),
            },
            QuestionKind {
                question_type: QuestionType::FillInTheBlank,
                instructions: FILL_IN_THE_BLANK_SCHEMA,
                parse: parse_fill_in_the_blank,
                grading: GradingStrategy::Deterministic(check_fill_in_the_blank),
            },
            QuestionKind {
                question_type: QuestionType::ShortAnswer,
                instructions: SHORT_ANSWER_SCHEMA,
                parse: parse_short_answer,
                grading: GradingStrategy::Judged(guidance_context),
            },
            QuestionKind {
                question_type: QuestionType::Essay,
                instructions: ESSAY_SCHEMA,
                parse: parse_essay,
                grading: GradingStrategy::Judged(guidance_context),
            },
            QuestionKind {
                question_type: QuestionType::CaseStudy,
                instructions: CASE_STUDY_SCHEMA,
                parse: parse_case_study,
                grading: GradingStrategy::Judged(case_study_context),
            },
            QuestionKind {
                question_type: QuestionType::CodingProblem,
                instructions: CODING_PROBLEM_SCHEMA,
                parse: parse_coding_problem,
                grading: GradingStrategy::Judged(coding_context),
            },
        ];

        Self {
            kinds: kinds.into_iter().map(|k| (k.question_type, k)).collect(),
        }
    }

    pub fn kind(&self, question_type: QuestionType) -> Result<&QuestionKind> {
        self.kinds
            .get(&question_type)
            .ok_or_else(|| Error::UnsupportedType(question_type.as_str().to_string()))
    }

    /// Resolves a wire tag such as `essay`.
    pub fn resolve(&self, tag: &str) -> Result<&QuestionKind> {
        self.kind(tag.parse()?)
    }

    pub fn supported(&self) -> Vec<QuestionType> {
        QuestionType::ALL
            .into_iter()
            .filter(|t| self.kinds.contains_key(t))
            .collect()
    }
}

const MULTIPLE_CHOICE_SCHEMA: &str = r#"{"question": "...", "option1": "...", "option2": "...", "option3": "...", "option4": "...", "correct_option": "option1|option2|option3|option4", "explanation": "why the correct option is right"}"#;
const TRUE_FALSE_SCHEMA: &str =
    r#"{"question": "a statement to judge", "correct_answer": true, "explanation": "..."}"#;
const FILL_IN_THE_BLANK_SCHEMA: &str = r#"{"question": "sentence with ____ marking the blank", "correct_answer": "the missing text", "explanation": "..."}"#;
const SHORT_ANSWER_SCHEMA: &str =
    r#"{"question": "...", "guidance": "what a good short answer covers"}"#;
const ESSAY_SCHEMA: &str =
    r#"{"question": "...", "guidance": "points a strong essay should address"}"#;
const CASE_STUDY_SCHEMA: &str = r#"{"case_description": "the scenario", "question": "what the student must analyse", "expected_response": "the key points of a model answer"}"#;
const CODING_PROBLEM_SCHEMA: &str = r#"{"question": "the task", "sample_input": "...", "sample_output": "..."}"#;

fn required_str(item: &JsonValue, field: &str) -> std::result::Result<String, String> {
    match item.get(field) {
        Some(JsonValue::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(JsonValue::String(_)) => Err(format!("field '{}' is empty", field)),
        Some(_) => Err(format!("field '{}' must be a string", field)),
        None => Err(format!("missing field '{}'", field)),
    }
}

fn optional_str(item: &JsonValue, field: &str) -> std::result::Result<Option<String>, String> {
    match item.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(format!("field '{}' must be a string", field)),
    }
}

fn ensure_object(item: &JsonValue) -> std::result::Result<(), String> {
    if item.is_object() {
        Ok(())
    } else {
        Err("item is not a JSON object".to_string())
    }
}

fn parse_multiple_choice(
    item: &JsonValue,
    _language: Option<&str>,
) -> std::result::Result<GeneratedItem, String> {
    ensure_object(item)?;
    let statement = required_str(item, "question")?;
    let options = (1..=4)
        .map(|n| required_str(item, &format!("option{}", n)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let key = required_str(item, "correct_option")?;
    let idx = option_index(&key)
        .ok_or_else(|| format!("correct_option '{}' is not one of option1..option4", key))?;
    let explanation = required_str(item, "explanation")?;

    Ok(GeneratedItem {
        statement,
        payload: QuestionPayload::MultipleChoice(MultipleChoiceDetails {
            options,
            correct_option: format!("option{}", idx + 1),
            explanation,
        }),
    })
}

fn parse_true_false(
    item: &JsonValue,
    _language: Option<&str>,
) -> std::result::Result<GeneratedItem, String> {
    ensure_object(item)?;
    let statement = required_str(item, "question")?;
    let correct_answer = match item.get("correct_answer") {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) if s.trim().eq_ignore_ascii_case("true") => true,
        Some(JsonValue::String(s)) if s.trim().eq_ignore_ascii_case("false") => false,
        Some(_) => return Err("field 'correct_answer' must be a boolean".to_string()),
        None => return Err("missing field 'correct_answer'".to_string()),
    };
    Ok(GeneratedItem {
        statement,
        payload: QuestionPayload::TrueFalse(TrueFalseDetails {
            correct_answer,
            explanation: optional_str(item, "explanation")?,
        }),
    })
}

fn parse_fill_in_the_blank(
    item: &JsonValue,
    _language: Option<&str>,
) -> std::result::Result<GeneratedItem, String> {
    ensure_object(item)?;
    Ok(GeneratedItem {
        statement: required_str(item, "question")?,
        payload: QuestionPayload::FillInTheBlank(FillInTheBlankDetails {
            correct_answer: required_str(item, "correct_answer")?,
            explanation: optional_str(item, "explanation")?,
        }),
    })
}

fn parse_short_answer(
    item: &JsonValue,
    _language: Option<&str>,
) -> std::result::Result<GeneratedItem, String> {
    ensure_object(item)?;
    Ok(GeneratedItem {
        statement: required_str(item, "question")?,
        payload: QuestionPayload::ShortAnswer(ShortAnswerDetails {
            guidance: optional_str(item, "guidance")?,
        }),
    })
}

fn parse_essay(
    item: &JsonValue,
    _language: Option<&str>,
) -> std::result::Result<GeneratedItem, String> {
    ensure_object(item)?;
    Ok(GeneratedItem {
        statement: required_str(item, "question")?,
        payload: QuestionPayload::Essay(EssayDetails {
            guidance: optional_str(item, "guidance")?,
        }),
    })
}

fn parse_case_study(
    item: &JsonValue,
    _language: Option<&str>,
) -> std::result::Result<GeneratedItem, String> {
    ensure_object(item)?;
    Ok(GeneratedItem {
        statement: required_str(item, "question")?,
        payload: QuestionPayload::CaseStudy(CaseStudyDetails {
            case_description: required_str(item, "case_description")?,
            expected_response: required_str(item, "expected_response")?,
        }),
    })
}

fn parse_coding_problem(
    item: &JsonValue,
    language: Option<&str>,
) -> std::result::Result<GeneratedItem, String> {
    ensure_object(item)?;
    let language = language
        .map(str::to_string)
        .or(optional_str(item, "language")?)
        .ok_or_else(|| "no target language for coding problem".to_string())?;
    Ok(GeneratedItem {
        statement: required_str(item, "question")?,
        payload: QuestionPayload::CodingProblem(CodingProblemDetails {
            language,
            sample_input: required_str(item, "sample_input")?,
            sample_output: required_str(item, "sample_output")?,
        }),
    })
}

fn payload_mismatch(expected: QuestionType, payload: &QuestionPayload) -> String {
    format!(
        "expected a {} payload, found {}",
        expected,
        payload.question_type()
    )
}

fn check_multiple_choice(
    payload: &QuestionPayload,
    response: &str,
) -> std::result::Result<Verdict, String> {
    let QuestionPayload::MultipleChoice(mc) = payload else {
        return Err(payload_mismatch(QuestionType::MultipleChoice, payload));
    };
    let response = response.trim();
    let by_key = response.eq_ignore_ascii_case(&mc.correct_option);
    let by_text = mc.correct_text().is_some_and(|text| text == response);
    Ok(Verdict {
        correct: by_key || by_text,
        feedback: mc.explanation.clone(),
    })
}

fn check_true_false(
    payload: &QuestionPayload,
    response: &str,
) -> std::result::Result<Verdict, String> {
    let QuestionPayload::TrueFalse(tf) = payload else {
        return Err(payload_mismatch(QuestionType::TrueFalse, payload));
    };
    let expected = if tf.correct_answer { "true" } else { "false" };
    Ok(Verdict {
        correct: response.trim().eq_ignore_ascii_case(expected),
        feedback: tf.explanation.clone().unwrap_or_default(),
    })
}

fn check_fill_in_the_blank(
    payload: &QuestionPayload,
    response: &str,
) -> std::result::Result<Verdict, String> {
    let QuestionPayload::FillInTheBlank(fb) = payload else {
        return Err(payload_mismatch(QuestionType::FillInTheBlank, payload));
    };
    Ok(Verdict {
        correct: response.trim() == fb.correct_answer.trim(),
        feedback: fb.explanation.clone().unwrap_or_default(),
    })
}

fn guidance_context(payload: &QuestionPayload) -> std::result::Result<JudgeContext, String> {
    match payload {
        QuestionPayload::ShortAnswer(ShortAnswerDetails { guidance })
        | QuestionPayload::Essay(EssayDetails { guidance }) => Ok(JudgeContext {
            guidance: guidance.clone(),
            ..Default::default()
        }),
        other => Err(payload_mismatch(QuestionType::Essay, other)),
    }
}

fn case_study_context(payload: &QuestionPayload) -> std::result::Result<JudgeContext, String> {
    let QuestionPayload::CaseStudy(cs) = payload else {
        return Err(payload_mismatch(QuestionType::CaseStudy, payload));
    };
    Ok(JudgeContext {
        case_description: Some(cs.case_description.clone()),
        expected_response: Some(cs.expected_response.clone()),
        ..Default::default()
    })
}

fn coding_context(payload: &QuestionPayload) -> std::result::Result<JudgeContext, String> {
    let QuestionPayload::CodingProblem(cp) = payload else {
        return Err(payload_mismatch(QuestionType::CodingProblem, payload));
    };
    Ok(JudgeContext {
        sample_input: Some(cp.sample_input.clone()),
        sample_output: Some(cp.sample_output.clone()),
        language: Some(cp.language.clone()),
        ..Default::default()
    })
}
