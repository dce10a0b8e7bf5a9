use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillInTheBlank,
    ShortAnswer,
    Essay,
    CaseStudy,
    CodingProblem,
}

impl QuestionType {
    pub const ALL: [QuestionType; 7] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::FillInTheBlank,
        QuestionType::ShortAnswer,
        QuestionType::Essay,
        QuestionType::CaseStudy,
        QuestionType::CodingProblem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillInTheBlank => "fill_in_the_blank",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Essay => "essay",
            QuestionType::CaseStudy => "case_study",
            QuestionType::CodingProblem => "coding_problem",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnsupportedType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(Error::Validation(format!("unknown difficulty '{}'", other))),
        }
    }
}

/// Type-specific part of a question. The variant always agrees with the
/// owning question's `question_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionPayload {
    MultipleChoice(MultipleChoiceDetails),
    TrueFalse(TrueFalseDetails),
    FillInTheBlank(FillInTheBlankDetails),
    ShortAnswer(ShortAnswerDetails),
    Essay(EssayDetails),
    CaseStudy(CaseStudyDetails),
    CodingProblem(CodingProblemDetails),
}

impl QuestionPayload {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionPayload::MultipleChoice(_) => QuestionType::MultipleChoice,
            QuestionPayload::TrueFalse(_) => QuestionType::TrueFalse,
            QuestionPayload::FillInTheBlank(_) => QuestionType::FillInTheBlank,
            QuestionPayload::ShortAnswer(_) => QuestionType::ShortAnswer,
            QuestionPayload::Essay(_) => QuestionType::Essay,
            QuestionPayload::CaseStudy(_) => QuestionType::CaseStudy,
            QuestionPayload::CodingProblem(_) => QuestionType::CodingProblem,
        }
    }

    /// What a student may see while attempting the question: no answer keys,
    /// explanations or grader guidance.
    pub fn public_view(&self) -> JsonValue {
        match self {
            QuestionPayload::MultipleChoice(mc) => json!({
                "options": mc.options
                    .iter()
                    .enumerate()
                    .map(|(idx, text)| json!({ "key": format!("option{}", idx + 1), "text": text }))
                    .collect::<Vec<_>>(),
            }),
            QuestionPayload::CaseStudy(cs) => json!({ "case_description": cs.case_description }),
            QuestionPayload::CodingProblem(cp) => json!({
                "language": cp.language,
                "sample_input": cp.sample_input,
                "sample_output": cp.sample_output,
            }),
            QuestionPayload::TrueFalse(_)
            | QuestionPayload::FillInTheBlank(_)
            | QuestionPayload::ShortAnswer(_)
            | QuestionPayload::Essay(_) => json!({}),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceDetails {
    pub options: Vec<String>,
    /// One of `option1`..`option4`.
    pub correct_option: String,
    pub explanation: String,
}

impl MultipleChoiceDetails {
    pub fn correct_text(&self) -> Option<&str> {
        option_index(&self.correct_option)
            .and_then(|idx| self.options.get(idx))
            .map(String::as_str)
    }
}

/// Maps `option1`..`option4` (any case) to a zero-based index.
pub fn option_index(key: &str) -> Option<usize> {
    let lower = key.trim().to_ascii_lowercase();
    let n: usize = lower.strip_prefix("option")?.parse().ok()?;
    (1..=4).contains(&n).then(|| n - 1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueFalseDetails {
    pub correct_answer: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillInTheBlankDetails {
    pub correct_answer: String,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAnswerDetails {
    pub guidance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssayDetails {
    pub guidance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStudyDetails {
    pub case_description: String,
    pub expected_response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingProblemDetails {
    pub language: String,
    pub sample_input: String,
    pub sample_output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub position: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub statement: String,
    pub marks: i32,
    pub payload: QuestionPayload,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn new(
        exam_id: Uuid,
        position: i32,
        statement: String,
        marks: i32,
        payload: QuestionPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_id,
            position,
            question_type: payload.question_type(),
            statement,
            marks,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Rebuilds a stored question, refusing envelopes whose payload belongs
    /// to another type.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        exam_id: Uuid,
        position: i32,
        question_type: QuestionType,
        statement: String,
        marks: i32,
        payload: QuestionPayload,
        created_at: DateTime<Utc>,
    ) -> crate::error::Result<Self> {
        if payload.question_type() != question_type {
            return Err(Error::Internal(format!(
                "question {} is tagged {} but carries a {} payload",
                id,
                question_type,
                payload.question_type()
            )));
        }
        Ok(Self {
            id,
            exam_id,
            position,
            question_type,
            statement,
            marks,
            payload,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_tags_round_trip_and_reject_unknown() {
        for t in QuestionType::ALL {
            assert_eq!(t.as_str().parse::<QuestionType>().unwrap(), t);
        }
        let err = "matching".parse::<QuestionType>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(tag) if tag == "matching"));
    }

    #[test]
    fn from_parts_rejects_mismatched_payload() {
        let payload = QuestionPayload::Essay(EssayDetails { guidance: None });
        let err = Question::from_parts(
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            QuestionType::MultipleChoice,
            "Pick one".into(),
            2,
            payload,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn option_keys_map_to_indices() {
        assert_eq!(option_index("option1"), Some(0));
        assert_eq!(option_index(" Option4 "), Some(3));
        assert_eq!(option_index("option5"), None);
        assert_eq!(option_index("b"), None);
    }

    #[test]
    fn public_view_hides_answer_keys() {
        let payload = QuestionPayload::MultipleChoice(MultipleChoiceDetails {
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: "option2".into(),
            explanation: "b is right".into(),
        });
        let view = payload.public_view();
        assert_eq!(view["options"][1]["key"], "option2");
        assert!(view.get("correct_option").is_none());
        assert!(!view.to_string().contains("b is right"));
    }
}
