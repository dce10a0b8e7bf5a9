use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Letter grade attached to results and progress snapshots.
///
/// `Incomplete` is stored as "I" and counts as failing alongside `F`. Legacy
/// data may carry "FAIL", which reads back as `F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "F", alias = "FAIL")]
    F,
    #[serde(rename = "I")]
    Incomplete,
}

impl LetterGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::AMinus => "A-",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::BMinus => "B-",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::CMinus => "C-",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::DMinus => "D-",
            LetterGrade::F => "F",
            LetterGrade::Incomplete => "I",
        }
    }

    pub fn is_failing(&self) -> bool {
        matches!(self, LetterGrade::F | LetterGrade::Incomplete)
    }

    /// Position on the scale; higher is better. `Incomplete` ranks with `F`.
    pub fn rank(&self) -> u8 {
        match self {
            LetterGrade::APlus => 12,
            LetterGrade::A => 11,
            LetterGrade::AMinus => 10,
            LetterGrade::BPlus => 9,
            LetterGrade::B => 8,
            LetterGrade::BMinus => 7,
            LetterGrade::CPlus => 6,
            LetterGrade::C => 5,
            LetterGrade::CMinus => 4,
            LetterGrade::DPlus => 3,
            LetterGrade::D => 2,
            LetterGrade::DMinus => 1,
            LetterGrade::F | LetterGrade::Incomplete => 0,
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LetterGrade {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let grade = match s {
            "A+" => LetterGrade::APlus,
            "A" => LetterGrade::A,
            "A-" => LetterGrade::AMinus,
            "B+" => LetterGrade::BPlus,
            "B" => LetterGrade::B,
            "B-" => LetterGrade::BMinus,
            "C+" => LetterGrade::CPlus,
            "C" => LetterGrade::C,
            "C-" => LetterGrade::CMinus,
            "D+" => LetterGrade::DPlus,
            "D" => LetterGrade::D,
            "D-" => LetterGrade::DMinus,
            "F" | "FAIL" => LetterGrade::F,
            "I" => LetterGrade::Incomplete,
            other => return Err(format!("unknown letter grade '{}'", other)),
        };
        Ok(grade)
    }
}
