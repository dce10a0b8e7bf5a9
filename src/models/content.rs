use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    FreeText,
    Topic,
    Pdf,
    Docx,
    Xlsx,
    Pptx,
    Image,
    YoutubeVideo,
    Article,
    Exam,
}

impl ContentKind {
    const ALL: [ContentKind; 10] = [
        ContentKind::FreeText,
        ContentKind::Topic,
        ContentKind::Pdf,
        ContentKind::Docx,
        ContentKind::Xlsx,
        ContentKind::Pptx,
        ContentKind::Image,
        ContentKind::YoutubeVideo,
        ContentKind::Article,
        ContentKind::Exam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::FreeText => "free_text",
            ContentKind::Topic => "topic",
            ContentKind::Pdf => "pdf",
            ContentKind::Docx => "docx",
            ContentKind::Xlsx => "xlsx",
            ContentKind::Pptx => "pptx",
            ContentKind::Image => "image",
            ContentKind::YoutubeVideo => "youtube_video",
            ContentKind::Article => "article",
            ContentKind::Exam => "exam",
        }
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown content kind '{}'", s)))
    }
}

/// Study material whose text has already been extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub kind: ContentKind,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
