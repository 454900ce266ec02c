//! Wire shapes shared by every remote operation of the deck service.
//!
//! All three operations take the same [`GenerationRequest`] body; responses are
//! [`Outline`], [`Deck`] and [`ExportResult`]. Field names follow the service's
//! snake_case JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MIN_SLIDES: u8 = 3;
pub const MAX_SLIDES: u8 = 20;
pub const DEFAULT_SLIDES: u8 = 5;

pub mod endpoints {
    pub const PROPOSE_OUTLINE: &str = "/propose-outline";
    pub const GENERATE_DECK: &str = "/generate-deck";
    pub const EXPORT_PPTX: &str = "/export-pptx";
    pub const HEALTH: &str = "/health";
}

/// Caller-side rejections. These never reach the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Topic must not be empty")]
    EmptyTopic,

    #[error("Audience must not be empty")]
    EmptyAudience,

    #[error("Slide count {count} is outside 3..=20")]
    SlideCountOutOfRange { count: i64 },

    #[error("Unknown tone: {0}")]
    UnknownTone(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Academic,
    Persuasive,
    Informative,
    Inspirational,
}

impl Tone {
    pub const ALL: [Tone; 6] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Academic,
        Tone::Persuasive,
        Tone::Informative,
        Tone::Inspirational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Academic => "academic",
            Tone::Persuasive => "persuasive",
            Tone::Informative => "informative",
            Tone::Inspirational => "inspirational",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Casual => "Casual",
            Tone::Academic => "Academic",
            Tone::Persuasive => "Persuasive",
            Tone::Informative => "Informative",
            Tone::Inspirational => "Inspirational",
        }
    }

    /// Next tone in catalogue order, wrapping around.
    pub fn next(self) -> Tone {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Tone {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownTone(s.to_string()))
    }
}

/// Body of all three operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub audience: String,
    pub tone: Tone,
    pub slide_count: u8,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            topic: String::new(),
            audience: String::new(),
            tone: Tone::default(),
            slide_count: DEFAULT_SLIDES,
        }
    }
}

impl GenerationRequest {
    pub fn new(
        topic: impl Into<String>,
        audience: impl Into<String>,
        tone: Tone,
        slide_count: u8,
    ) -> Self {
        Self {
            topic: topic.into(),
            audience: audience.into(),
            tone,
            slide_count,
        }
    }

    /// Checks the request before it may be sent. Whitespace-only text counts as empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if self.audience.trim().is_empty() {
            return Err(ValidationError::EmptyAudience);
        }
        check_slide_count(i64::from(self.slide_count))?;
        Ok(())
    }
}

/// Range check used by front-ends before a count is stored in a request.
pub fn check_slide_count(count: i64) -> Result<u8, ValidationError> {
    if (i64::from(MIN_SLIDES)..=i64::from(MAX_SLIDES)).contains(&count) {
        u8::try_from(count).map_err(|_| ValidationError::SlideCountOutOfRange { count })
    } else {
        Err(ValidationError::SlideCountOutOfRange { count })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSlide {
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
}

impl OutlineSlide {
    pub fn citations(&self) -> &[String] {
        self.citations.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub slides: Vec<OutlineSlide>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSlide {
    pub bullets: Vec<String>,
    pub notes: String,
    pub image_prompt: String,
}

/// Full deck. `slides[i]` belongs to `outline.slides[i]`; there is no explicit key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub outline: Outline,
    pub slides: Vec<DeckSlide>,
}

impl Deck {
    pub fn is_aligned(&self) -> bool {
        self.slides.len() == self.outline.slides.len()
    }

    /// Outline entries paired with their content, in deck order.
    pub fn pages(&self) -> impl Iterator<Item = (&OutlineSlide, &DeckSlide)> {
        self.outline.slides.iter().zip(self.slides.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
    /// Server-relative path, e.g. `/downloads/Climate_Change.pptx`.
    pub download_url: String,
    pub filename: String,
}

/// Absolute address of an exported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub url: String,
    pub filename: String,
}

/// Optional body of a non-success response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// User-facing text: `message`, then `detail`, then `error`.
    pub fn user_message(&self) -> Option<String> {
        let non_empty = |s: &String| !s.trim().is_empty();
        if let Some(message) = self.message.as_ref().filter(|m| non_empty(m)) {
            return Some(message.clone());
        }
        match &self.detail {
            Some(serde_json::Value::String(detail)) if non_empty(detail) => {
                return Some(detail.clone());
            }
            Some(serde_json::Value::Null) | None => {}
            Some(serde_json::Value::String(_)) => {}
            Some(other) => return Some(other.to_string()),
        }
        self.error.as_ref().filter(|e| non_empty(e)).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub downloads_dir: Option<String>,
    #[serde(default)]
    pub downloads_exists: Option<bool>,
    #[serde(default)]
    pub pptx_files: Vec<String>,
    #[serde(default)]
    pub file_count: Option<u64>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
