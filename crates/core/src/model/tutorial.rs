use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::ids::TutorialId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TutorialError {
    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("unknown media type: {0}")]
    UnknownMediaType(String),
}

//
// ─── DIFFICULTY / MEDIA ────────────────────────────────────────────────────────
//

/// Difficulty tier shown on every tutorial card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Pemula,
    Menengah,
    Mahir,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Pemula, Difficulty::Menengah, Difficulty::Mahir];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Pemula => "Pemula",
            Difficulty::Menengah => "Menengah",
            Difficulty::Mahir => "Mahir",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = TutorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| TutorialError::UnknownDifficulty(needle.to_owned()))
    }
}

/// How a tutorial is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MediaType {
    #[default]
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "artikel", alias = "article")]
    Article,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Video => f.write_str("video"),
            MediaType::Article => f.write_str("artikel"),
        }
    }
}

impl FromStr for MediaType {
    type Err = TutorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(MediaType::Video),
            "artikel" | "article" => Ok(MediaType::Article),
            other => Err(TutorialError::UnknownMediaType(other.to_owned())),
        }
    }
}

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// One unit of instructional content, identified by its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 1-based position. Zero means "not sent", fixed up by [`Tutorial::normalized`].
    #[serde(default, alias = "stepNumber", alias = "order")]
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub details: Vec<String>,
    /// Safety note / practical tip shown under the step.
    #[serde(default)]
    pub tips: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

//
// ─── TUTORIAL ──────────────────────────────────────────────────────────────────
//

/// A structured lesson composed of an ordered sequence of steps.
///
/// The list endpoint returns summaries, which decode into the same type with
/// an empty `steps` vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    #[serde(alias = "_id")]
    pub id: TutorialId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "de_duration")]
    pub duration: String,
    #[serde(default, rename = "type")]
    pub media_type: MediaType,
    #[serde(default, alias = "image", alias = "thumbnail")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, deserialize_with = "de_created_at")]
    pub created_at: Option<DateTime<Utc>>,
}

pub type TutorialSummary = Tutorial;

impl Tutorial {
    /// Number of steps in the tutorial.
    #[must_use]
    pub fn total_steps(&self) -> u32 {
        u32::try_from(self.steps.len()).unwrap_or(u32::MAX)
    }

    /// Duration in minutes, taken from the first integer in the duration text.
    ///
    /// `"15 menit"` yields 15; text without digits yields 0.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        parse_leading_number(&self.duration)
    }

    /// Step at the given 1-based position.
    #[must_use]
    pub fn step(&self, number: u32) -> Option<&Step> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.steps.get(index)
    }

    /// Orders steps and assigns 1-based numbers.
    ///
    /// If every step carries a number the steps are sorted by it; otherwise
    /// the payload order is kept. Numbers are then rewritten to 1..=N so that
    /// position and number always agree.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.steps.iter().all(|s| s.number > 0) {
            self.steps.sort_by_key(|s| s.number);
        }
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.number = u32::try_from(index + 1).unwrap_or(u32::MAX);
        }
        self
    }
}

fn parse_leading_number(text: &str) -> u32 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

fn de_duration<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Text(String),
        Minutes(u32),
    }

    Ok(match Option::<RawDuration>::deserialize(deserializer)? {
        Some(RawDuration::Text(text)) => text,
        Some(RawDuration::Minutes(minutes)) => format!("{minutes} menit"),
        None => String::new(),
    })
}

fn de_created_at<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(serde::de::Error::custom)?;
    Ok(date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()))
}
