use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use thiserror::Error;
use uuid::Uuid;

/// Stored in place of a missing `User-Agent` header.
pub const UNKNOWN_USER_AGENT: &str = "unknown";

const MAX_EXPECTED_CHARS: usize = 8;
const MAX_TIMESTAMP_TOKEN_LEN: usize = 40;

/// Practice category. Doubles as the storage partition for attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PracticeType {
    CapitalAlphabets,
    SmallAlphabets,
    Numbers,
}

impl PracticeType {
    pub const ALL: [PracticeType; 3] = [
        PracticeType::CapitalAlphabets,
        PracticeType::SmallAlphabets,
        PracticeType::Numbers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeType::CapitalAlphabets => "capital-alphabets",
            PracticeType::SmallAlphabets => "small-alphabets",
            PracticeType::Numbers => "numbers",
        }
    }
}

impl fmt::Display for PracticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One handwriting practice attempt as submitted by the browser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandwritingAttempt {
    pub output_alphabet: String,
    pub expected_alphabet: String,
    /// Kept as the client's JSON numbers so integers stay integers on disk.
    pub grayscale_matrix: Vec<Vec<Number>>,
    pub recognition_confidence: f64,
    pub timestamp: String,           // client clock, ISO-8601
    pub session_id: String,
    pub practice_type: PracticeType,
}

#[derive(Debug, Error, PartialEq)]
pub enum AttemptError {
    #[error("expectedAlphabet must not be empty")]
    EmptyExpected,

    #[error("grayscaleMatrix must have at least one non-empty row")]
    EmptyMatrix,

    #[error("grayscaleMatrix row {row} has {len} columns, expected {expected}")]
    RaggedMatrix { row: usize, len: usize, expected: usize },

    #[error("grayscaleMatrix has a non-finite value at row {row}, column {col}")]
    NonFiniteIntensity { row: usize, col: usize },

    #[error("recognitionConfidence must be a finite number")]
    NonFiniteConfidence,
}

impl HandwritingAttempt {
    /// Structural checks only. Intensity and confidence ranges are not bounded.
    pub fn validate(&self) -> Result<(), AttemptError> {
        if self.expected_alphabet.trim().is_empty() {
            return Err(AttemptError::EmptyExpected);
        }

        let width = match self.grayscale_matrix.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => return Err(AttemptError::EmptyMatrix),
        };
        for (r, row) in self.grayscale_matrix.iter().enumerate() {
            if row.len() != width {
                return Err(AttemptError::RaggedMatrix { row: r, len: row.len(), expected: width });
            }
            if let Some(c) = row.iter().position(|v| !v.as_f64().is_some_and(f64::is_finite)) {
                return Err(AttemptError::NonFiniteIntensity { row: r, col: c });
            }
        }

        if !self.recognition_confidence.is_finite() {
            return Err(AttemptError::NonFiniteConfidence);
        }
        Ok(())
    }

    /// Object name for this attempt, unique per `attempt_id`.
    ///
    /// `<category>_<expected>_<timestamp token>_<first 8 hex of id>.json`
    pub fn object_name(&self, attempt_id: Uuid) -> String {
        let id = attempt_id.simple().to_string();
        format!(
            "{}_{}_{}_{}.json",
            self.practice_type,
            expected_token(&self.expected_alphabet),
            timestamp_token(&self.timestamp),
            &id[..8],
        )
    }

    /// Full key: the practice category partition plus [`Self::object_name`].
    pub fn object_key(&self, attempt_id: Uuid) -> String {
        format!("{}/{}", self.practice_type, self.object_name(attempt_id))
    }
}

/// What actually lands in storage: the submission plus server-side context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAttempt {
    #[serde(flatten)]
    pub attempt: HandwritingAttempt,
    pub user_agent: String,
    pub saved_at: String,
    pub attempt_id: Uuid,
}

impl StoredAttempt {
    pub fn new(
        attempt: HandwritingAttempt,
        user_agent: Option<&str>,
        saved_at: DateTime<Utc>,
        attempt_id: Uuid,
    ) -> Self {
        let user_agent = user_agent
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .unwrap_or(UNKNOWN_USER_AGENT)
            .to_string();

        Self {
            attempt,
            user_agent,
            saved_at: saved_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            attempt_id,
        }
    }

    pub fn object_key(&self) -> String {
        self.attempt.object_key(self.attempt_id)
    }
}

fn expected_token(expected: &str) -> String {
    let mut out = String::new();
    for c in expected.trim().chars().take(MAX_EXPECTED_CHARS) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push_str(&format!("u{:x}", c as u32));
        }
    }
    out
}

/// ISO timestamps carry `:` and `.`, which some backends reject in keys.
fn timestamp_token(timestamp: &str) -> String {
    let token: String = timestamp
        .chars()
        .map(|c| if c == ':' || c == '.' { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_TIMESTAMP_TOKEN_LEN)
        .collect();

    if token.is_empty() {
        "notime".to_string()
    } else {
        token
    }
}
