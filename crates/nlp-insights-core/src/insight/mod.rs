//! Insight provenance model.
//!
//! An insight records how a derived coding or resource was obtained: where in the
//! source text it came from (or which element of the same resource was analyzed),
//! the model confidences, and where the full NLP output can be found.

pub mod constants;
mod extension;

pub use extension::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Insight construction errors.
#[derive(Error, Debug, PartialEq)]
pub enum InsightError {
    #[error("Invalid span: begin {begin} is after end {end}")]
    InvalidSpan { begin: u32, end: u32 },
}

pub type InsightResult<T> = Result<T, InsightError>;

/// A region of analyzed text. Offsets are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    begin: u32,
    end: u32,
    covered_text: String,
}

impl TextSpan {
    pub fn new(begin: u32, end: u32, covered_text: impl Into<String>) -> InsightResult<Self> {
        if begin > end {
            return Err(InsightError::InvalidSpan { begin, end });
        }
        Ok(Self {
            begin,
            end,
            covered_text: covered_text.into(),
        })
    }

    pub fn begin(&self) -> u32 {
        self.begin
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Text as reported by the NLP service. Not checked against the source.
    pub fn covered_text(&self) -> &str {
        &self.covered_text
    }
}

/// A named model confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub name: String,
    pub score: f64,
}

impl Confidence {
    pub fn new(name: &str, score: f64) -> Self {
        Self {
            name: name.to_string(),
            score,
        }
    }
}

/// Sequential insight ids (`insight-1`, `insight-2`, ...).
///
/// One maker is scoped to one resource within one call; ids are never reused. The
/// maker is exhausted once the counter would pass `u32::MAX`.
#[derive(Debug, Clone)]
pub struct InsightIdMaker {
    next: Option<u32>,
}

impl InsightIdMaker {
    pub fn new(start: u32) -> Self {
        Self { next: Some(start) }
    }

    /// The next id, or `None` when the counter is exhausted.
    pub fn next_id(&mut self) -> Option<String> {
        let current = self.next?;
        self.next = current.checked_add(1);
        Some(format!("insight-{}", current))
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

impl Default for InsightIdMaker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Iterator for InsightIdMaker {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_rejects_inverted_offsets() {
        assert_eq!(
            TextSpan::new(10, 4, "x"),
            Err(InsightError::InvalidSpan { begin: 10, end: 4 })
        );
        let span = TextSpan::new(4, 4, "").unwrap();
        assert_eq!(span.begin(), span.end());
    }

    #[test]
    fn test_id_maker_sequence() {
        let mut ids = InsightIdMaker::default();
        assert_eq!(ids.next_id().as_deref(), Some("insight-1"));
        assert_eq!(ids.next_id().as_deref(), Some("insight-2"));

        let ids: Vec<String> = InsightIdMaker::new(5).take(3).collect();
        assert_eq!(ids, ["insight-5", "insight-6", "insight-7"]);
    }

    #[test]
    fn test_id_maker_stops_at_max_start() {
        let mut ids = InsightIdMaker::new(u32::MAX);
        assert!(!ids.is_exhausted());
        assert_eq!(ids.next_id().as_deref(), Some("insight-4294967295"));
        assert!(ids.is_exhausted());
        assert_eq!(ids.next_id(), None);

        let all: Vec<String> = InsightIdMaker::new(u32::MAX - 1).collect();
        assert_eq!(all, ["insight-4294967294", "insight-4294967295"]);
    }
}
