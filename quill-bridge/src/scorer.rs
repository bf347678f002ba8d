//! Validation Scorer
//!
//! Judges a transfer by reading the Form domain back and comparing it with what
//! was written. Update paths differ (field-level vs whole-record), so exact
//! equality is too brittle; the score tolerates formatting drift while still
//! penalizing truncation, empty results and completion-flag mismatch.
//!
//! # Scoring Algorithm (0-100)
//! - **Content** (up to 70):
//!   - Expected empty: 70 if actual is empty, else 0
//!   - Otherwise: `clamp(actual_len / expected_len, 0, 1) * 50` (rounded)
//!     plus 20 if actual contains the first `min(prefix_check_len, expected_len)`
//!     characters of expected
//! - **Completion flag** (30): expected and actual flags equal
//!
//! Lengths are measured in characters.

use crate::domains::FormSnapshot;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// Points for a fully matching length ratio
pub const LENGTH_RATIO_POINTS: f64 = 50.0;
/// Points for the prefix containment check
pub const PREFIX_POINTS: u8 = 20;
/// Content points when both expected and actual are empty
pub const EMPTY_MATCH_POINTS: u8 = 70;
/// Points for matching completion flags
pub const COMPLETION_POINTS: u8 = 30;
/// Maximum score
pub const MAX_SCORE: u8 = 100;

/// Per-component breakdown of a validation score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub length_points: u8,
    pub prefix_points: u8,
    pub completion_points: u8,
    pub total: u8,
}

/// Validation Scorer
#[derive(Debug, Clone)]
pub struct ValidationScorer {
    /// Leading characters of expected content checked for containment
    prefix_check_len: usize,
}

impl Default for ValidationScorer {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ValidationScorer {
    pub fn new(prefix_check_len: usize) -> Self {
        Self { prefix_check_len }
    }

    /// Score an actual snapshot against the expected content and flag
    pub fn score(&self, expected_content: &str, expected_completed: bool, actual: &FormSnapshot) -> u8 {
        let breakdown = self.breakdown(expected_content, expected_completed, actual);

        let report = json!({
            "validator": "ValidationScorer",
            "total": breakdown.total,
            "components": breakdown,
            "expected_chars": expected_content.chars().count(),
            "actual_chars": actual.content.chars().count(),
            "prefix_check_len": self.prefix_check_len,
        });
        debug!(score = breakdown.total, report = %report, "Transfer validation scored");

        breakdown.total
    }

    /// Full component breakdown
    pub fn breakdown(
        &self,
        expected_content: &str,
        expected_completed: bool,
        actual: &FormSnapshot,
    ) -> ScoreBreakdown {
        let (length_points, prefix_points) = self.content_components(expected_content, &actual.content);
        let completion_points = if expected_completed == actual.is_completed {
            COMPLETION_POINTS
        } else {
            0
        };

        let total = (u16::from(length_points) + u16::from(prefix_points) + u16::from(completion_points))
            .min(u16::from(MAX_SCORE)) as u8;

        ScoreBreakdown {
            length_points,
            prefix_points,
            completion_points,
            total,
        }
    }

    /// Content component alone (0-70)
    pub fn content_score(&self, expected: &str, actual: &str) -> u8 {
        let (length_points, prefix_points) = self.content_components(expected, actual);
        length_points + prefix_points
    }

    fn content_components(&self, expected: &str, actual: &str) -> (u8, u8) {
        let expected_len = expected.chars().count();
        let actual_len = actual.chars().count();

        if expected_len == 0 {
            let points = if actual_len == 0 { EMPTY_MATCH_POINTS } else { 0 };
            return (points, 0);
        }

        let ratio = (actual_len as f64 / expected_len as f64).clamp(0.0, 1.0);
        let length_points = (ratio * LENGTH_RATIO_POINTS).round() as u8;

        let prefix_end = expected
            .char_indices()
            .nth(self.prefix_check_len.min(expected_len))
            .map_or(expected.len(), |(idx, _)| idx);
        let prefix = &expected[..prefix_end];
        let prefix_points = if actual.contains(prefix) { PREFIX_POINTS } else { 0 };

        (length_points, prefix_points)
    }
}
