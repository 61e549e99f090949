// SPDX-License-Identifier: MIT
//! Data models for review results.
//!
//! All types are `Serialize`/`Deserialize` so they travel both directions:
//! parsed out of the model's answer and sent back over HTTP/SSE. Every issue
//! field is defaulted — the model frequently omits some, and a missing field
//! renders as placeholder text downstream, not as a parse failure.

use serde::{Deserialize, Serialize};

/// One problem the model found in the diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    /// Why this is a problem.
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub suggested_fix: String,
    /// Which lines of the diff are affected, as free text.
    #[serde(default)]
    pub lines: String,
}

/// The normalized review for one commit. Request-scoped — never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl ReviewResult {
    /// Degraded result used when the model's answer was not valid JSON.
    /// The review still "succeeds" — the parse failure itself is surfaced
    /// as the single issue.
    pub fn parse_error() -> Self {
        Self {
            issues: vec![Issue {
                title: "Parse Error".to_string(),
                explanation: "Failed to parse AI response".to_string(),
                reason: "Invalid JSON".to_string(),
                suggested_fix: "Check API response".to_string(),
                lines: String::new(),
            }],
        }
    }
}
