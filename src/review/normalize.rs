// SPDX-License-Identifier: MIT
//! Normalizes loose model output into a strict [`ReviewResult`].
//!
//! Models frequently wrap their JSON answer in a markdown code fence, with
//! or without a language tag. The normalizer strips one such fence pair,
//! then parses. Parse failure is non-fatal — the caller decides what a
//! missing result means.

use crate::review::model::ReviewResult;

/// Parse the raw completion text into a [`ReviewResult`].
///
/// Returns `None` when the text is not valid JSON even after fence
/// stripping. Never panics, never propagates an error.
pub fn parse_review(raw: &str) -> Option<ReviewResult> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(cleaned).ok()
}

/// Strip one leading/trailing ``` fence pair, tolerating a language tag
/// after the opening fence and whitespace on either side.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop an optional language tag ("json", "JSON", ...) up to the first
    // line break. A fence with no newline at all is left as-is minus markers.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    body.trim().strip_suffix("```").unwrap_or(body).trim()
}
