// SPDX-License-Identifier: MIT
//! Review pipeline orchestrator.
//!
//! Drives one full request: fetch the last commit's diff → send it for
//! review → normalize the answer. Shared by the `POST /review-diff` route
//! and the `revd review` CLI command. Runs are serialized through
//! [`AppContext::review_gate`] so rapid back-to-back commits cannot
//! interleave their git reads.

use crate::git::{self, GitError};
use crate::review::client::ReviewError;
use crate::review::model::ReviewResult;
use crate::review::normalize;
use crate::AppContext;

/// Terminal pipeline states.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    /// HEAD has no parent commit — a distinguished "nothing to review"
    /// success, not an error.
    NoDiff,
    Completed(ReviewResult),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Review(#[from] ReviewError),
}

/// Run the pipeline once for the context's workspace.
///
/// On completion the `review.completed` notification is broadcast exactly
/// once before returning. Failures are per-request — the caller converts
/// them to an HTTP payload (or an exit code) and the process keeps serving.
pub async fn run_review(ctx: &AppContext) -> Result<ReviewOutcome, PipelineError> {
    let _serialized = ctx.review_gate.lock().await;

    let Some(diff) = git::last_commit_diff(&ctx.workspace).await? else {
        return Ok(ReviewOutcome::NoDiff);
    };
    tracing::info!(diff_bytes = diff.len(), "reviewing last commit");

    let raw = ctx.reviewer.review(&diff).await?;

    // Parse failure degrades to a placeholder issue rather than failing the
    // request — the model answered, it just didn't answer in JSON.
    let review = normalize::parse_review(&raw).unwrap_or_else(|| {
        tracing::warn!(raw_len = raw.len(), "model response was not valid JSON");
        ReviewResult::parse_error()
    });

    ctx.broadcaster.broadcast(
        "review.completed",
        serde_json::json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "finished_at": chrono::Utc::now().to_rfc3339(),
            "issue_count": review.issues.len(),
            "review": &review,
        }),
    );

    tracing::info!(issues = review.issues.len(), "review completed");
    Ok(ReviewOutcome::Completed(review))
}
