use crate::review::{self, ReviewOutcome};
use crate::AppContext;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

/// `POST /review-diff` — run the full pipeline for the last commit.
///
/// The body is ignored; port and workspace come from configuration. The
/// pipeline runs in a spawned task so the fire-and-forget hook hanging up
/// early cannot cancel a review in flight — the completion event still
/// reaches SSE subscribers.
pub async fn review_diff(State(ctx): State<Arc<AppContext>>) -> (StatusCode, Json<Value>) {
    let pipeline_ctx = (*ctx).clone();
    let outcome = match tokio::spawn(async move { review::run_review(&pipeline_ctx).await }).await {
        Ok(outcome) => outcome,
        Err(join_err) => {
            error!("review task panicked: {join_err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "internal review failure" })),
            );
        }
    };

    match outcome {
        Ok(ReviewOutcome::Completed(review)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "review": review })),
        ),
        // Deliberately a 200: an unreviewable first commit is a terminal
        // success state, not a server failure.
        Ok(ReviewOutcome::NoDiff) => (
            StatusCode::OK,
            Json(json!({ "success": false, "message": "No diff found" })),
        ),
        Err(e) => {
            error!("review error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

/// `GET /health` — liveness probe for the hook and the IDE extension.
pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let uptime = ctx.started_at.elapsed().as_secs();
    Json(json!({
        "status": "ok",
        "uptime_secs": uptime,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
