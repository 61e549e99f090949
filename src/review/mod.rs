// SPDX-License-Identifier: MIT
//! AI review pipeline — diff in, normalized issue list out.
//!
//! Provides:
//! - Data models: [`Issue`], [`ReviewResult`]
//! - Prompt builder: one fixed template embedding the diff verbatim
//! - Groq client: single chat-completion call with a structured error taxonomy
//! - Normalizer: fence-tolerant parsing of the model's JSON answer
//! - Pipeline: diff fetch → review → normalize, shared by the HTTP endpoint
//!   and the `revd review` CLI command

pub mod client;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod prompt;

pub use client::{GroqClient, ReviewError};
pub use model::{Issue, ReviewResult};
pub use pipeline::{run_review, PipelineError, ReviewOutcome};
