pub mod config;
pub mod events;
pub mod git;
pub mod hooks;
pub mod review;
pub mod server;

use std::path::PathBuf;
use std::sync::Arc;

use config::ReviewerConfig;
use events::EventBroadcaster;
use review::client::GroqClient;

/// Shared application state passed to every route handler and CLI command.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ReviewerConfig>,
    /// Root of the repository under review (resolved at startup, not per request).
    pub workspace: PathBuf,
    /// Outbound Groq client. Built once; credential checks happen per request.
    pub reviewer: Arc<GroqClient>,
    /// Review notification fanout (SSE subscribers, future IDE bridges).
    pub broadcaster: Arc<EventBroadcaster>,
    /// Serializes pipeline runs so back-to-back commits cannot interleave
    /// git reads. Queued requests each still run a full pipeline.
    pub review_gate: Arc<tokio::sync::Mutex<()>>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: ReviewerConfig, workspace: PathBuf) -> Self {
        let config = Arc::new(config);
        let reviewer = Arc::new(GroqClient::new(&config));
        Self {
            config,
            workspace,
            reviewer,
            broadcaster: Arc::new(EventBroadcaster::new()),
            review_gate: Arc::new(tokio::sync::Mutex::new(())),
            started_at: std::time::Instant::now(),
        }
    }
}
