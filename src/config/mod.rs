use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI flag  >  TOML  >  env var  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Groq API key. Also settable via the `GROQ_API_KEY` env var.
    groq_api_key: Option<String>,
    /// Model identifier sent to the completion endpoint (default: llama-3.3-70b-versatile).
    model: Option<String>,
    /// Review server port (default: 3001).
    port: Option<u16>,
    /// Install the post-commit hook automatically on `revd serve` (default: true).
    auto_start: Option<bool>,
    /// Bind address for the review server (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Override the Groq API base URL (default: https://api.groq.com/openai/v1).
    groq_api_url: Option<String>,
    /// Log level filter string, e.g. "debug", "info,revd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json".
    log_format: Option<String>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── Layered resolution ───────────────────────────────────────────────────────

/// Resolve one config key from its layered sources.
///
/// Priority (highest to lowest): CLI flag, settings file, environment,
/// built-in default. Kept as a plain function so precedence is testable
/// without touching process-global state.
fn resolve<T>(cli: Option<T>, setting: Option<T>, env: Option<T>, default: T) -> T {
    cli.or(setting).or(env).unwrap_or(default)
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|s| s.trim().parse().ok())
}

// ─── ReviewerConfig ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReviewerConfig {
    /// Groq API key, trimmed. Empty string means not configured — the
    /// pipeline fails fast before any network call.
    pub groq_api_key: String,
    pub model: String,
    pub port: u16,
    /// Install the post-commit hook automatically when the daemon starts.
    pub auto_start: bool,
    pub bind_address: String,
    /// Completion endpoint base URL. Overridable for self-hosted gateways
    /// and tests (`REVD_GROQ_URL`).
    pub groq_api_url: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// "pretty" (default) | "json".
    pub log_format: String,
}

impl ReviewerConfig {
    /// Build config from CLI args + optional TOML file + environment.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI flag — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Environment (`GROQ_API_KEY`, `DEFAULT_MODEL`, `REVD_*`)
    ///   4. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir
            .or_else(|| env_string("REVD_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(default_data_dir);

        let toml = load_toml(&data_dir).unwrap_or_default();

        let groq_api_key = resolve(
            None,
            toml.groq_api_key.filter(|s| !s.trim().is_empty()),
            env_string("GROQ_API_KEY"),
            String::new(),
        )
        .trim()
        .to_string();

        let model = resolve(
            None,
            toml.model.filter(|s| !s.trim().is_empty()),
            env_string("DEFAULT_MODEL"),
            DEFAULT_MODEL.to_string(),
        )
        .trim()
        .to_string();

        let port = resolve(port, toml.port, env_parse("REVD_PORT"), DEFAULT_PORT);
        let auto_start = resolve(None, toml.auto_start, env_parse("REVD_AUTO_START"), true);

        let bind_address = resolve(
            bind_address,
            toml.bind_address,
            env_string("REVD_BIND"),
            default_bind_address(),
        );

        let groq_api_url = resolve(
            None,
            toml.groq_api_url,
            env_string("REVD_GROQ_URL"),
            DEFAULT_GROQ_API_URL.to_string(),
        )
        .trim_end_matches('/')
        .to_string();

        let log = resolve(log, toml.log, env_string("REVD_LOG"), "info".to_string());
        let log_format = resolve(
            None,
            toml.log_format,
            env_string("REVD_LOG_FORMAT"),
            "pretty".to_string(),
        );

        Self {
            groq_api_key,
            model,
            port,
            auto_start,
            bind_address,
            groq_api_url,
            data_dir,
            log,
            log_format,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.groq_api_key.is_empty()
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/revd
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("revd");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/revd or ~/.local/share/revd
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("revd");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local").join("share").join("revd");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\revd
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("revd");
        }
    }
    // Fallback
    PathBuf::from(".revd")
}
