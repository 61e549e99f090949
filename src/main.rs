use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use revd::{config::ReviewerConfig, hooks, review, server::ReviewServer, AppContext};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "revd", about = "revd — post-commit AI review daemon", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Review server port
    #[arg(long)]
    port: Option<u16>,

    /// Data directory for config.toml
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log: Option<String>,

    /// Bind address for the review server (default: 127.0.0.1)
    #[arg(long)]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "REVD_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Repository to review (default: current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the review daemon (default when no subcommand given).
    ///
    /// Binds the loopback review server and, unless auto_start is disabled,
    /// installs the post-commit hook into the workspace. Runs in the
    /// foreground until interrupted.
    ///
    /// Examples:
    ///   revd serve
    ///   revd --port 3005 serve
    Serve,
    /// Review the last commit once, in process, and print the result.
    ///
    /// Runs the same pipeline as POST /review-diff without needing a
    /// running daemon. Exits non-zero on pipeline failure.
    ///
    /// Examples:
    ///   revd review
    ///   revd --workspace /path/to/repo review
    Review,
    /// Manage the repository's post-commit hook.
    ///
    /// Examples:
    ///   revd hook install
    ///   revd hook status
    ///   revd hook uninstall
    Hook {
        #[command(subcommand)]
        action: HookAction,
    },
    /// Show the resolved configuration (API key redacted).
    Config,
}

#[derive(Subcommand)]
enum HookAction {
    /// Install the post-commit hook posting to the configured port.
    Install {
        /// Overwrite a post-commit hook not written by revd
        #[arg(long)]
        force: bool,
    },
    /// Remove the hook if revd installed it.
    Uninstall,
    /// Report whether the hook is installed and which port it posts to.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ReviewerConfig::new(args.port, args.data_dir, args.log, args.bind_address);
    let _log_guard = init_tracing(&config.log, &config.log_format, args.log_file.clone());

    let workspace = match args.workspace {
        Some(ws) => ws,
        None => std::env::current_dir().context("could not resolve current directory")?,
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, workspace).await,
        Command::Review => review_once(config, workspace).await,
        Command::Hook { action } => hook_command(&config, &workspace, action),
        Command::Config => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn serve(config: ReviewerConfig, workspace: PathBuf) -> Result<()> {
    let ctx = Arc::new(AppContext::new(config, workspace));

    if !ctx.config.has_api_key() {
        warn!("no Groq API key configured — reviews will fail until one is set");
    }

    // Best-effort: a workspace without a git checkout still gets a server;
    // the hook can be installed later once the repo exists.
    if ctx.config.auto_start {
        match hooks::install(&ctx.workspace, ctx.config.port, false) {
            Ok(path) => info!(path = %path.display(), "post-commit hook ready"),
            Err(e) => warn!("could not install post-commit hook: {e}"),
        }
    }

    let mut server = ReviewServer::new(ctx);
    server.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    server.stop().await;
    Ok(())
}

async fn review_once(config: ReviewerConfig, workspace: PathBuf) -> Result<()> {
    let ctx = AppContext::new(config, workspace);
    match review::run_review(&ctx).await? {
        review::ReviewOutcome::NoDiff => {
            println!("No diff found — nothing to review.");
            Ok(())
        }
        review::ReviewOutcome::Completed(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

fn hook_command(config: &ReviewerConfig, workspace: &std::path::Path, action: HookAction) -> Result<()> {
    match action {
        HookAction::Install { force } => {
            let path = hooks::install(workspace, config.port, force)?;
            println!("Installed post-commit hook at {}", path.display());
        }
        HookAction::Uninstall => {
            if hooks::uninstall(workspace)? {
                println!("Removed post-commit hook.");
            } else {
                println!("No hook installed.");
            }
        }
        HookAction::Status => match hooks::status(workspace)? {
            hooks::HookStatus::NotInstalled => println!("Hook: not installed"),
            hooks::HookStatus::Foreign => {
                println!("Hook: present, but not managed by revd")
            }
            hooks::HookStatus::Installed { port } => match port {
                Some(port) => println!("Hook: installed, posting to port {port}"),
                None => println!("Hook: installed"),
            },
        },
    }
    Ok(())
}

fn show_config(config: &ReviewerConfig) {
    let key = if config.groq_api_key.is_empty() {
        "not configured".to_string()
    } else {
        format!("{}...", config.groq_api_key.chars().take(8).collect::<String>())
    };
    println!("api key:      {key}");
    println!("model:        {}", config.model);
    println!("port:         {}", config.port);
    println!("bind address: {}", config.bind_address);
    println!("auto start:   {}", config.auto_start);
    println!("api url:      {}", config.groq_api_url);
    println!("data dir:     {}", config.data_dir.display());
}

// ── Tracing setup ─────────────────────────────────────────────────────────────

/// Initialise tracing from the resolved log level/format, optionally teeing
/// to a daily-rotated log file. Returns the appender guard that must stay
/// alive for the duration of the process.
fn init_tracing(
    log_level: &str,
    log_format: &str,
    log_file: Option<PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("revd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
