use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use thiserror::Error;
use tokfetch_core::{
    load_config, shutdown_signal, MediaResult, Orchestrator, OrchestratorError, StatsRegistry,
    StatusReport, TokfetchConfig,
};
use tracing::info;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] tokfetch_core::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered with HTTP {0}")]
    Status(u16),
    #[error("setup failed: {0}")]
    Build(#[from] tokfetch_core::BuildError),
    #[error(transparent)]
    Serve(#[from] tokfetch_core::ServeError),
    #[error(transparent)]
    Download(#[from] OrchestratorError),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "TikTok video metadata fetcher", long_about = None)]
pub struct Cli {
    /// Path to tokfetch.toml
    #[arg(long, default_value = "configs/tokfetch.toml")]
    pub config: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Resolves one video link and prints the result
    Fetch {
        url: String,
    },
    /// Queries a running server's status endpoint
    Status {
        #[arg(long, env = "TOKFETCH_SERVER", default_value = "http://127.0.0.1:3000")]
        server: String,
    },
    /// Prints shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = load_config(&cli.config)?;
            apply_overrides(&mut config, host, port);
            tokfetch_core::serve(&config, shutdown_signal()).await?;
        }
        Commands::Fetch { url } => {
            let config = load_config(&cli.config)?;
            let orchestrator = Orchestrator::from_config(&config, Arc::new(StatsRegistry::new()))?;
            let result = orchestrator.download(&url).await?;
            render(&result, cli.format)?;
        }
        Commands::Status { server } => {
            let report = fetch_status(&server).await?;
            render(&report, cli.format)?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "tokfetchctl", &mut io::stdout());
        }
    }
    Ok(())
}

fn apply_overrides(config: &mut TokfetchConfig, host: Option<String>, port: Option<u16>) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
}

fn status_url(server: &str) -> String {
    format!("{}/api/status", server.trim_end_matches('/'))
}

async fn fetch_status(server: &str) -> Result<StatusReport> {
    let url = status_url(server);
    info!(%url, "querying server status");
    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(AppError::Status(response.status().as_u16()));
    }
    Ok(response.json::<StatusReport>().await?)
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

impl DisplayFallback for MediaResult {
    fn display(&self) -> String {
        let media = &self.media;
        let mut lines = vec![
            format!("{} ({})", media.title, media.video_id),
            format!("Author: {} @{}", media.author, media.author_username),
            format!("Duration: {}", media.duration_label),
            format!(
                "Views: {}  Likes: {}  Comments: {}  Shares: {}",
                media.views_label, media.likes_label, media.comments_label, media.shares_label
            ),
            format!("Video: {}", media.video_url),
        ];
        if let Some(audio) = &media.audio_url {
            lines.push(format!("Audio: {audio}"));
        }
        if let Some(thumbnail) = &media.thumbnail_url {
            lines.push(format!("Thumbnail: {thumbnail}"));
        }
        lines.push(format!("Music: {}", media.music_title));
        lines.push(format!("Method: {}", self.method));
        lines.join("\n")
    }
}

impl DisplayFallback for StatusReport {
    fn display(&self) -> String {
        [
            format!("Status: {} (up {}s)", self.status, self.uptime_seconds),
            format!("Primary successes: {}", self.stats.primary_successes),
            format!("Fallback successes: {}", self.stats.fallback_successes),
            format!("Failures: {}", self.stats.total_failures),
        ]
        .join("\n")
    }
}
