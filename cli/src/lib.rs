use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use slide_client::HttpTransport;
use slide_common::SlideConfig;
use slide_core::Session;
use slide_protocol::{check_slide_count, GenerationRequest, Tone};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

mod output;

#[derive(Parser)]
#[command(name = "slide")]
#[command(about = "Generate slide decks from a topic: outline, slides, PPTX export")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file (JSON or TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Deck service base URL (e.g., http://localhost:8000)
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive slide creation mode
    Interactive,
    /// Propose an outline for a topic
    Outline(RequestArgs),
    /// Propose an outline, then generate the full deck
    Generate(RequestArgs),
    /// Generate a deck and export it as PPTX
    Export {
        #[command(flatten)]
        request: RequestArgs,
        /// Save the exported file into the download directory
        #[arg(long)]
        download: bool,
    },
    /// Check that the deck service is up
    Health {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Presentation topic
    #[arg(short, long)]
    pub topic: String,
    /// Intended audience
    #[arg(short, long)]
    pub audience: String,
    /// professional | casual | academic | persuasive | informative | inspirational
    #[arg(long)]
    pub tone: Option<String>,
    /// Number of slides (3-20)
    #[arg(short, long, allow_negative_numbers = true)]
    pub slides: Option<i64>,
    /// Print the raw result as JSON
    #[arg(long)]
    pub json: bool,
}

impl RequestArgs {
    /// Builds the request, falling back to the configured tone and count.
    pub fn to_request(&self, config: &SlideConfig) -> Result<GenerationRequest> {
        let tone = match &self.tone {
            Some(tone) => Tone::from_str(tone)?,
            None => config.default_tone,
        };
        let slide_count = match self.slides {
            Some(count) => check_slide_count(count)?,
            None => config.default_slide_count,
        };
        Ok(GenerationRequest::new(
            self.topic.clone(),
            self.audience.clone(),
            tone,
            slide_count,
        ))
    }
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SlideConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
        config.validate()?;
    }

    let command = cli.command.unwrap_or(Commands::Interactive);
    match &command {
        Commands::Interactive => init_logging(cli.debug, Some(&config.log_path()))?,
        _ => init_logging(cli.debug, None)?,
    }
    tracing::debug!(base_url = %config.base_url, "configuration loaded");

    match command {
        Commands::Interactive => {
            slide_tui::run_interactive(&config).await?;
        }
        Commands::Outline(args) => {
            let request = args.to_request(&config)?;
            let mut session = Session::from_config(&config)?;
            let outline = session.submit_and_wait(request).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outline)?);
            } else {
                print!("{}", output::outline(&outline));
            }
        }
        Commands::Generate(args) => {
            let request = args.to_request(&config)?;
            let mut session = Session::from_config(&config)?;
            session.submit_and_wait(request).await?;
            let deck = session.generate_and_wait().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&deck)?);
            } else {
                print!("{}", output::deck(&deck));
            }
        }
        Commands::Export { request, download } => {
            let json = request.json;
            let request = request.to_request(&config)?;
            let mut session = Session::from_config(&config)?;
            session.submit_and_wait(request).await?;
            session.generate_and_wait().await?;
            let link = session.export_and_wait().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&link)?);
            } else {
                println!("{}: {}", link.filename, link.url);
            }
            if download {
                let http = HttpTransport::new(&config.base_url, config.timeout())?;
                let saved = http
                    .download(&link.url, &config.download_dir, &link.filename)
                    .await?;
                println!("Saved to {}", saved.display());
            }
        }
        Commands::Health { json } => {
            let session = Session::from_config(&config)?;
            let status = session.api().health().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", output::health(&status));
            }
            if !status.is_ok() {
                anyhow::bail!("deck service reported status {}", status.status);
            }
        }
    }

    Ok(())
}

/// Installs the global subscriber. With a log file the terminal is left to
/// the TUI; otherwise logs go to stderr.
fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let level = match (debug, log_file) {
        (true, _) => "debug",
        (false, Some(_)) => "info",
        (false, None) => "warn",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let installed = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!(e))
}
