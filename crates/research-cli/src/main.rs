//! Command-line interface for research-rs
//!
//! # Usage
//!
//! ```bash
//! # API keys can live in a .env file next to the binary
//! export GEMINI_API_KEY="..."
//! export NEWS_API_KEY="..."      # optional
//! export MARKET_API_KEY="..."    # optional
//!
//! research run "solid state batteries"
//! research run quantum computing --no-market --format json --save
//! research check
//! research parse saved_response.txt --headings headings.json
//! ```

mod render;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use research_core::{DataSource, ResearchRequest, ResearchResult};
use research_engine::{
    ExportFormat, HeadingTable, ResearchEngine, ResponseParser, ServiceState, export,
};
use research_utils::{Config, LogFormat};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "research")]
#[command(about = "AI research reports from Gemini, enriched with news and market data", long_about = None)]
#[command(version)]
struct Cli {
    /// Log output format (overrides RESEARCH_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Research a topic
    Run {
        /// Topic to research; several words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,

        /// Skip the news source
        #[arg(long)]
        no_news: bool,

        /// Skip the market source
        #[arg(long)]
        no_market: bool,

        /// Alternative heading table (JSON)
        #[arg(long, value_name = "PATH")]
        headings: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Probe the AI, news and market services
    Check,
    /// Split a saved AI response into sections without calling any service
    Parse {
        /// File containing the raw AI response
        file: PathBuf,

        /// Topic recorded in the report (defaults to the file name)
        #[arg(long)]
        topic: Option<String>,

        /// Alternative heading table (JSON)
        #[arg(long, value_name = "PATH")]
        headings: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// How to print the report
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(long, short, value_name = "PATH", conflicts_with = "save")]
    output: Option<PathBuf>,

    /// Write the report to research_<topic>_<date>.<ext> in the current directory
    #[arg(long)]
    save: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Pretty,
    Text,
    Json,
}

impl OutputFormat {
    fn export_format(self) -> ExportFormat {
        match self {
            Self::Pretty | Self::Text => ExportFormat::Text,
            Self::Json => ExportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {e}");
        }
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render::error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    research_utils::init_tracing_with(cli.log_format.unwrap_or(config.log_format));
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Run {
            topic,
            no_news,
            no_market,
            headings,
            output,
        } => {
            let mut request = ResearchRequest::new(topic.join(" "))?;
            if no_news {
                request = request.without(DataSource::News);
            }
            if no_market {
                request = request.without(DataSource::Market);
            }

            let engine = build_engine(&config, headings.as_deref())?;
            info!(topic = request.topic(), "Researching");
            let result = engine.research(&request).await?;
            emit(&result, &output)
        }
        Commands::Check => {
            let engine = ResearchEngine::from_config(&config)?;
            let statuses = engine.check_services().await;
            println!("{}", render::services(&statuses));

            if statuses.iter().any(|s| matches!(s.state, ServiceState::Failed(_))) {
                anyhow::bail!("one or more services failed their check");
            }
            Ok(())
        }
        Commands::Parse {
            file,
            topic,
            headings,
            output,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let topic = topic.unwrap_or_else(|| topic_from_path(&file));

            let parser = ResponseParser::new(load_headings(headings.as_deref())?);
            let mut result = research_engine::report_from_text(&parser, &topic, &raw);
            result.sources = vec![format!("file:{}", file.display())];
            emit(&result, &output)
        }
    }
}

fn build_engine(config: &Config, headings: Option<&Path>) -> anyhow::Result<ResearchEngine> {
    let engine = ResearchEngine::builder_from_config(config)?
        .headings(load_headings(headings)?)
        .build();
    debug!(?engine, "Engine ready");
    Ok(engine)
}

fn load_headings(path: Option<&Path>) -> anyhow::Result<HeadingTable> {
    let Some(path) = path else {
        return Ok(HeadingTable::default());
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read heading table {}", path.display()))?;
    HeadingTable::from_json_str(&json)
        .with_context(|| format!("Invalid heading table {}", path.display()))
}

fn topic_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or_else(|| "saved response".to_string())
}

fn emit(result: &ResearchResult, args: &OutputArgs) -> anyhow::Result<()> {
    let target = match (&args.output, args.save) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(export::file_name(
            result,
            args.format.export_format(),
        ))),
        (None, false) => None,
    };

    match target {
        Some(path) => {
            // Files always get the plain-text or JSON export, never terminal decoration
            let content = args.format.export_format().render(result)?;
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("💾 Saved report to {}", path.display());
        }
        None => {
            let rendered = match args.format {
                OutputFormat::Pretty => render::pretty(result),
                OutputFormat::Text => export::to_text(result),
                OutputFormat::Json => export::to_json(result)?,
            };
            println!("{rendered}");
        }
    }

    Ok(())
}
