//! Command line entry point for the podium rating engine
//!
//! Loads a JSON dataset into the in-memory stores, runs one engine operation
//! (recompute, update, predict, evaluate or a read-only query), prints the
//! result as JSON and writes the changed dataset back unless `--dry-run` is set.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use podium::config::AppConfig;
use podium::dataset::Dataset;
use podium::metrics::MetricsCollector;
use podium::{EntityKind, RatingService};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Podium - Elo ratings and win predictions for multi-entrant races
#[derive(Parser)]
#[command(
    name = "podium",
    version,
    about = "Competitive rating and race outcome prediction engine",
    long_about = "Podium maintains Elo-style ratings for drivers and teams from a race history, \
                 issues win probabilities for upcoming races and scores them against results. \
                 Every command works on a JSON dataset file."
)]
struct Args {
    /// Dataset file
    #[arg(long, value_name = "FILE", help = "Path to the JSON dataset")]
    data: PathBuf,

    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (leave the dataset untouched)
    #[arg(long, help = "Run the command without writing the dataset back")]
    dry_run: bool,

    /// Output file for the command result
    #[arg(short, long, value_name = "FILE", help = "Write JSON output here instead of stdout")]
    output: Option<PathBuf>,

    /// Print collected metrics to stderr on exit
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reset every rating and replay the full history
    Recompute,

    /// Apply one completed contest to the current ratings
    Update {
        contest_id: String,
    },

    /// Issue predictions for one contest, or every upcoming contest
    Predict {
        contest_id: Option<String>,
        /// Comma separated entrants (default: every rated driver)
        #[arg(long, value_delimiter = ',')]
        roster: Vec<String>,
    },

    /// Score stored predictions for one contest, or every completed contest
    Evaluate {
        contest_id: Option<String>,
    },

    /// Summarise stored accuracy records without re-scoring
    Accuracy {
        /// Model version (default: the configured model)
        #[arg(long)]
        model: Option<String>,
    },

    /// Show the highest current ratings
    Leaderboard {
        #[arg(long, value_enum, default_value_t = KindArg::Driver)]
        kind: KindArg,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show the rating history of one entity
    Audit {
        entity_id: String,
        #[arg(long, value_enum, default_value_t = KindArg::Driver)]
        kind: KindArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Driver,
    Team,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Driver => EntityKind::Driver,
            KindArg::Team => EntityKind::Team,
        }
    }
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::Accuracy { .. } | Command::Leaderboard { .. } | Command::Audit { .. }
        )
    }
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    podium::config::validate_config(&config)?;
    Ok(config)
}

fn emit<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Wrote output to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run(args: &Args, service: &RatingService) -> Result<()> {
    let output = args.output.as_ref();

    match &args.command {
        Command::Recompute => emit(&service.full_recompute().await?, output),
        Command::Update { contest_id } => emit(&service.update_contest(contest_id).await?, output),
        Command::Predict { contest_id, roster } => match contest_id {
            Some(contest_id) => {
                let roster = (!roster.is_empty()).then_some(roster.as_slice());
                emit(&service.predict_contest(contest_id, roster).await?, output)
            }
            None => emit(&service.predict_upcoming().await?, output),
        },
        Command::Evaluate { contest_id } => match contest_id {
            Some(contest_id) => emit(&service.evaluate_contest(contest_id).await?, output),
            None => emit(&service.evaluate_completed().await?, output),
        },
        Command::Accuracy { model } => {
            emit(&service.accuracy_report(model.as_deref()).await?, output)
        }
        Command::Leaderboard { kind, limit } => {
            emit(&service.leaderboard((*kind).into(), *limit).await?, output)
        }
        Command::Audit { entity_id, kind } => {
            emit(&service.audit_trail((*kind).into(), entity_id).await?, output)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(
        "{} {} using dataset {}",
        config.service.name,
        podium::VERSION,
        args.data.display()
    );

    let stores = Dataset::load(&args.data)?.into_stores().await?;
    let metrics = Arc::new(MetricsCollector::new()?);
    let service = RatingService::new(
        config,
        stores.ratings.clone(),
        stores.results.clone(),
        stores.predictions.clone(),
        metrics.clone(),
    )?;

    if let Err(e) = run(&args, &service).await {
        error!("Command failed: {}", e);
        return Err(e);
    }

    if args.command.mutates() {
        if args.dry_run {
            info!("Dry run - dataset left unchanged");
        } else {
            Dataset::from_stores(&stores).await?.save(&args.data)?;
            info!("Saved dataset {}", args.data.display());
        }
    }

    if args.print_metrics {
        eprintln!("{}", metrics.export_text()?);
    }

    Ok(())
}
