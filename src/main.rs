use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use motorsport_scraper::apis::factory::create_adapters;
use motorsport_scraper::app::ports::HttpClientPort;
use motorsport_scraper::infra::http_client::ReqwestHttp;
use motorsport_scraper::observability::{init_metrics, render};
use motorsport_scraper::temporal::{parse_date, parse_time_range, ContextHints};
use motorsport_scraper::{
    logging, target_window, CategoryKnowledgeBase, Config, EventExporter, JsonExporter,
    ReconciliationPipeline,
};

#[derive(Parser)]
#[command(name = "motorsport_scraper")]
#[command(about = "Collects and reconciles motorsport weekend schedules")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, reconcile and export the current weekend
    Run {
        /// Pretend the run happens at this RFC 3339 instant
        #[arg(long)]
        now: Option<String>,
        /// Only run these source ids (comma-separated)
        #[arg(long)]
        sources: Option<String>,
        /// Write Prometheus metrics text to this file after the run
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Print the active target window
    Window {
        #[arg(long)]
        now: Option<String>,
    },
    /// Parse a date string the way listings are parsed
    ParseDate {
        text: String,
        /// Reference date (YYYY-MM-DD) for year-less dates
        #[arg(long)]
        context: Option<String>,
    },
    /// Parse a time or time range
    ParseTime { text: String },
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(text) => Ok(DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("invalid --now value '{}'", text))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

async fn run(config: Config, now: DateTime<Utc>, sources: Option<String>, metrics_out: Option<PathBuf>) -> Result<()> {
    if let Err(e) = init_metrics() {
        warn!("Metrics disabled: {}", e);
    }

    let categories_path = config.categories_path.clone();
    let categories = match &categories_path {
        Some(path) => CategoryKnowledgeBase::load(path)?,
        None => CategoryKnowledgeBase::with_defaults(),
    };

    let only: Option<Vec<String>> =
        sources.map(|list| list.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect());
    let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new()?);
    let adapters = create_adapters(&config.sources, only.as_deref(), http)?;

    let pipeline = ReconciliationPipeline::from_config(&config, categories)?;
    let result = pipeline.reconcile(&adapters, now).await?;
    let output_file = JsonExporter::new(&config.output_dir).export(&result)?;

    if let Some(path) = &categories_path {
        if !result.learned_categories.is_empty() {
            let mut categories = pipeline.categories().clone();
            for (alias, canonical) in &result.learned_categories {
                categories.learn(alias, canonical);
            }
            categories.save(path)?;
            info!(learned = result.learned_categories.len(), "Saved learned category aliases");
        }
    }

    println!("\n📊 Reconciliation results for {} → {}:", result.window.start, result.window.end);
    println!("   Fetched: {}", result.stats.fetched);
    println!("   Rejected: {}", result.stats.rejected);
    for (reason, count) in &result.stats.rejected_by_reason {
        println!("     {}: {}", reason, count);
    }
    println!("   Duplicates merged: {}", result.stats.duplicates_merged);
    println!("   Emitted: {}", result.stats.emitted);
    println!("   Output file: {}", output_file.display());
    if !result.errors.is_empty() {
        println!("\n⚠️  Source errors:");
        for error in &result.errors {
            println!(
                "   - {} ({}, {} attempts): {}",
                error.source_id,
                error.kind.label(),
                error.attempts,
                error.last_error
            );
        }
    }

    if let Some(path) = metrics_out {
        match render() {
            Some(text) => fs::write(&path, text)?,
            None => warn!("Metrics recorder not installed, nothing written to {}", path.display()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { now, sources, metrics_out } => {
            let config = Config::load(&cli.config)?;
            let _guard = logging::init_logging(&config.log_dir);
            let now = parse_now(now.as_deref())?;
            println!("🏁 Running reconciliation...");
            run(config, now, sources, metrics_out).await?;
        }
        Commands::Window { now } => {
            let config = Config::load(&cli.config)?;
            let window = target_window(parse_now(now.as_deref())?, config.timezone()?, &config.window_config()?);
            println!("{} → {} ({})", window.start, window.end, window.timezone);
        }
        Commands::ParseDate { text, context } => {
            let hints = match context {
                Some(reference) => ContextHints::with_reference(
                    reference.parse().with_context(|| format!("invalid --context date '{}'", reference))?,
                ),
                None => ContextHints::default(),
            };
            match parse_date(&text, &hints) {
                Ok(found) => println!("{} (confidence {:.2}, {:?})", found.date, found.confidence, found.format),
                Err(kind) => println!("no date: {}", kind.label()),
            }
        }
        Commands::ParseTime { text } => match parse_time_range(&text) {
            Ok(range) => match range.end {
                Some(end) => println!("{} - {}", range.start, end),
                None => println!("{}", range.start),
            },
            Err(kind) => println!("no time: {}", kind.label()),
        },
    }
    Ok(())
}
