//! Creator-Scope main entry point
//!
//! This is the command-line interface for the Creator-Scope analytics engine.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use creator_scope::aggregate::{get_aggregated_result, Metric, PageRequest, ResultQuery, SortOrder};
use creator_scope::batch::{run_batch, CancelFlag, DEFAULT_CHUNK_SIZE};
use creator_scope::client::{build_http_client, OEmbedClient, SourceRegistry};
use creator_scope::config::{load_config_with_hash, Config};
use creator_scope::output::{generate_report, load_statistics, print_statistics, write_creator_report};
use creator_scope::pipeline::{wait_for_terminal, AnalysisPipeline};
use creator_scope::storage::open_storage;
use creator_scope::{JobStatus, JobTracker, RateLimiter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Creator-Scope: creator analytics from public metadata
///
/// Analyzes YouTube channels and Instagram profiles, stores what it finds
/// in SQLite and segments each creator's content by performance.
#[derive(Parser, Debug)]
#[command(name = "creator-scope")]
#[command(version)]
#[command(about = "Creator analytics from public metadata", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a channel URL, profile URL or username and wait for the result
    Analyze {
        /// e.g. https://www.youtube.com/@handle or an Instagram username
        subject: String,
    },

    /// Show the status of an analysis
    Status { id: String },

    /// Show one page of segmented results
    Results {
        id: String,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 50)]
        page_size: usize,

        /// views or likes
        #[arg(long, default_value = "views")]
        metric: Metric,

        /// newest, most-viewed or most-liked
        #[arg(long, default_value = "newest")]
        sort: SortOrder,

        /// Audience size used in place of the stored one
        #[arg(long)]
        audience: Option<u64>,
    },

    /// List recent analyses
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Delete an analysis and its stored data
    Delete { id: String },

    /// Write a markdown report for an analysis
    Report {
        id: String,

        #[arg(long, default_value = "views")]
        metric: Metric,
    },

    /// Show statistics from the database
    Stats,

    /// Look up a file of post URLs (one per line) through oEmbed
    Lookup {
        file: PathBuf,

        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Validate the configuration and print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::CheckConfig => handle_check_config(&config),
        Command::Analyze { subject } => handle_analyze(&config, &subject).await,
        Command::Status { id } => handle_status(&config, &id),
        Command::Results {
            id,
            page,
            page_size,
            metric,
            sort,
            audience,
        } => {
            let query = ResultQuery {
                page: PageRequest::new(page, page_size),
                metric,
                sort,
                audience_size: audience,
            };
            handle_results(&config, &id, &query)
        }
        Command::List { limit } => handle_list(&config, limit),
        Command::Delete { id } => handle_delete(&config, &id),
        Command::Report { id, metric } => handle_report(&config, &id, metric),
        Command::Stats => handle_stats(&config),
        Command::Lookup { file, chunk_size } => handle_lookup(&config, &file, chunk_size).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("creator_scope=info,warn"),
            1 => EnvFilter::new("creator_scope=debug,info"),
            2 => EnvFilter::new("creator_scope=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_tracker(config: &Config) -> anyhow::Result<JobTracker> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open {}", config.output.database_path))?;
    Ok(JobTracker::new(storage))
}

fn handle_check_config(config: &Config) -> anyhow::Result<()> {
    println!("=== Creator-Scope Configuration ===\n");

    println!("User Agent:");
    println!("  Name: {}", config.user_agent.client_name);
    println!("  Version: {}", config.user_agent.client_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Reports: {}", config.output.report_dir);

    println!("\nPipeline:");
    println!("  Batch size: {}", config.pipeline.batch_size);
    println!("  Max items: {}", config.pipeline.max_items);
    println!("  Step timeout: {}s", config.pipeline.step_timeout_secs);
    println!("  Request timeout: {}s", config.pipeline.request_timeout_secs);

    println!("\nSources:");
    let youtube_key = config.youtube.as_ref().and_then(|y| y.resolved_api_key());
    println!(
        "  YouTube: {}",
        if youtube_key.is_some() { "enabled" } else { "disabled (no API key)" }
    );
    println!("  Instagram: {}", config.instagram.base_url);
    println!("  oEmbed: {}", config.instagram.oembed_url);

    println!("\nRate Limits:");
    for (name, settings) in [
        ("api", &config.rate_limit.api),
        ("oembed", &config.rate_limit.oembed),
    ] {
        println!(
            "  {}: {} req/s ({}..{}), {} retries",
            name, settings.initial_rate, settings.min_rate, settings.max_rate, settings.max_retries
        );
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

async fn handle_analyze(config: &Config, subject: &str) -> anyhow::Result<()> {
    let tracker = open_tracker(config)?;
    let api_limiter = Arc::new(RateLimiter::new("api", config.rate_limit.api.clone())?);
    let oembed_limiter = Arc::new(RateLimiter::new("oembed", config.rate_limit.oembed.clone())?);
    let sources = SourceRegistry::from_config(config, oembed_limiter)?;

    let pipeline = AnalysisPipeline::new(
        tracker.clone(),
        sources,
        api_limiter,
        config.pipeline.clone(),
    );
    let job = pipeline.submit(subject)?;
    println!("Analysis {} submitted", job.analysis_id);

    let poll = Duration::from_millis(config.pipeline.poll_interval_ms);
    let record = tokio::select! {
        record = wait_for_terminal(&tracker, &job.analysis_id, poll, None) => record?,
        _ = tokio::signal::ctrl_c() => {
            job.handle.abort();
            tracker.advance(&job.analysis_id, JobStatus::Failed, 0, Some("interrupted"))?;
            bail!("analysis {} interrupted", job.analysis_id);
        }
    };

    println!("Analysis {} {}", record.analysis_id, record.status);
    if let Some(error) = &record.error_message {
        println!("  Error: {}", error);
    }

    let result = get_aggregated_result(&tracker, &record.analysis_id, &ResultQuery::default())?;
    println!("  Items stored: {}", result.page.total_count);
    for (tier, count) in &result.tier_counts {
        println!("  {}: {}", tier, count);
    }

    if record.status == JobStatus::Failed {
        bail!("analysis {} failed", record.analysis_id);
    }
    Ok(())
}

fn handle_status(config: &Config, id: &str) -> anyhow::Result<()> {
    let tracker = open_tracker(config)?;
    let Some(job) = tracker.get_job(id)? else {
        bail!("analysis {} not found", id);
    };

    println!("Analysis: {}", job.analysis_id);
    println!("  Creator: {} ({})", job.display_name, job.subject_id);
    println!("  Status: {} ({}%)", job.status, job.progress);
    if let Some(error) = &job.error_message {
        println!("  Error: {}", error);
    }
    println!("  Created: {}", job.created_at.to_rfc3339());
    println!("  Updated: {}", job.updated_at.to_rfc3339());
    Ok(())
}

fn handle_results(config: &Config, id: &str, query: &ResultQuery) -> anyhow::Result<()> {
    let tracker = open_tracker(config)?;
    let result = get_aggregated_result(&tracker, id, query)?;

    println!(
        "{} ({}, {}%)",
        result.job.display_name, result.job.status, result.job.progress
    );
    if !result.is_final {
        println!("Results are not final.");
    }
    if let Some(parent) = &result.parent {
        if let Some(audience) = parent.audience_size {
            println!("Audience: {}", audience);
        }
    }

    println!("\nTiers by {}:", result.metric);
    for (tier, count) in &result.tier_counts {
        println!("  {:<10} {}", tier.label(), count);
    }

    let page = &result.page;
    println!(
        "\nPage {}/{} ({} items total)",
        page.page,
        page.total_pages.max(1),
        page.total_count
    );
    for entry in &page.items {
        let item = &entry.item;
        let posted = item
            .date_posted
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<10} {:>12} views {:>10} likes  {}  {}",
            entry.tier.label(),
            item.view_count,
            item.like_count,
            posted,
            item.url
        );
    }
    Ok(())
}

fn handle_list(config: &Config, limit: usize) -> anyhow::Result<()> {
    let tracker = open_tracker(config)?;
    let jobs = tracker.list_jobs(limit)?;

    if jobs.is_empty() {
        println!("No analyses yet");
        return Ok(());
    }
    for job in jobs {
        println!(
            "{}  {:<10} {:>3}%  {}  {}",
            job.analysis_id,
            job.status.to_db_string(),
            job.progress,
            job.created_at.format("%Y-%m-%d %H:%M"),
            job.display_name
        );
    }
    Ok(())
}

fn handle_delete(config: &Config, id: &str) -> anyhow::Result<()> {
    let tracker = open_tracker(config)?;
    let summary = tracker.delete_job(id)?;

    if summary.jobs == 0 {
        bail!("analysis {} not found", id);
    }
    println!(
        "Deleted {} ({} content items, {} parent records)",
        id, summary.items, summary.parents
    );
    Ok(())
}

fn handle_report(config: &Config, id: &str, metric: Metric) -> anyhow::Result<()> {
    let tracker = open_tracker(config)?;
    let report = generate_report(&tracker, id, metric)?;
    let path = write_creator_report(&report, Path::new(&config.output.report_dir))?;

    println!("✓ Report written to: {}", path.display());
    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let tracker = open_tracker(config)?;
    let stats = load_statistics(&tracker)?;
    print_statistics(&stats);
    Ok(())
}

async fn handle_lookup(config: &Config, file: &Path, chunk_size: usize) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        bail!("{} contains no URLs", file.display());
    }

    let tracker = open_tracker(config)?;
    let http = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.pipeline.request_timeout_secs),
    )?;
    let limiter = Arc::new(RateLimiter::new("oembed", config.rate_limit.oembed.clone())?);
    let oembed = OEmbedClient::new(http, &config.instagram, limiter);

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current chunk");
            on_signal.cancel();
        }
    });

    let run = run_batch(&tracker, &oembed, &urls, chunk_size, &cancel).await?;

    println!("Batch {} {}", run.id, run.status);
    println!(
        "  {} of {} processed: {} succeeded, {} failed",
        run.processed, run.total_urls, run.succeeded, run.failed
    );
    if let Some(error) = &run.error_message {
        println!("  Error: {}", error);
    }
    Ok(())
}
