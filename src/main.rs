//! # Financial News Tracker
//!
//! Scrapes headline listings from Indian financial news sites, keeps the ones
//! announcing an IPO, a merger or acquisition, or a demerger, and stores them
//! for a mailed digest.
//!
//! ## Usage
//!
//! ```sh
//! finnews_tracker --store ./articles.json scrape
//! finnews_tracker --store ./articles.json digest
//! ```
//!
//! ## Architecture
//!
//! A scraping cycle follows a pipeline:
//! 1. **Seeding**: Load previously accepted titles and links for dedup
//! 2. **Fetching**: Download each source's listing page, one source at a time
//! 3. **Extraction**: Pull `(title, link)` candidates with per-site selectors
//! 4. **Classification**: Exact-word keyword match, then exclusion check
//! 5. **Output**: Store new articles as unsent and optionally write a report
//!
//! The `digest` command mails unsent articles and flags them as sent.

use chrono::Local;
use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod digest;
mod fetch;
mod keywords;
mod models;
mod normalize;
mod outputs;
mod pacer;
mod pipeline;
mod scrapers;
mod store;

use cli::{Cli, Command, DigestArgs};
use config::ScraperConfig;
use digest::{DigestOutcome, SmtpMailer, send_digest};
use fetch::{HttpFetcher, RetryFetch};
use keywords::Classifier;
use outputs::markdown;
use pacer::PaceController;
use pipeline::{CycleOutcome, Pipeline};
use scrapers::SourceRegistry;
use store::json::JsonFileStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("finnews_tracker starting up");

    let args = Cli::parse();
    debug!(?args.config, %args.store, ?args.report_dir, "Parsed CLI arguments");

    let config = match ScraperConfig::load(args.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            error!(path = ?args.config, error = %e, "Failed to load configuration");
            return Err(e);
        }
    };
    let store = JsonFileStore::new(&args.store);

    match args.command {
        Command::Scrape { once } => scrape(&config, &store, args.report_dir.as_deref(), once).await,
        Command::Digest(digest_args) => digest(&store, &digest_args).await,
    }
}

/// Run scraping cycles until Ctrl-C, or exactly one when `once` is set.
async fn scrape(
    config: &ScraperConfig,
    store: &JsonFileStore,
    report_dir: Option<&str>,
    once: bool,
) -> Result<(), Box<dyn Error>> {
    let registry = SourceRegistry::standard()?;
    let http = HttpFetcher::new(config.request_timeout(), config.user_agent.as_deref())?;
    let fetcher = RetryFetch::new(http, config.max_retries, config.retry_base_delay());
    let pipeline = Pipeline::new(&registry, &fetcher, Classifier::standard());
    let mut pacer = PaceController::new(config.batch_size, config.batch_pause(), config.source_pause());

    info!(
        sources = registry.len(),
        interval_minutes = config.scrape_interval_minutes,
        once,
        "Scraper initialized"
    );

    loop {
        let started = Local::now();
        info!(started = %started.format("%Y-%m-%d %H:%M:%S"), "Scraper run started");

        let cycle = tokio::select! {
            res = pipeline.run_cycle(store, &mut pacer, started.date_naive()) => res,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted during cycle; shutting down");
                return Ok(());
            }
        };

        match cycle {
            Ok(outcome) => {
                log_outcome(&outcome);
                if let Some(dir) = report_dir {
                    if let Err(e) = markdown::write_cycle_report(&outcome, started, dir).await {
                        error!(%dir, error = %e, "Failed to write cycle report");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Scraper run aborted");
                if once {
                    return Err(e.into());
                }
            }
        }

        let elapsed = Local::now() - started;
        info!(
            secs = elapsed.num_seconds(),
            accepted = pacer.accepted(),
            batch_pauses = pacer.batch_pauses(),
            source_pauses = pacer.source_pauses(),
            "Scraper run completed"
        );

        if once {
            return Ok(());
        }

        let interval = config.scrape_interval();
        info!(minutes = config.scrape_interval_minutes, "Waiting before next run");
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Scraper interrupted by user; shutdown complete");
                return Ok(());
            }
        }
    }
}

#[instrument(level = "info", skip_all)]
fn log_outcome(outcome: &CycleOutcome) {
    for (i, a) in outcome.accepted.iter().enumerate() {
        info!(
            index = i + 1,
            keyword = %a.keyword,
            website = %a.website,
            heading = %a.heading,
            link = %a.link,
            "New article"
        );
    }

    let groups = outcome
        .excluded
        .iter()
        .into_group_map_by(|e| e.matched_exclusion.as_str());
    for (keyword, articles) in groups.into_iter().sorted_by_key(|(k, _)| *k) {
        for e in articles {
            info!(
                exclusion = %keyword,
                would_be = %e.would_be,
                website = %e.website,
                heading = %e.heading,
                link = %e.link,
                "Relevant article excluded"
            );
        }
    }

    let totals = outcome.totals();
    info!(
        processed = totals.processed,
        relevant = totals.relevant,
        duplicates = totals.duplicates,
        relevant_but_excluded = totals.excluded,
        malformed = totals.malformed,
        failed_sources = outcome.failed_sources().count(),
        new_articles = outcome.accepted.len(),
        inserted = outcome.inserted.map(|s| s.inserted).unwrap_or(0),
        "Scraping summary"
    );
}

async fn digest(store: &JsonFileStore, args: &DigestArgs) -> Result<(), Box<dyn Error>> {
    let mailer = SmtpMailer::from_args(args)?;
    match send_digest(store, &mailer, &args.subject).await? {
        DigestOutcome::NothingToSend => info!("No new articles to send"),
        DigestOutcome::Sent { delivered, marked } => {
            info!(delivered, marked, "Email sent successfully")
        }
    }
    Ok(())
}
