//! Markdown rendering of a scraping cycle.
//!
//! A report lists the accepted articles, then the relevant-but-excluded ones
//! grouped by the exclusion keyword that suppressed them, then the per-source
//! counters. It is meant for spotting vocabulary drift and broken selectors.

use crate::pipeline::CycleOutcome;
use chrono::{DateTime, Local};
use itertools::Itertools;
use std::error::Error;
use std::fmt::Write;
use tokio::fs;
use tracing::{info, instrument};

fn cell(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Convert a [`CycleOutcome`] to a Markdown report.
///
/// # Arguments
///
/// * `outcome` - Result of one scraping cycle
/// * `started` - Local start time, shown in the report header
///
/// # Returns
///
/// A Markdown string with the accepted table, excluded articles grouped by
/// exclusion keyword, and a per-source counter table with a totals row.
pub fn cycle_to_markdown(outcome: &CycleOutcome, started: DateTime<Local>) -> String {
    let mut md = String::new();
    let _ = writeln!(
        md,
        "# Scraping cycle {}\n",
        started.format("%Y-%m-%d %H:%M:%S")
    );

    let _ = writeln!(md, "## New articles ({})\n", outcome.accepted.len());
    if outcome.accepted.is_empty() {
        let _ = writeln!(md, "No new articles found.\n");
    } else {
        let _ = writeln!(md, "| # | Keyword | Website | Heading |");
        let _ = writeln!(md, "|---|---------|---------|---------|");
        for (i, a) in outcome.accepted.iter().enumerate() {
            let _ = writeln!(
                md,
                "| {} | {} | {} | [{}]({}) |",
                i + 1,
                a.keyword,
                cell(&a.website),
                cell(&a.heading),
                a.link
            );
        }
        md.push('\n');
    }

    let _ = writeln!(
        md,
        "## Relevant but excluded ({})\n",
        outcome.excluded.len()
    );
    if outcome.excluded.is_empty() {
        let _ = writeln!(md, "No relevant articles were excluded.\n");
    } else {
        let groups = outcome
            .excluded
            .iter()
            .into_group_map_by(|e| e.matched_exclusion.clone());
        for (keyword, articles) in groups.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
            let _ = writeln!(md, "### `{}` ({})\n", keyword, articles.len());
            for e in articles {
                let _ = writeln!(
                    md,
                    "- {} | would have been {}: [{}]({})",
                    e.website, e.would_be, e.heading, e.link
                );
            }
            md.push('\n');
        }
    }

    let totals = outcome.totals();
    let _ = writeln!(md, "## Sources\n");
    let _ = writeln!(
        md,
        "| Source | Processed | Relevant | Duplicates | Excluded | Malformed | Status |"
    );
    let _ = writeln!(
        md,
        "|--------|-----------|----------|------------|----------|-----------|--------|"
    );
    for s in outcome.sources.iter().chain(std::iter::once(&totals)) {
        let status = match &s.fetch_error {
            Some(e) => format!("failed: {}", cell(e)),
            None => "ok".to_string(),
        };
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} | {} |",
            cell(&s.source),
            s.processed,
            s.relevant,
            s.duplicates,
            s.excluded,
            s.malformed,
            status
        );
    }
    md
}

/// Write the report for one cycle into `report_dir`, returning its path.
///
/// The directory is created if missing and the file is named after `started`
/// (`YYYY-MM-DD_HHMMSS.md`).
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be
/// written.
#[instrument(level = "info", skip_all, fields(%report_dir))]
pub async fn write_cycle_report(
    outcome: &CycleOutcome,
    started: DateTime<Local>,
    report_dir: &str,
) -> Result<String, Box<dyn Error>> {
    fs::create_dir_all(report_dir).await?;
    let path = format!(
        "{}/{}.md",
        report_dir.trim_end_matches('/'),
        started.format("%Y-%m-%d_%H%M%S")
    );
    fs::write(&path, cycle_to_markdown(outcome, started)).await?;
    info!(%path, "Wrote cycle report");
    Ok(path)
}
