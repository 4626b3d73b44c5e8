//! Command-line interface definitions for the news tracker.
//!
//! All arguments can be provided via command-line flags or environment variables.

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the tracker.
///
/// # Examples
///
/// ```sh
/// # Scrape forever, one cycle every `scrape_interval_minutes`
/// finnews_tracker --store ./articles.json scrape
///
/// # A single cycle with a markdown report
/// finnews_tracker --report-dir ./reports scrape --once
///
/// # Mail every unsent article
/// finnews_tracker digest --smtp-server smtp.office365.com --sender-email me@corp.com
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML file with scraper tunables
    #[arg(short, long, env = "FINNEWS_CONFIG", global = true)]
    pub config: Option<String>,

    /// Path to the JSON article store
    #[arg(short, long, env = "FINNEWS_STORE", default_value = "articles.json", global = true)]
    pub store: String,

    /// Directory for per-cycle Markdown reports (disabled when unset)
    #[arg(short, long, env = "FINNEWS_REPORT_DIR", global = true)]
    pub report_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape all sources, classify headlines and store new articles
    Scrape {
        /// Run a single cycle instead of looping on the configured interval
        #[arg(long)]
        once: bool,
    },
    /// Mail a digest of every article not yet sent and flag them as sent
    Digest(DigestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DigestArgs {
    #[arg(long, env = "SMTP_SERVER")]
    pub smtp_server: String,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "SENDER_EMAIL")]
    pub sender_email: String,

    #[arg(long, env = "SENDER_PASSWORD", hide_env_values = true)]
    pub sender_password: String,

    /// Comma-separated list of recipients
    #[arg(long, env = "RECIPIENT_EMAILS", value_delimiter = ',', required = true)]
    pub recipients: Vec<String>,

    /// Comma-separated list of CC recipients
    #[arg(long, env = "CC_EMAILS", value_delimiter = ',')]
    pub cc: Vec<String>,

    #[arg(long, default_value = "IPO & M&A News Alert")]
    pub subject: String,
}
