//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Import web novels into a local library using per-site parser rules.
#[derive(Parser, Debug)]
#[command(name = "novel-importer")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/novel-importer/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite library file (overrides `db_path` from the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Maximum concurrent requests (1-50)
    #[arg(short = 'c', long, global = true, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub max_concurrent: Option<u8>,

    /// Retries per chapter for transient failures (0-5)
    #[arg(short = 'r', long, global = true, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub max_retries: Option<u8>,

    /// Minimum delay between requests to the same host in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, global = true, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub chapter_delay: Option<u64>,

    /// Skip the connectivity probe before requests
    #[arg(long, global = true)]
    pub no_connectivity_check: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a novel from its landing page
    Import {
        /// Novel landing page URL
        url: String,
        /// Use this rule instead of matching one by host
        #[arg(long)]
        rule_id: Option<i64>,
    },
    /// Continue an interrupted import
    Resume {
        /// Id of the stored novel
        novel_id: i64,
        /// Landing page URL (defaults to the novel's stored source URL)
        #[arg(long)]
        url: Option<String>,
        /// Use this rule instead of matching one by host
        #[arg(long)]
        rule_id: Option<i64>,
    },
    /// Show whether a landing page was imported before and how far it got
    Status {
        url: String,
    },
    /// Manage parser rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// List stored rules
    List {
        /// Print rules as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dry-run a rule against a landing page
    Test {
        url: String,
        /// Rule to test (defaults to the rule matched for the URL)
        #[arg(long)]
        rule_id: Option<i64>,
    },
    /// Insert the default rules into an empty store
    Seed,
    /// Import rules from a JSON file
    Add {
        /// JSON array of rules
        file: PathBuf,
    },
    /// Delete a rule
    Remove {
        id: i64,
    },
}
