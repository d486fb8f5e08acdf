//! CLI entry point for the novel importer.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use novel_importer::rules::{SeedOutcome, rules_from_json, rules_to_json};
use novel_importer::{
    Database, DownloadOrchestrator, EngineConfig, ImportOutcome, NovelStore, ParserRule,
    ProgressUpdate, RuleStore, SqliteNovelStore, check_existing_novel, seed_default_rules,
    test_rule,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{FileConfig, default_db_path, load_file_config};
use cli::{Args, Command, RulesCommand};

/// Buffered progress updates before the UI starts dropping them.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_file_config(args.config.as_deref())?;
    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), found = loaded.config.is_some(), "config file resolved");
    }
    let file_config = loaded.config.unwrap_or_default();
    let engine_config = engine_config(&args, &file_config);

    let db_path = args
        .db
        .clone()
        .or_else(|| file_config.db_path.clone())
        .unwrap_or_else(default_db_path);
    let db = open_database(&db_path).await?;

    let rules = RuleStore::new(db.clone());
    match seed_default_rules(&rules).await? {
        SeedOutcome::Seeded(count) => info!(count, "installed default parser rules"),
        SeedOutcome::AddedSmartGeneric => info!("installed missing smart generic rule"),
        SeedOutcome::AlreadyPresent => {}
    }
    let novels = Arc::new(SqliteNovelStore::new(db.clone()));

    let result = run(args, engine_config, &rules, novels).await;
    db.close().await;
    result
}

/// Config file values overlaid by CLI flags.
fn engine_config(args: &Args, file_config: &FileConfig) -> EngineConfig {
    let mut config = file_config.apply_to(EngineConfig::default());
    if let Some(max_concurrent) = args.max_concurrent {
        config.max_concurrent = usize::from(max_concurrent);
    }
    if let Some(max_retries) = args.max_retries {
        config.max_retries = u32::from(max_retries);
    }
    if let Some(delay) = args.chapter_delay {
        config.chapter_delay = Duration::from_millis(delay);
    }
    if args.no_connectivity_check {
        config.connectivity_check = false;
    }
    config
}

async fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    Database::new(path)
        .await
        .with_context(|| format!("Failed to open library '{}'", path.display()))
}

async fn run(
    args: Args,
    config: EngineConfig,
    rules: &RuleStore,
    novels: Arc<SqliteNovelStore>,
) -> Result<()> {
    match args.command {
        Command::Import { url, rule_id } => {
            if let Some(existing) = check_existing_novel(novels.as_ref(), &url).await? {
                if existing.is_complete() {
                    info!(
                        novel_id = existing.novel_id,
                        title = %existing.title,
                        "already imported; importing again as a new copy"
                    );
                } else {
                    warn!(
                        novel_id = existing.novel_id,
                        downloaded = existing.downloaded,
                        total = existing.total,
                        "an earlier import is incomplete; `resume {}` continues it",
                        existing.novel_id
                    );
                }
            }
            let rule = resolve_rule(rules, &url, rule_id).await?;
            let orchestrator = build_orchestrator(&config, novels)?;
            let outcome = with_progress(args.quiet, &orchestrator, |reporter| {
                let orchestrator = Arc::clone(&orchestrator);
                let url = url.clone();
                async move { orchestrator.download_novel(&url, &rule, &reporter).await }
            })
            .await?;
            report_outcome(&outcome);
        }
        Command::Resume {
            novel_id,
            url,
            rule_id,
        } => {
            let url = match url {
                Some(url) => url,
                None => novels
                    .get_novel(novel_id)
                    .await?
                    .and_then(|novel| novel.source_url)
                    .ok_or_else(|| anyhow!("novel {novel_id} has no stored source URL; pass --url"))?,
            };
            let rule = resolve_rule(rules, &url, rule_id).await?;
            let orchestrator = build_orchestrator(&config, novels)?;
            let outcome = with_progress(args.quiet, &orchestrator, |reporter| {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    orchestrator
                        .resume_download(novel_id, &url, &rule, &reporter)
                        .await
                }
            })
            .await?;
            report_outcome(&outcome);
        }
        Command::Status { url } => match check_existing_novel(novels.as_ref(), &url).await? {
            Some(existing) => println!("{}", serde_json::to_string_pretty(&existing)?),
            None => println!("not imported: {url}"),
        },
        Command::Rules { command } => run_rules(command, &config, rules).await?,
    }
    Ok(())
}

async fn run_rules(command: RulesCommand, config: &EngineConfig, rules: &RuleStore) -> Result<()> {
    match command {
        RulesCommand::List { json } => {
            let all = rules.list().await?;
            if json {
                println!("{}", rules_to_json(&all)?);
            } else {
                for rule in &all {
                    println!(
                        "{:>4}  {:<20} {:<16} {}",
                        rule.id.unwrap_or_default(),
                        rule.name,
                        rule.domain_pattern,
                        rule.content_selector
                    );
                }
            }
        }
        RulesCommand::Test { url, rule_id } => {
            let rule = resolve_rule(rules, &url, rule_id).await?;
            let service = config.extraction_service()?;
            let report = test_rule(&service, &rule, &url).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        RulesCommand::Seed => match seed_default_rules(rules).await? {
            SeedOutcome::Seeded(count) => println!("seeded {count} rules"),
            SeedOutcome::AddedSmartGeneric => println!("added the smart generic rule"),
            SeedOutcome::AlreadyPresent => println!("default rules already present"),
        },
        RulesCommand::Add { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read '{}'", file.display()))?;
            let parsed = rules_from_json(&raw)
                .with_context(|| format!("Failed to parse rules in '{}'", file.display()))?;
            for rule in &parsed {
                let id = rules
                    .insert(rule)
                    .await
                    .with_context(|| format!("Failed to add rule '{}'", rule.name))?;
                println!("added rule {id}: {}", rule.name);
            }
        }
        RulesCommand::Remove { id } => {
            rules.delete(id).await?;
            println!("removed rule {id}");
        }
    }
    Ok(())
}

async fn resolve_rule(rules: &RuleStore, url: &str, rule_id: Option<i64>) -> Result<ParserRule> {
    let rule = match rule_id {
        Some(id) => rules
            .get(id)
            .await?
            .ok_or_else(|| anyhow!("rule {id} does not exist"))?,
        None => rules.match_url(url).await?,
    };
    info!(rule = %rule.name, domain = %rule.domain_pattern, "using parser rule");
    Ok(rule)
}

fn build_orchestrator(
    config: &EngineConfig,
    novels: Arc<SqliteNovelStore>,
) -> Result<Arc<DownloadOrchestrator>> {
    let service = config
        .extraction_service()
        .context("Failed to build HTTP client")?;
    let orchestrator = DownloadOrchestrator::new(service, novels as Arc<dyn NovelStore>)
        .with_retry_policy(config.retry_policy())
        .with_politeness(config.politeness());
    Ok(Arc::new(orchestrator))
}

/// Runs a session with a progress bar fed by a channel and Ctrl-C wired to cancellation.
async fn with_progress<F, Fut>(
    quiet: bool,
    orchestrator: &Arc<DownloadOrchestrator>,
    session: F,
) -> Result<ImportOutcome>
where
    F: FnOnce(mpsc::Sender<ProgressUpdate>) -> Fut,
    Fut: std::future::Future<Output = Result<ImportOutcome, novel_importer::ImportError>>,
{
    let (tx, mut rx) = mpsc::channel::<ProgressUpdate>(PROGRESS_CHANNEL_CAPACITY);

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let ui_bar = bar.clone();
    let ui = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            ui_bar.set_length(u64::try_from(update.total).unwrap_or(u64::MAX));
            ui_bar.set_position(u64::try_from(update.current).unwrap_or(u64::MAX));
            ui_bar.set_message(update.title);
        }
    });

    let canceller = Arc::clone(orchestrator);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current chapter");
            canceller.cancel_download();
        }
    });

    let result = session(tx).await;
    ctrl_c.abort();
    // The sender was moved into the session and is dropped by now.
    if let Err(e) = ui.await {
        debug!(error = %e, "progress task ended abnormally");
    }
    bar.finish_and_clear();

    result.map_err(Into::into)
}

fn report_outcome(outcome: &ImportOutcome) {
    info!(
        novel_id = outcome.novel_id,
        state = %outcome.state,
        imported = outcome.chapters_imported,
        persisted = outcome.chapters_persisted,
        total = outcome.total_chapters,
        "import finished"
    );
    println!(
        "novel {}: {} ({} of {} chapters stored)",
        outcome.novel_id, outcome.state, outcome.chapters_persisted, outcome.total_chapters
    );
}
