pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod errors;
pub mod http;
pub mod rate_limiter;
pub mod services;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use cli::Cli;
use colored::Colorize;
use log::info;

use crate::api::Aoe2NetClient;
use crate::cli::{BackfillArgs, Command, UpdateArgs};
use crate::config::settings::IngestSettings;
use crate::config::{AppConfig, VersionTable};
use crate::database::{MatchStore, MatchTable};
use crate::domain::clock::{format_ts, last_week_breakpoint, parse_day};
use crate::services::cursor::resume_point;
use crate::services::{BackfillService, BackfillSummary, IngestSummary, IngestWindow, IngestionService};

const WEEK_SECS: i64 = 7 * 24 * 60 * 60;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_init() -> Result<()> {
    let config = AppConfig::from_env()?;
    let store = MatchStore::open(&config.database)?;
    info!("Schema ready in {}", config.database.path);
    println!(
        "{} {} ranked / {} unranked rows",
        "Database ready:".green().bold(),
        store.count_rows(MatchTable::Ranked)?,
        store.count_rows(MatchTable::Unranked)?
    );
    Ok(())
}

pub fn handle_update(args: &UpdateArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let versions = load_versions(args.versions.as_deref())?;
    let store = MatchStore::open(&config.database)?;
    let latest = store.max_started(MatchTable::Ranked)?;
    let window = plan_window(args, latest, &config.ingest, Utc::now())?;

    let runtime = build_runtime()?;
    let summary = runtime.block_on(async {
        let client = Aoe2NetClient::new(&config.api)?;
        let mut service = IngestionService::new(client, store, &versions, config.ingest.clone());
        service.run(window).await
    })?;

    print_update_summary(&summary);
    Ok(())
}

pub fn handle_backfill(args: &BackfillArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let versions = load_versions(args.versions.as_deref())?;
    let profile_ids = collect_profile_ids(args)?;
    let store = MatchStore::open(&config.database)?;

    let runtime = build_runtime()?;
    let summary = runtime.block_on(async {
        let client = Aoe2NetClient::new(&config.api)?;
        let mut service = BackfillService::new(client, store, &versions, config.backfill.clone());
        service.run(&profile_ids).await
    })?;

    print_backfill_summary(&summary);
    Ok(())
}

pub fn handle_completions(shell: Shell) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}

// --- Helper Methods ---

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn load_versions(path: Option<&Path>) -> Result<VersionTable> {
    let table = match path {
        Some(path) => VersionTable::from_json_file(path)?,
        None => VersionTable::default(),
    };
    info!("Loaded {} game versions", table.len());
    Ok(table)
}

/// Explicit flags win; `--lw` fills in a week ending at the breakpoint;
/// otherwise the run resumes from the store.
fn plan_window(
    args: &UpdateArgs,
    latest: Option<i64>,
    settings: &IngestSettings,
    now: DateTime<Utc>,
) -> Result<IngestWindow> {
    let mut end = match (args.end_ts, args.end.as_deref()) {
        (Some(ts), _) => Some(ts),
        (None, Some(day)) => Some(parse_day(day)?),
        (None, None) => None,
    };
    let mut fallback_start = None;
    if args.last_week {
        let breakpoint = last_week_breakpoint(now).timestamp();
        end = Some(breakpoint);
        fallback_start = Some(breakpoint - WEEK_SECS);
    }

    let start = match (args.start_ts, args.start.as_deref()) {
        (Some(ts), _) => ts,
        (None, Some(day)) => parse_day(day)?,
        (None, None) => fallback_start.unwrap_or_else(|| resume_point(latest, now.timestamp(), settings)),
    };

    if let Some(end) = end.filter(|end| *end < start) {
        bail!("End {} is before start {}", format_ts(end), format_ts(start));
    }

    Ok(IngestWindow {
        start,
        end,
        now: now.timestamp(),
    })
}

fn collect_profile_ids(args: &BackfillArgs) -> Result<Vec<i64>> {
    let mut ids = args.profile_ids.clone();
    if let Some(path) = &args.players_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read players file {}", path.display()))?;
        ids.extend(parse_profile_ids(&raw)?);
    }
    if ids.is_empty() {
        bail!("No players given, use --profile-id or --players-file");
    }
    Ok(ids)
}

fn parse_profile_ids(raw: &str) -> Result<Vec<i64>> {
    raw.lines()
        .enumerate()
        .map(|(idx, line)| (idx, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(idx, line)| {
            line.parse::<i64>()
                .with_context(|| format!("Invalid profile id {line:?} on line {}", idx + 1))
        })
        .collect()
}

fn print_update_summary(summary: &IngestSummary) {
    println!(
        "{} {} pages, {} matches accepted, {} new ranked rows, {} new unranked rows",
        "Update finished:".green().bold(),
        summary.pages,
        summary.accepted,
        summary.ranked.rows,
        summary.unranked.rows
    );
    println!("  next run would continue near {}", format_ts(summary.last_start));
    if summary.gaps > 0 {
        println!("  {} {} coverage gaps re-scanned", "Note:".yellow(), summary.gaps);
    }
    if summary.rejections.total() > 0 {
        println!("  {} {}", "Dropped:".yellow(), summary.rejections);
    }
}

fn print_backfill_summary(summary: &BackfillSummary) {
    println!(
        "{} {} players, {} pages, {} new ranked rows, {} new unranked rows",
        "Backfill finished:".green().bold(),
        summary.players.len(),
        summary.pages(),
        summary.ranked_rows(),
        summary.unranked_rows()
    );
}
