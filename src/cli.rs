use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Age of Empires II match ingestion")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Create the match tables if they do not exist
    Init,
    /// Fetch new matches from aoe2.net into the database
    Update(UpdateArgs),
    /// Re-fetch the full match history of specific players
    Backfill(BackfillArgs),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Default)]
pub struct UpdateArgs {
    /// Start date (YYYY-MM-DD, UTC). Defaults to shortly before the newest stored match
    #[arg(long, conflicts_with = "start_ts")]
    pub start: Option<String>,
    /// Start as a unix timestamp
    #[arg(long)]
    pub start_ts: Option<i64>,
    /// End date (YYYY-MM-DD, UTC). Without an end the run follows the live stream
    #[arg(long, conflicts_with = "end_ts")]
    pub end: Option<String>,
    /// End as a unix timestamp
    #[arg(long)]
    pub end_ts: Option<i64>,
    /// Last full week, ending at the most recent Wednesday 01:00 UTC
    #[arg(long = "lw", conflicts_with_all = ["end", "end_ts"])]
    pub last_week: bool,
    /// JSON file mapping game versions to release dates
    #[arg(long)]
    pub versions: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq, Default)]
pub struct BackfillArgs {
    /// Player profile id (repeatable)
    #[arg(long = "profile-id")]
    pub profile_ids: Vec<i64>,
    /// File with one profile id per line
    #[arg(long)]
    pub players_file: Option<PathBuf>,
    /// JSON file mapping game versions to release dates
    #[arg(long)]
    pub versions: Option<PathBuf>,
}
