use anyhow::Result;
use colored::Colorize;

use aoe2stats::cli::Command;
use aoe2stats::{handle_backfill, handle_completions, handle_init, handle_update, interpret};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("{} {e:#}", "Error:".red().bold());
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let command = interpret();
    execute_command(&command)
}

fn execute_command(command: &Command) -> Result<()> {
    match command {
        Command::Init => handle_init(),
        Command::Update(args) => handle_update(args),
        Command::Backfill(args) => handle_backfill(args),
        Command::Completions { shell } => handle_completions(*shell),
    }
}
