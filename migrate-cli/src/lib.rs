//! Thin CLI front-end over `migrate-core`: argument parsing, snapshot file
//! I/O, and terminal progress rendering. All migration semantics live in
//! `migrate-core`; this crate only talks to disk, stdin/stdout, and the
//! management API's HTTP transport.

pub mod args;
mod commands;
mod progress;
mod snapshot;

pub use args::Cli;
pub use args::Command;

use anyhow::Result;

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Export(args) => commands::run_export(args).await,
        Command::Import(args) => commands::run_import(args).await,
        Command::Migrate(args) => commands::run_migrate(args).await,
    }
}
