use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

/// `kontent-migrate` — export, import, or directly migrate structured
/// content between two environments of the same project (§6).
#[derive(Debug, Parser)]
#[command(name = "kontent-migrate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pull items/assets from a source environment into a local snapshot.
    Export(ExportArgs),
    /// Apply a local snapshot to a target environment.
    Import(ImportArgs),
    /// Export from source and import into target without touching disk.
    Migrate(MigrateArgs),
}

#[derive(Debug, Parser)]
pub struct ExportArgs {
    #[arg(long = "source-environment-id", value_name = "ID")]
    pub source_environment_id: String,

    #[arg(long = "source-api-key", value_name = "KEY")]
    pub source_api_key: String,

    /// Codenames of the content items to export (comma-separated).
    #[arg(long, value_delimiter = ',', required = true)]
    pub items: Vec<String>,

    #[arg(long)]
    pub language: String,

    /// Management API base URL; defaults to Kontent.ai's production API.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    #[arg(long = "items-filename", value_name = "FILE", default_value = "items.json")]
    pub items_filename: PathBuf,

    #[arg(long = "assets-filename", value_name = "FILE", default_value = "assets.zip")]
    pub assets_filename: PathBuf,
}

#[derive(Debug, Parser)]
pub struct ImportArgs {
    #[arg(long = "target-environment-id", value_name = "ID")]
    pub target_environment_id: String,

    #[arg(long = "target-api-key", value_name = "KEY")]
    pub target_api_key: String,

    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    #[arg(long = "items-filename", value_name = "FILE", default_value = "items.json")]
    pub items_filename: PathBuf,

    #[arg(long = "assets-filename", value_name = "FILE", default_value = "assets.zip")]
    pub assets_filename: PathBuf,

    /// Skip the confirmation prompt before writing to the target environment.
    #[arg(long)]
    pub force: bool,

    /// Abort the whole run on the first per-item error instead of
    /// capturing it in the run summary.
    #[arg(long = "fail-on-error")]
    pub fail_on_error: bool,
}

#[derive(Debug, Parser)]
pub struct MigrateArgs {
    #[arg(long = "source-environment-id", value_name = "ID")]
    pub source_environment_id: String,

    #[arg(long = "source-api-key", value_name = "KEY")]
    pub source_api_key: String,

    #[arg(long = "source-base-url", value_name = "URL")]
    pub source_base_url: Option<String>,

    #[arg(long = "target-environment-id", value_name = "ID")]
    pub target_environment_id: String,

    #[arg(long = "target-api-key", value_name = "KEY")]
    pub target_api_key: String,

    #[arg(long = "target-base-url", value_name = "URL")]
    pub target_base_url: Option<String>,

    #[arg(long, value_delimiter = ',', required = true)]
    pub items: Vec<String>,

    #[arg(long)]
    pub language: String,

    #[arg(long)]
    pub force: bool,

    #[arg(long = "fail-on-error")]
    pub fail_on_error: bool,
}
