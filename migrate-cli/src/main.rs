use clap::Parser;
use migrate_cli::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = migrate_cli::run(Cli::parse()).await {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}
