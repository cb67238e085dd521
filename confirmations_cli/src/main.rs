//! Command line tooling for a filesystem confirmations ledger.

mod inspect;
mod ledger_args;
mod prune;
mod reset;
mod verify;

use clap::{Parser, Subcommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Arguments::parse();

    match args.command {
        Command::Inspect(args) => inspect::run(args).await,
        Command::Verify(args) => verify::run(args).await,
        Command::Prune(args) => prune::run(args).await,
        Command::Reset(args) => reset::run(args).await,
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Inspect and maintain a confirmations ledger")]
struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize the ledger document without modifying it
    Inspect(inspect::InspectArgs),

    /// Check the signature of every queued confirmation
    Verify(verify::VerifyArgs),

    /// Drop queued confirmations whose signatures do not verify
    Prune(prune::PruneArgs),

    /// Delete every token and queued confirmation
    Reset(reset::ResetArgs),
}
