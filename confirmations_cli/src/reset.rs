//! Reset the ledger to empty.

use std::io::Write;

use anyhow::Result;

use crate::ledger_args::LedgerArgs;

/// Arguments for the reset command.
#[derive(Debug, clap::Parser)]
pub(crate) struct ResetArgs {
    #[command(flatten)]
    pub(crate) ledger: LedgerArgs,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub(crate) yes: bool,
}

/// Run the reset command.
///
/// Nothing is written until the user confirms. A document that cannot be
/// loaded is deleted outright and replaced with an empty one.
pub(crate) async fn run(args: ResetArgs) -> Result<()> {
    println!("Ledger: {}", args.ledger.data_dir.join(&args.ledger.key).display());

    match args.ledger.read_document().await {
        Ok(None) => {
            println!("No ledger document, nothing to reset.");
            return Ok(());
        }
        Ok(Some((document, _))) => {
            println!("  Failed confirmations: {}", document.failed_confirmations.len());
            println!("  Confirmation tokens:  {}", document.confirmation_tokens.len());
            println!("  Payment tokens:       {}", document.payment_tokens.len());
        }
        Err(err) => println!("  Unreadable: {err:#}"),
    }

    if !args.yes {
        println!();
        print!("Are you sure you want to delete every token and confirmation? [y/N] ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let mut ledger = match args.ledger.open().await {
        Ok(ledger) => ledger,
        Err(err) => {
            tracing::warn!(err = %format!("{err:#}"), "ledger cannot be loaded, deleting it");
            args.ledger.delete_document().await?;
            args.ledger.open().await?
        }
    };

    ledger.reset().await?;
    tracing::info!("ledger reset");
    println!("Ledger reset.");
    Ok(())
}
