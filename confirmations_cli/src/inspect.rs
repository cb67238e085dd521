//! Summarize a ledger document.

use anyhow::Result;

use crate::ledger_args::LedgerArgs;

/// Arguments for the inspect command.
#[derive(Debug, clap::Parser)]
pub(crate) struct InspectArgs {
    #[command(flatten)]
    pub(crate) ledger: LedgerArgs,

    /// List every queued confirmation
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

/// Run the inspect command.
pub(crate) async fn run(args: InspectArgs) -> Result<()> {
    let Some((document, dropped)) = args.ledger.read_document().await? else {
        println!(
            "No ledger document at {}",
            args.ledger.data_dir.join(&args.ledger.key).display()
        );
        return Ok(());
    };

    println!("Issuers:               {}", document.issuers.len());
    println!("Failed confirmations:  {}", document.failed_confirmations.len());
    println!("Confirmation tokens:   {}", document.confirmation_tokens.len());
    println!("Payment tokens:        {}", document.payment_tokens.len());

    if dropped.total() > 0 {
        println!();
        println!("Invalid entries (dropped on next load):");
        println!("  Confirmations:       {}", dropped.confirmations);
        println!("  Confirmation tokens: {}", dropped.confirmation_tokens);
        println!("  Payment tokens:      {}", dropped.payment_tokens);
    }

    if args.verbose {
        println!();
        for confirmation in &document.failed_confirmations {
            let created_at = confirmation
                .created_at
                .map_or_else(|| "-".to_owned(), |ts| ts.to_string());
            println!(
                "{}  {:<10} {:<20} created_at={created_at}",
                confirmation.id,
                confirmation.confirmation_type.as_str(),
                confirmation.ad_type.as_str()
            );
        }
    }

    Ok(())
}
