//! Drop unverifiable confirmations from the retry queue.

use anyhow::Result;
use confirmations_core::verifier::ConfirmationVerifier;
use confirmations_crypto::memory::Blake3TokenCrypto;

use crate::ledger_args::LedgerArgs;

/// Arguments for the prune command.
#[derive(Debug, clap::Parser)]
pub(crate) struct PruneArgs {
    #[command(flatten)]
    pub(crate) ledger: LedgerArgs,

    /// Report what would be pruned without writing
    #[arg(short = 'n', long)]
    pub(crate) dry_run: bool,
}

/// Run the prune command.
///
/// Loading the ledger already discards malformed records; saving it back
/// makes that permanent. Each queued confirmation is then judged on its own,
/// so an invalid entry sharing an id with a valid one never takes the valid
/// one with it. A missing document is left missing.
pub(crate) async fn run(args: PruneArgs) -> Result<()> {
    let Some((document, dropped)) = args.ledger.read_document().await? else {
        println!("No ledger document, nothing to prune.");
        return Ok(());
    };

    let verifier = ConfirmationVerifier::new(Blake3TokenCrypto::new());

    if args.dry_run {
        let invalid: Vec<_> = document
            .failed_confirmations
            .iter()
            .filter(|c| !verifier.verify(c))
            .collect();
        for confirmation in &invalid {
            println!("would prune {}", confirmation.id);
        }
        println!(
            "Dry run: {} unverifiable and {} malformed records would be pruned.",
            invalid.len(),
            dropped.total()
        );
        return Ok(());
    }

    let mut ledger = args.ledger.open().await?;
    let mut pruned = Vec::new();
    let removed = ledger
        .retain_failed_confirmations(|c| {
            let keep = verifier.verify(c);
            if !keep {
                pruned.push(c.id.clone());
            }
            keep
        })
        .await?;

    // Nothing was rewritten by the retain, so persist the malformed-record drop
    if removed == 0 && dropped.total() > 0 {
        ledger.save().await;
    }

    for id in &pruned {
        println!("pruned {id}");
    }
    tracing::info!(removed, malformed = dropped.total(), "pruned confirmations");
    println!(
        "Pruned {removed} unverifiable and {} malformed records.",
        dropped.total()
    );
    Ok(())
}
