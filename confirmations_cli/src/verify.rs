//! Verify queued confirmations.

use anyhow::{Result, bail};
use confirmations_core::verifier::ConfirmationVerifier;
use confirmations_crypto::memory::Blake3TokenCrypto;

use crate::ledger_args::LedgerArgs;

/// Arguments for the verify command.
#[derive(Debug, clap::Parser)]
pub(crate) struct VerifyArgs {
    #[command(flatten)]
    pub(crate) ledger: LedgerArgs,
}

/// Run the verify command.
///
/// Signatures are checked with the development keyed-MAC backend.
pub(crate) async fn run(args: VerifyArgs) -> Result<()> {
    let Some((document, _)) = args.ledger.read_document().await? else {
        println!("No ledger document, nothing to verify.");
        return Ok(());
    };

    let verifier = ConfirmationVerifier::new(Blake3TokenCrypto::new());
    let mut failed = 0usize;
    for confirmation in &document.failed_confirmations {
        if verifier.verify(confirmation) {
            println!("ok      {}", confirmation.id);
        } else {
            println!("INVALID {}", confirmation.id);
            failed += 1;
        }
    }

    let total = document.failed_confirmations.len();
    println!("{} of {total} confirmations verified", total - failed);

    if failed > 0 {
        bail!("{failed} confirmations failed verification");
    }
    Ok(())
}
