// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::instruction::{Instruction, InstructionError};
use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::message::{VersionedMessage, v0};
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{TransactionError, VersionedTransaction};
use thiserror::Error;
use tokio::time::{Instant, sleep};

use crate::domain::constants::{MAX_TRANSACTION_BYTES, is_slippage_error_code};
use crate::infrastructure::network::ledger::{Ledger, SignatureState};

/// Closed set of submission failures the orchestrator switches on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("transaction too large: {0}")]
    Size(String),

    #[error("output threshold violated (custom error {code})")]
    Slippage { code: u32 },

    #[error("attempt failed: {0}")]
    Fatal(String),

    /// Sent, but neither confirmation nor authoritative status resolved it.
    #[error("outcome unknown for {0}")]
    Ambiguous(Signature),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Submitted {
    pub signature: Signature,
    pub dry_run: bool,
}

#[derive(Clone, Debug)]
pub struct SubmitSettings {
    pub dry_run: bool,
    pub send_max_retries: usize,
    pub confirm_timeout: Duration,
    pub confirm_poll: Duration,
    pub status_poll_attempts: usize,
    pub status_poll_backoff: Duration,
}

pub struct Submitter {
    ledger: Arc<dyn Ledger>,
    signer: Arc<Keypair>,
    settings: SubmitSettings,
}

/// Map a simulation or execution error onto the submission taxonomy.
pub fn classify_transaction_error(err: &TransactionError) -> SubmitError {
    match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code))
            if is_slippage_error_code(*code) =>
        {
            SubmitError::Slippage { code: *code }
        }
        TransactionError::TooManyAccountLocks => SubmitError::Size(err.to_string()),
        other => SubmitError::Fatal(other.to_string()),
    }
}

/// Compile, sign and size-check without touching the network.
pub fn compile_transaction(
    signer: &Keypair,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
    blockhash: solana_sdk::hash::Hash,
) -> Result<(VersionedTransaction, usize), SubmitError> {
    let message = v0::Message::try_compile(&signer.pubkey(), instructions, lookup_tables, blockhash)
        .map_err(|e| SubmitError::Size(format!("compile: {e}")))?;
    let tx = VersionedTransaction::try_new(VersionedMessage::V0(message), &[signer])
        .map_err(|e| SubmitError::Fatal(format!("sign: {e}")))?;
    let size = bincode::serialized_size(&tx)
        .map_err(|e| SubmitError::Fatal(format!("serialize: {e}")))? as usize;
    if size > MAX_TRANSACTION_BYTES {
        return Err(SubmitError::Size(format!(
            "{size} bytes exceeds {MAX_TRANSACTION_BYTES}"
        )));
    }
    Ok((tx, size))
}

impl Submitter {
    pub fn new(ledger: Arc<dyn Ledger>, signer: Arc<Keypair>, settings: SubmitSettings) -> Self {
        Self {
            ledger,
            signer,
            settings,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.settings.dry_run
    }

    pub async fn submit(
        &self,
        instructions: &[Instruction],
        lookup_tables: &[AddressLookupTableAccount],
    ) -> Result<Submitted, SubmitError> {
        let blockhash = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(|e| SubmitError::Fatal(format!("blockhash: {e}")))?;
        let (tx, size) = compile_transaction(&self.signer, instructions, lookup_tables, blockhash)?;
        let signature = tx.signatures[0];

        let report = self
            .ledger
            .simulate(&tx)
            .await
            .map_err(|e| SubmitError::Fatal(format!("simulate: {e}")))?;
        if let Some(err) = report.err.as_ref() {
            let classified = classify_transaction_error(err);
            tracing::debug!(
                target: "submit",
                error = %err,
                logs = report.logs.len(),
                tail = report.logs.last().map(String::as_str).unwrap_or(""),
                "Simulation rejected transaction"
            );
            return Err(classified);
        }

        if self.settings.dry_run {
            tracing::info!(
                target: "submit",
                %signature,
                size,
                units = report.units_consumed.unwrap_or_default(),
                instructions = instructions.len(),
                "Dry run: would send transaction"
            );
            return Ok(Submitted {
                signature,
                dry_run: true,
            });
        }

        match self.ledger.send(&tx, self.settings.send_max_retries).await {
            Ok(sent) => {
                tracing::info!(target: "submit", signature = %sent, size, "Transaction sent");
            }
            Err(e) => {
                // The node may still have forwarded it; reconcile by signature.
                tracing::warn!(target: "submit", %signature, error = %e, "Send failed; reconciling status");
                return self.reconcile(signature).await;
            }
        }

        let deadline = Instant::now() + self.settings.confirm_timeout;
        while Instant::now() < deadline {
            match self.ledger.signature_state(&signature).await {
                Ok(Some(SignatureState::Confirmed)) => {
                    return Ok(Submitted {
                        signature,
                        dry_run: false,
                    });
                }
                Ok(Some(SignatureState::Failed(err))) => {
                    return Err(SubmitError::Fatal(format!("{signature} failed: {err}")));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(target: "submit", %signature, error = %e, "Status poll failed");
                }
            }
            sleep(self.settings.confirm_poll).await;
        }

        tracing::warn!(target: "submit", %signature, "Confirmation timed out; polling authoritative status");
        self.reconcile(signature).await
    }

    async fn reconcile(&self, signature: Signature) -> Result<Submitted, SubmitError> {
        let attempts = self.settings.status_poll_attempts.max(1);
        for attempt in 1..=attempts {
            match self.ledger.signature_state(&signature).await {
                Ok(Some(SignatureState::Confirmed)) => {
                    return Ok(Submitted {
                        signature,
                        dry_run: false,
                    });
                }
                Ok(Some(SignatureState::Failed(err))) => {
                    return Err(SubmitError::Fatal(format!("{signature} failed: {err}")));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(target: "submit", %signature, attempt, error = %e, "Status poll failed");
                }
            }
            if attempt < attempts {
                sleep(self.settings.status_poll_backoff).await;
            }
        }
        Err(SubmitError::Ambiguous(signature))
    }
}
