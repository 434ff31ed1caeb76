// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use tokio_util::sync::CancellationToken;

use crate::common::time_utils::current_unix;
use crate::domain::error::AppError;
use crate::infrastructure::data::claim_source::ClaimSource;
use crate::infrastructure::network::ledger::Ledger;
use crate::services::executor::assembly::settlement_account;
use crate::services::executor::orchestrator::{ClaimOutcome, Orchestrator};
use crate::services::executor::submission::Submitter;
use crate::services::metrics::ExecutorStats;

/// Tick summary, mostly for logs and single-shot runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub claims: usize,
    pub settled: usize,
    pub errors: usize,
}

pub struct ExecutorService {
    ledger: Arc<dyn Ledger>,
    claims: Arc<dyn ClaimSource>,
    orchestrator: Arc<Orchestrator>,
    submitter: Arc<Submitter>,
    executor: Pubkey,
    poll_interval: Duration,
    stats: Arc<ExecutorStats>,
}

impl ExecutorService {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        claims: Arc<dyn ClaimSource>,
        orchestrator: Arc<Orchestrator>,
        submitter: Arc<Submitter>,
        executor: Pubkey,
        poll_interval: Duration,
    ) -> Self {
        let stats = orchestrator.stats();
        Self {
            ledger,
            claims,
            orchestrator,
            submitter,
            executor,
            poll_interval,
            stats,
        }
    }

    /// Create the executor's USDC settlement account if it is missing.
    pub async fn ensure_settlement_account(&self) -> Result<bool, AppError> {
        let base_mint = self.orchestrator.base_mint();
        let account = settlement_account(&self.executor, &base_mint);
        if self.ledger.get_account(&account).await?.is_some() {
            tracing::debug!(target: "service", %account, "Settlement account present");
            return Ok(false);
        }
        let ix = create_associated_token_account_idempotent(
            &self.executor,
            &self.executor,
            &base_mint,
            &spl_token::id(),
        );
        let submitted = self
            .submitter
            .submit(&[ix], &[])
            .await
            .map_err(|e| AppError::Initialization(format!("settlement account creation: {e}")))?;
        tracing::info!(
            target: "service",
            %account,
            signature = %submitted.signature,
            dry_run = submitted.dry_run,
            "Settlement account created"
        );
        Ok(true)
    }

    pub async fn tick(&self, shutdown: &CancellationToken) -> TickReport {
        ExecutorStats::bump(&self.stats.ticks);
        let mut report = TickReport::default();
        let claims = match self.claims.fetch_ready_claims().await {
            Ok(claims) => claims,
            Err(e) => {
                tracing::error!(target: "service", error = %e, "Failed to fetch ready claims");
                report.errors += 1;
                return report;
            }
        };
        report.claims = claims.len();
        if !claims.is_empty() {
            tracing::info!(target: "service", count = claims.len(), "Ready claims found");
        }

        for claim in &claims {
            if shutdown.is_cancelled() {
                tracing::info!(target: "service", "Shutdown requested; leaving remaining claims for later");
                break;
            }
            ExecutorStats::bump(&self.stats.claims_seen);
            match self.orchestrator.process_claim(claim, current_unix()).await {
                Ok(outcome) => {
                    if matches!(outcome, ClaimOutcome::Settled { .. }) {
                        report.settled += 1;
                    }
                    tracing::debug!(target: "service", round = claim.round_id, ?outcome, "Claim processed");
                }
                Err(e) => {
                    ExecutorStats::bump(&self.stats.claim_errors);
                    report.errors += 1;
                    tracing::error!(
                        target: "service",
                        round = claim.round_id,
                        winner = %claim.winner,
                        error = %e,
                        "Claim processing failed"
                    );
                }
            }
        }
        report
    }

    /// Startup housekeeping, then ticks until `shutdown` fires (or once).
    pub async fn run(&self, shutdown: CancellationToken, once: bool) -> Result<(), AppError> {
        if let Err(e) = self.ensure_settlement_account().await {
            tracing::error!(target: "service", error = %e, "Settlement account check failed");
        }
        loop {
            let report = self.tick(&shutdown).await;
            tracing::info!(
                target: "service",
                claims = report.claims,
                settled = report.settled,
                errors = report.errors,
                "Tick complete"
            );
            if once {
                break;
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        tracing::info!(target: "service", "Executor loop stopped");
        Ok(())
    }
}
