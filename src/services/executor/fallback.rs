// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use std::sync::Arc;

use crate::services::executor::assembly::{Assembler, ClaimContext};
use crate::services::executor::submission::{SubmitError, Submitted, Submitter};
use crate::services::metrics::ExecutorStats;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// Deadline still ahead; the claim is revisited next tick.
    NotDue { remaining_secs: i64 },
    Submitted(Submitted),
    Failed(SubmitError),
}

/// Base-asset settlement for claims whose candidates are all exhausted.
pub struct FallbackTrigger {
    assembler: Arc<Assembler>,
    submitter: Arc<Submitter>,
    stats: Arc<ExecutorStats>,
}

impl FallbackTrigger {
    pub fn new(assembler: Arc<Assembler>, submitter: Arc<Submitter>, stats: Arc<ExecutorStats>) -> Self {
        Self {
            assembler,
            submitter,
            stats,
        }
    }

    pub async fn trigger(&self, ctx: &ClaimContext, now_unix: i64) -> FallbackOutcome {
        let claim = &ctx.claim;
        if !claim.fallback_due(now_unix) {
            let remaining_secs = claim.fallback_after_ts - now_unix;
            ExecutorStats::bump(&self.stats.fallbacks_pending);
            tracing::info!(
                target: "fallback",
                round = claim.round_id,
                winner = %claim.winner,
                remaining_secs,
                "Candidates exhausted; fallback deadline not reached"
            );
            return FallbackOutcome::NotDue { remaining_secs };
        }

        let instructions = self.assembler.build_fallback(ctx);
        match self.submitter.submit(&instructions, &[]).await {
            Ok(submitted) => {
                ExecutorStats::bump(&self.stats.fallbacks_submitted);
                tracing::info!(
                    target: "fallback",
                    round = claim.round_id,
                    winner = %claim.winner,
                    signature = %submitted.signature,
                    dry_run = submitted.dry_run,
                    "Fallback settlement submitted"
                );
                FallbackOutcome::Submitted(submitted)
            }
            Err(e) => {
                tracing::error!(
                    target: "fallback",
                    round = claim.round_id,
                    winner = %claim.winner,
                    error = %e,
                    "Fallback settlement failed; retrying next tick"
                );
                FallbackOutcome::Failed(e)
            }
        }
    }
}
