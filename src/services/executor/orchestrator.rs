// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;

use crate::domain::claim::{Claim, ClaimStatus};
use crate::domain::error::AppError;
use crate::infrastructure::data::claim_source::ClaimSource;
use crate::infrastructure::data::mint_cache::MintProgramCache;
use crate::infrastructure::data::reward_pool::RewardPool;
use crate::infrastructure::network::ledger::Ledger;
use crate::services::executor::assembly::{Assembler, BuildError, BuiltTransaction, ClaimContext};
use crate::services::executor::derivation::{Candidate, derive_candidates};
use crate::services::executor::fallback::{FallbackOutcome, FallbackTrigger};
use crate::services::executor::retry_policy::{AttemptOutcome, Decision, RetryPlan};
use crate::services::executor::submission::{SubmitError, Submitted, Submitter};
use crate::services::metrics::ExecutorStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementKind {
    Base,
    Swap,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    PoolVersionMismatch { claim: u32, loaded: u32 },
    ZeroPayout,
}

/// What happened to one claim during one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    Skipped(SkipReason),
    Settled {
        candidate: Candidate,
        kind: SettlementKind,
        submitted: Submitted,
    },
    /// An ambiguous send was followed by a status re-read showing the claim moved on.
    AlreadyAdvanced(Option<ClaimStatus>),
    /// Ambiguous send and the claim could not be re-read; stop until next tick.
    Unverified,
    Fallback(FallbackOutcome),
}

enum CandidateResult {
    Settled(Submitted),
    Stop(ClaimOutcome),
    Next,
}

pub struct Orchestrator {
    ledger: Arc<dyn Ledger>,
    claims: Arc<dyn ClaimSource>,
    pool: Arc<RewardPool>,
    plan: RetryPlan,
    mint_cache: Arc<MintProgramCache>,
    assembler: Arc<Assembler>,
    submitter: Arc<Submitter>,
    fallback: FallbackTrigger,
    stats: Arc<ExecutorStats>,
}

impl Orchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        claims: Arc<dyn ClaimSource>,
        pool: Arc<RewardPool>,
        plan: RetryPlan,
        mint_cache: Arc<MintProgramCache>,
        assembler: Arc<Assembler>,
        submitter: Arc<Submitter>,
        stats: Arc<ExecutorStats>,
    ) -> Self {
        let fallback = FallbackTrigger::new(assembler.clone(), submitter.clone(), stats.clone());
        Self {
            ledger,
            claims,
            pool,
            plan,
            mint_cache,
            assembler,
            submitter,
            fallback,
            stats,
        }
    }

    pub fn base_mint(&self) -> Pubkey {
        self.assembler.base_mint()
    }

    pub fn stats(&self) -> Arc<ExecutorStats> {
        self.stats.clone()
    }

    pub async fn process_claim(
        &self,
        claim: &Claim,
        now_unix: i64,
    ) -> Result<ClaimOutcome, AppError> {
        if claim.pool_version != self.pool.version {
            ExecutorStats::bump(&self.stats.skipped);
            tracing::warn!(
                target: "orchestrator",
                round = claim.round_id,
                winner = %claim.winner,
                claim_pool = claim.pool_version,
                loaded_pool = self.pool.version,
                "Reward pool version mismatch; skipping claim"
            );
            return Ok(ClaimOutcome::Skipped(SkipReason::PoolVersionMismatch {
                claim: claim.pool_version,
                loaded: self.pool.version,
            }));
        }

        let ctx = self.assembler.load_context(claim).await?;
        let Some(payout) = ctx.payout else {
            ExecutorStats::bump(&self.stats.skipped);
            tracing::warn!(
                target: "orchestrator",
                round = claim.round_id,
                winner = %claim.winner,
                total = ctx.round.total_usdc,
                vrf_reimbursement = ctx.round.pending_vrf_reimbursement(),
                fee_bps = ctx.config.fee_bps,
                "Recomputed payout is zero; aborting claim"
            );
            return Ok(ClaimOutcome::Skipped(SkipReason::ZeroPayout));
        };
        if payout != claim.payout_raw {
            tracing::warn!(
                target: "orchestrator",
                round = claim.round_id,
                recorded = claim.payout_raw,
                recomputed = payout,
                "Recorded payout differs from live fee rate; using recomputed amount"
            );
        }

        let candidates = derive_candidates(
            &claim.randomness,
            claim.pool_version,
            u32::from(claim.candidate_window),
            self.pool.mints(),
        );
        tracing::info!(
            target: "orchestrator",
            round = claim.round_id,
            winner = %claim.winner,
            payout,
            candidates = candidates.len(),
            "Processing degen claim"
        );

        let base_mint = self.assembler.base_mint();
        let routed: Vec<Pubkey> = candidates
            .iter()
            .map(|c| c.mint)
            .filter(|m| *m != base_mint)
            .collect();
        if let Err(e) = self.mint_cache.prefetch(self.ledger.as_ref(), &routed).await {
            tracing::debug!(target: "orchestrator", error = %e, "Mint owner prefetch failed");
        }

        for candidate in &candidates {
            let (result, kind) = if candidate.mint == base_mint {
                (self.run_base(&ctx, candidate, payout).await, SettlementKind::Base)
            } else {
                (self.run_swap(&ctx, candidate, payout).await, SettlementKind::Swap)
            };
            match result {
                CandidateResult::Settled(submitted) => {
                    match kind {
                        SettlementKind::Base => ExecutorStats::bump(&self.stats.settled_base),
                        SettlementKind::Swap => ExecutorStats::bump(&self.stats.settled_swap),
                    }
                    tracing::info!(
                        target: "orchestrator",
                        round = claim.round_id,
                        winner = %claim.winner,
                        rank = candidate.rank,
                        mint = %candidate.mint,
                        signature = %submitted.signature,
                        dry_run = submitted.dry_run,
                        "Claim settled"
                    );
                    return Ok(ClaimOutcome::Settled {
                        candidate: *candidate,
                        kind,
                        submitted,
                    });
                }
                CandidateResult::Stop(outcome) => return Ok(outcome),
                CandidateResult::Next => {}
            }
        }

        tracing::warn!(
            target: "orchestrator",
            round = claim.round_id,
            winner = %claim.winner,
            "All candidates exhausted"
        );
        Ok(ClaimOutcome::Fallback(
            self.fallback.trigger(&ctx, now_unix).await,
        ))
    }

    async fn run_base(&self, ctx: &ClaimContext, candidate: &Candidate, payout: u64) -> CandidateResult {
        let built = self.assembler.build_base(ctx, candidate, payout).await;
        let (outcome, submitted) = self.execute(candidate, built).await;
        match outcome {
            AttemptOutcome::Success => submitted.map_or(CandidateResult::Next, CandidateResult::Settled),
            AttemptOutcome::Ambiguous => self.verify(ctx).await,
            _ => CandidateResult::Next,
        }
    }

    async fn run_swap(&self, ctx: &ClaimContext, candidate: &Candidate, payout: u64) -> CandidateResult {
        let owner = match self.mint_cache.owner(self.ledger.as_ref(), &candidate.mint).await {
            Ok(owner) => owner,
            Err(e) => {
                tracing::warn!(target: "orchestrator", mint = %candidate.mint, error = %e, "Mint lookup failed; next candidate");
                return CandidateResult::Next;
            }
        };
        let Some(token_program) = owner.program.filter(|_| owner.is_supported()) else {
            tracing::warn!(
                target: "orchestrator",
                mint = %candidate.mint,
                owner = ?owner.program,
                "Mint is not owned by a token program; next candidate"
            );
            return CandidateResult::Next;
        };

        let mut step = self.plan.first();
        loop {
            let params = self.plan.params(step);
            tracing::debug!(
                target: "orchestrator",
                rank = candidate.rank,
                mint = %candidate.mint,
                slippage_bps = params.slippage_bps,
                max_accounts = params.max_accounts,
                direct_only = params.direct_only,
                "Attempt"
            );
            let built = self
                .assembler
                .build_swap(ctx, candidate, &token_program, payout, params)
                .await;
            let (outcome, submitted) = self.execute(candidate, built).await;
            match self.plan.next(step, outcome) {
                Decision::Settled => {
                    return submitted.map_or(CandidateResult::Next, CandidateResult::Settled);
                }
                Decision::Retry(next) => step = next,
                Decision::Verify => return self.verify(ctx).await,
                Decision::Exhausted | Decision::Abandon => return CandidateResult::Next,
            }
        }
    }

    async fn execute(
        &self,
        candidate: &Candidate,
        built: Result<BuiltTransaction, BuildError>,
    ) -> (AttemptOutcome, Option<Submitted>) {
        let built = match built {
            Ok(built) => built,
            Err(e) => {
                ExecutorStats::bump(&self.stats.failed_attempts);
                tracing::warn!(target: "orchestrator", mint = %candidate.mint, error = %e, "Could not assemble attempt");
                return (AttemptOutcome::Fatal, None);
            }
        };
        match self
            .submitter
            .submit(&built.instructions, &built.lookup_tables)
            .await
        {
            Ok(submitted) => (AttemptOutcome::Success, Some(submitted)),
            Err(e) => {
                let outcome = match &e {
                    SubmitError::Size(_) => AttemptOutcome::SizeError,
                    SubmitError::Slippage { .. } => AttemptOutcome::SlippageError,
                    SubmitError::Fatal(_) => AttemptOutcome::Fatal,
                    SubmitError::Ambiguous(_) => AttemptOutcome::Ambiguous,
                };
                if outcome == AttemptOutcome::Ambiguous {
                    ExecutorStats::bump(&self.stats.ambiguous);
                } else {
                    ExecutorStats::bump(&self.stats.failed_attempts);
                }
                tracing::info!(target: "orchestrator", mint = %candidate.mint, error = %e, ?outcome, "Attempt failed");
                (outcome, None)
            }
        }
    }

    /// Re-read the claim after an ambiguous outcome.
    async fn verify(&self, ctx: &ClaimContext) -> CandidateResult {
        match self.claims.claim_status(&ctx.claim).await {
            Ok(Some(ClaimStatus::VrfReady)) => {
                tracing::info!(target: "orchestrator", claim = %ctx.claim.address, "Claim still ready after ambiguous send; next candidate");
                CandidateResult::Next
            }
            Ok(status) => {
                tracing::info!(target: "orchestrator", claim = %ctx.claim.address, ?status, "Claim advanced after ambiguous send; stopping");
                CandidateResult::Stop(ClaimOutcome::AlreadyAdvanced(status))
            }
            Err(e) => {
                tracing::warn!(target: "orchestrator", claim = %ctx.claim.address, error = %e, "Claim re-read failed; deferring to next tick");
                CandidateResult::Stop(ClaimOutcome::Unverified)
            }
        }
    }
}
