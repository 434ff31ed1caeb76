// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime counters for the executor; rendered by the metrics endpoint.
#[derive(Debug, Default)]
pub struct ExecutorStats {
    pub ticks: AtomicU64,
    pub claims_seen: AtomicU64,
    pub settled_swap: AtomicU64,
    pub settled_base: AtomicU64,
    pub fallbacks_submitted: AtomicU64,
    pub fallbacks_pending: AtomicU64,
    pub skipped: AtomicU64,
    pub failed_attempts: AtomicU64,
    pub ambiguous: AtomicU64,
    pub claim_errors: AtomicU64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub claims_seen: u64,
    pub settled_swap: u64,
    pub settled_base: u64,
    pub fallbacks_submitted: u64,
    pub fallbacks_pending: u64,
    pub skipped: u64,
    pub failed_attempts: u64,
    pub ambiguous: u64,
    pub claim_errors: u64,
}

impl ExecutorStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            claims_seen: self.claims_seen.load(Ordering::Relaxed),
            settled_swap: self.settled_swap.load(Ordering::Relaxed),
            settled_base: self.settled_base.load(Ordering::Relaxed),
            fallbacks_submitted: self.fallbacks_submitted.load(Ordering::Relaxed),
            fallbacks_pending: self.fallbacks_pending.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            ambiguous: self.ambiguous.load(Ordering::Relaxed),
            claim_errors: self.claim_errors.load(Ordering::Relaxed),
        }
    }

    pub fn render_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            concat!(
                "# TYPE executor_ticks counter\nexecutor_ticks {}\n",
                "# TYPE executor_claims_seen counter\nexecutor_claims_seen {}\n",
                "# TYPE executor_settled counter\n",
                "executor_settled{{kind=\"swap\"}} {}\n",
                "executor_settled{{kind=\"base\"}} {}\n",
                "executor_settled{{kind=\"fallback\"}} {}\n",
                "# TYPE executor_fallbacks_pending counter\nexecutor_fallbacks_pending {}\n",
                "# TYPE executor_skipped counter\nexecutor_skipped {}\n",
                "# TYPE executor_failed_attempts counter\nexecutor_failed_attempts {}\n",
                "# TYPE executor_ambiguous counter\nexecutor_ambiguous {}\n",
                "# TYPE executor_claim_errors counter\nexecutor_claim_errors {}\n"
            ),
            s.ticks,
            s.claims_seen,
            s.settled_swap,
            s.settled_base,
            s.fallbacks_submitted,
            s.fallbacks_pending,
            s.skipped,
            s.failed_attempts,
            s.ambiguous,
            s.claim_errors
        )
    }
}
