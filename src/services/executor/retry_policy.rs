// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Two-dimensional retry search for one candidate: slippage tolerance
//! (tightest first) outside, route complexity (largest first) inside.
//! Network-free so the policy can be exercised on its own.

/// Route-complexity position within one slippage level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Complexity {
    /// Index into the max-accounts sequence.
    Limit(usize),
    /// Smallest limit, single-hop routes only.
    DirectOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub slippage_idx: usize,
    pub complexity: Complexity,
}

/// Concrete routing parameters for one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptParams {
    pub slippage_bps: u16,
    pub max_accounts: u16,
    pub direct_only: bool,
}

/// Classified result of one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    SizeError,
    SlippageError,
    Fatal,
    Ambiguous,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Settled,
    Retry(Step),
    /// Every slippage level used up for this candidate.
    Exhausted,
    /// Candidate is not viable; move on.
    Abandon,
    /// Outcome unknown; re-read the claim before doing anything else.
    Verify,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPlan {
    slippage_bps_steps: Vec<u16>,
    max_accounts_steps: Vec<u16>,
}

impl RetryPlan {
    /// Returns `None` when either sequence is empty.
    pub fn new(slippage_bps_steps: Vec<u16>, max_accounts_steps: Vec<u16>) -> Option<Self> {
        if slippage_bps_steps.is_empty() || max_accounts_steps.is_empty() {
            return None;
        }
        Some(Self {
            slippage_bps_steps,
            max_accounts_steps,
        })
    }

    pub fn first(&self) -> Step {
        Step {
            slippage_idx: 0,
            complexity: Complexity::Limit(0),
        }
    }

    pub fn params(&self, step: Step) -> AttemptParams {
        let last = self.max_accounts_steps.len() - 1;
        let slippage_idx = step.slippage_idx.min(self.slippage_bps_steps.len() - 1);
        let slippage_bps = self.slippage_bps_steps[slippage_idx];
        match step.complexity {
            Complexity::Limit(idx) => AttemptParams {
                slippage_bps,
                max_accounts: self.max_accounts_steps[idx.min(last)],
                direct_only: false,
            },
            Complexity::DirectOnly => AttemptParams {
                slippage_bps,
                max_accounts: self.max_accounts_steps[last],
                direct_only: true,
            },
        }
    }

    fn escalate_slippage(&self, step: Step) -> Decision {
        let next = step.slippage_idx + 1;
        if next < self.slippage_bps_steps.len() {
            Decision::Retry(Step {
                slippage_idx: next,
                complexity: Complexity::Limit(0),
            })
        } else {
            Decision::Exhausted
        }
    }

    pub fn next(&self, step: Step, outcome: AttemptOutcome) -> Decision {
        match outcome {
            AttemptOutcome::Success => Decision::Settled,
            AttemptOutcome::Fatal => Decision::Abandon,
            AttemptOutcome::Ambiguous => Decision::Verify,
            AttemptOutcome::SlippageError => self.escalate_slippage(step),
            AttemptOutcome::SizeError => match step.complexity {
                Complexity::Limit(idx) if idx + 1 < self.max_accounts_steps.len() => {
                    Decision::Retry(Step {
                        complexity: Complexity::Limit(idx + 1),
                        ..step
                    })
                }
                Complexity::Limit(_) => Decision::Retry(Step {
                    complexity: Complexity::DirectOnly,
                    ..step
                }),
                Complexity::DirectOnly => self.escalate_slippage(step),
            },
        }
    }

    /// Upper bound on attempts per candidate.
    pub fn max_attempts(&self) -> usize {
        self.slippage_bps_steps.len() * (self.max_accounts_steps.len() + 1)
    }
}
