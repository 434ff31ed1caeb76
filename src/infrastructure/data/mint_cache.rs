// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::time::{Duration, Instant};

use dashmap::DashMap;
use solana_sdk::pubkey::Pubkey;

use crate::domain::error::AppError;
use crate::infrastructure::network::ledger::Ledger;

/// Owner program of a mint; `None` when the account does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintOwner {
    pub program: Option<Pubkey>,
}

impl MintOwner {
    pub fn is_supported(&self) -> bool {
        self.program.as_ref().is_some_and(is_supported_program)
    }
}

pub fn is_supported_program(program: &Pubkey) -> bool {
    *program == spl_token::id() || *program == spl_token_2022::id()
}

/// TTL cache of mint owner programs, filled on demand or by batch prefetch.
#[derive(Debug)]
pub struct MintProgramCache {
    entries: DashMap<Pubkey, (MintOwner, Instant)>,
    ttl: Duration,
}

impl MintProgramCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn fresh(&self, mint: &Pubkey) -> Option<MintOwner> {
        let entry = self.entries.get(mint)?;
        let (owner, stored_at) = *entry;
        (stored_at.elapsed() < self.ttl).then_some(owner)
    }

    pub fn insert(&self, mint: Pubkey, owner: MintOwner) {
        self.entries.insert(mint, (owner, Instant::now()));
    }

    pub async fn owner(&self, ledger: &dyn Ledger, mint: &Pubkey) -> Result<MintOwner, AppError> {
        if let Some(owner) = self.fresh(mint) {
            return Ok(owner);
        }
        let account = ledger.get_account(mint).await?;
        let owner = MintOwner {
            program: account.map(|a| a.owner),
        };
        self.insert(*mint, owner);
        Ok(owner)
    }

    /// Fill every stale or missing entry with one batched read.
    pub async fn prefetch(&self, ledger: &dyn Ledger, mints: &[Pubkey]) -> Result<usize, AppError> {
        let missing: Vec<Pubkey> = mints
            .iter()
            .filter(|m| self.fresh(m).is_none())
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }
        let accounts = ledger.get_multiple_accounts(&missing).await?;
        for (mint, account) in missing.iter().zip(accounts) {
            self.insert(
                *mint,
                MintOwner {
                    program: account.map(|a| a.owner),
                },
            );
        }
        tracing::debug!(target: "mint_cache", fetched = missing.len(), "Prefetched mint owners");
        Ok(missing.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
