// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::collections::HashSet;
use std::fs;
use std::str::FromStr;

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::domain::error::AppError;

/// Ordered, versioned list of reward-asset mints. Index order is part of
/// the candidate derivation and must match the on-ledger pool version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardPool {
    pub version: u32,
    mints: Vec<Pubkey>,
}

#[derive(Deserialize)]
struct PoolFile {
    version: u32,
    mints: Vec<String>,
}

impl RewardPool {
    pub fn new(version: u32, mints: Vec<Pubkey>) -> Result<Self, AppError> {
        if mints.is_empty() {
            return Err(AppError::Validation {
                field: "reward_pool.mints".to_string(),
                message: "pool is empty".to_string(),
            });
        }
        let mut seen = HashSet::with_capacity(mints.len());
        for mint in &mints {
            if !seen.insert(*mint) {
                return Err(AppError::Validation {
                    field: "reward_pool.mints".to_string(),
                    message: format!("duplicate mint {mint}"),
                });
            }
        }
        Ok(Self { version, mints })
    }

    pub fn load_from_file(path: &str) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read reward pool {path}: {e}")))?;
        Self::from_json(&raw).map_err(|e| match e {
            AppError::Config(msg) => AppError::Config(format!("{path}: {msg}")),
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let file: PoolFile = serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("Invalid reward pool JSON: {e}")))?;
        let mints = file
            .mints
            .iter()
            .map(|s| {
                Pubkey::from_str(s.trim())
                    .map_err(|e| AppError::Config(format!("Invalid mint '{s}' in reward pool: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(file.version, mints)
    }

    pub fn len(&self) -> usize {
        self.mints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pubkey> {
        self.mints.get(index)
    }

    pub fn mints(&self) -> &[Pubkey] {
        &self.mints
    }

    pub fn contains(&self, mint: &Pubkey) -> bool {
        self.mints.contains(mint)
    }
}
