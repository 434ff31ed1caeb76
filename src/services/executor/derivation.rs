// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Deterministic candidate ordering from the claim's random seed.
//!
//! For each rank the index is `LE32(sha256(seed ‖ version ‖ rank ‖ nonce)[..4]) % len`,
//! bumping the nonce until the index has not been used by an earlier rank.
//! Anyone holding the seed and the pool can recompute the sequence.

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub rank: u32,
    pub pool_index: u32,
    pub mint: Pubkey,
}

fn candidate_index(seed: &[u8; 32], pool_version: u32, rank: u32, nonce: u32, len: u32) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(pool_version.to_le_bytes());
    hasher.update(rank.to_le_bytes());
    hasher.update(nonce.to_le_bytes());
    let digest = hasher.finalize();
    let word = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
    word % len
}

/// Up to `min(count, pool.len())` distinct candidates in rank order.
pub fn derive_candidates(
    seed: &[u8; 32],
    pool_version: u32,
    count: u32,
    pool: &[Pubkey],
) -> Vec<Candidate> {
    let Ok(len) = u32::try_from(pool.len()) else {
        return Vec::new();
    };
    let window = count.min(len);
    let mut used = HashSet::with_capacity(window as usize);
    let mut out = Vec::with_capacity(window as usize);
    for rank in 0..window {
        let mut nonce = 0u32;
        // Terminates: fewer than `len` indices are taken while rank < window.
        let index = loop {
            let idx = candidate_index(seed, pool_version, rank, nonce, len);
            if used.insert(idx) {
                break idx;
            }
            nonce = nonce.wrapping_add(1);
        };
        out.push(Candidate {
            rank,
            pool_index: index,
            mint: pool[index as usize],
        });
    }
    out
}
