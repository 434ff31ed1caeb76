// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::error::AppError;
use crate::domain::program::{ANCHOR_DISCRIMINATOR_LEN, AccountReader, account_discriminator};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

pub const DEGEN_CLAIM_ACCOUNT: &str = "DegenClaim";
pub const CLAIM_ACCOUNT_LEN: usize = ANCHOR_DISCRIMINATOR_LEN + 340;
/// Byte offset of the status field (after discriminator, round, winner and round id).
pub const CLAIM_STATUS_OFFSET: usize = ANCHOR_DISCRIMINATOR_LEN + 32 + 32 + 8;

/// Lifecycle of a degen claim as recorded by the issuing program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ClaimStatus {
    VrfRequested = 1,
    #[default]
    VrfReady = 2,
    Executing = 3,
    ClaimedSwapped = 4,
    ClaimedFallback = 5,
}

impl ClaimStatus {
    pub fn from_byte(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::VrfRequested),
            2 => Some(Self::VrfReady),
            3 => Some(Self::Executing),
            4 => Some(Self::ClaimedSwapped),
            5 => Some(Self::ClaimedFallback),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// True once an execution has started or settled.
    pub fn is_past_ready(self) -> bool {
        self > Self::VrfReady
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::VrfRequested => "vrf_requested",
            Self::VrfReady => "vrf_ready",
            Self::Executing => "executing",
            Self::ClaimedSwapped => "claimed_swapped",
            Self::ClaimedFallback => "claimed_fallback",
        };
        f.write_str(label)
    }
}

/// One winner's degen-mode payout request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Claim {
    pub address: Pubkey,
    pub round: Pubkey,
    pub winner: Pubkey,
    pub round_id: u64,
    pub status: ClaimStatus,
    pub bump: u8,
    pub selected_candidate_rank: u8,
    pub fallback_reason: u8,
    pub token_index: u32,
    pub pool_version: u32,
    pub candidate_window: u8,
    pub requested_at: i64,
    pub fulfilled_at: i64,
    pub claimed_at: i64,
    pub fallback_after_ts: i64,
    /// Amount recorded by the randomness callback; execution recomputes it.
    pub payout_raw: u64,
    pub min_out_raw: u64,
    pub receiver_pre_balance: u64,
    pub token_mint: Pubkey,
    pub executor: Pubkey,
    pub receiver_token_ata: Pubkey,
    pub randomness: [u8; 32],
    pub route_hash: [u8; 32],
}

impl Claim {
    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self, AppError> {
        let mut reader = AccountReader::new(address, data);
        reader.expect_discriminator(&account_discriminator(DEGEN_CLAIM_ACCOUNT))?;
        let round = reader.pubkey()?;
        let winner = reader.pubkey()?;
        let round_id = reader.u64()?;
        let raw_status = reader.u8()?;
        let status = ClaimStatus::from_byte(raw_status).ok_or_else(|| AppError::Decode {
            account: address.to_string(),
            reason: format!("unknown claim status {raw_status}"),
        })?;
        let bump = reader.u8()?;
        let selected_candidate_rank = reader.u8()?;
        let fallback_reason = reader.u8()?;
        let token_index = reader.u32()?;
        let pool_version = reader.u32()?;
        let candidate_window = reader.u8()?;
        reader.skip(7)?;
        let claim = Self {
            address,
            round,
            winner,
            round_id,
            status,
            bump,
            selected_candidate_rank,
            fallback_reason,
            token_index,
            pool_version,
            candidate_window,
            requested_at: reader.i64()?,
            fulfilled_at: reader.i64()?,
            claimed_at: reader.i64()?,
            fallback_after_ts: reader.i64()?,
            payout_raw: reader.u64()?,
            min_out_raw: reader.u64()?,
            receiver_pre_balance: reader.u64()?,
            token_mint: reader.pubkey()?,
            executor: reader.pubkey()?,
            receiver_token_ata: reader.pubkey()?,
            randomness: reader.bytes32()?,
            route_hash: reader.bytes32()?,
        };
        reader.skip(32)?;
        Ok(claim)
    }

    /// Serialize into the on-ledger layout.
    pub fn to_account_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CLAIM_ACCOUNT_LEN);
        out.extend_from_slice(&account_discriminator(DEGEN_CLAIM_ACCOUNT));
        out.extend_from_slice(self.round.as_ref());
        out.extend_from_slice(self.winner.as_ref());
        out.extend_from_slice(&self.round_id.to_le_bytes());
        out.push(self.status.as_byte());
        out.push(self.bump);
        out.push(self.selected_candidate_rank);
        out.push(self.fallback_reason);
        out.extend_from_slice(&self.token_index.to_le_bytes());
        out.extend_from_slice(&self.pool_version.to_le_bytes());
        out.push(self.candidate_window);
        out.extend_from_slice(&[0u8; 7]);
        for ts in [
            self.requested_at,
            self.fulfilled_at,
            self.claimed_at,
            self.fallback_after_ts,
        ] {
            out.extend_from_slice(&ts.to_le_bytes());
        }
        out.extend_from_slice(&self.payout_raw.to_le_bytes());
        out.extend_from_slice(&self.min_out_raw.to_le_bytes());
        out.extend_from_slice(&self.receiver_pre_balance.to_le_bytes());
        out.extend_from_slice(self.token_mint.as_ref());
        out.extend_from_slice(self.executor.as_ref());
        out.extend_from_slice(self.receiver_token_ata.as_ref());
        out.extend_from_slice(&self.randomness);
        out.extend_from_slice(&self.route_hash);
        out.resize(CLAIM_ACCOUNT_LEN, 0);
        out
    }

    pub fn fallback_due(&self, now_unix: i64) -> bool {
        now_unix >= self.fallback_after_ts
    }
}
