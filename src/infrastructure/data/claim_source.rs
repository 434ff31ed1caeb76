// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::domain::claim::{
    CLAIM_ACCOUNT_LEN, CLAIM_STATUS_OFFSET, Claim, ClaimStatus, DEGEN_CLAIM_ACCOUNT,
};
use crate::domain::error::AppError;
use crate::domain::program::account_discriminator;
use crate::infrastructure::network::ledger::{AccountFilter, Ledger};

/// Where ready claims come from and how a single claim is re-read.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    /// Every claim currently in `VrfReady`, ordered by request time.
    async fn fetch_ready_claims(&self) -> Result<Vec<Claim>, AppError>;

    /// Authoritative status of one claim; `None` once the account is gone.
    async fn claim_status(&self, claim: &Claim) -> Result<Option<ClaimStatus>, AppError>;
}

pub struct LedgerClaimSource {
    ledger: Arc<dyn Ledger>,
    program_id: Pubkey,
}

impl LedgerClaimSource {
    pub fn new(ledger: Arc<dyn Ledger>, program_id: Pubkey) -> Self {
        Self { ledger, program_id }
    }

    pub fn ready_filters() -> Vec<AccountFilter> {
        vec![
            AccountFilter::DataSize(CLAIM_ACCOUNT_LEN as u64),
            AccountFilter::Memcmp {
                offset: 0,
                bytes: account_discriminator(DEGEN_CLAIM_ACCOUNT).to_vec(),
            },
            AccountFilter::Memcmp {
                offset: CLAIM_STATUS_OFFSET,
                bytes: vec![ClaimStatus::VrfReady.as_byte()],
            },
        ]
    }
}

#[async_trait]
impl ClaimSource for LedgerClaimSource {
    async fn fetch_ready_claims(&self) -> Result<Vec<Claim>, AppError> {
        let accounts = self
            .ledger
            .get_program_accounts(&self.program_id, &Self::ready_filters())
            .await?;
        let mut claims = Vec::with_capacity(accounts.len());
        for (address, account) in accounts {
            match Claim::decode(address, &account.data) {
                Ok(claim) if claim.status == ClaimStatus::VrfReady => claims.push(claim),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(target: "claims", %address, error = %e, "Skipping undecodable claim account");
                }
            }
        }
        claims.sort_by_key(|c| (c.requested_at, c.round_id));
        Ok(claims)
    }

    async fn claim_status(&self, claim: &Claim) -> Result<Option<ClaimStatus>, AppError> {
        let Some(account) = self.ledger.get_account(&claim.address).await? else {
            return Ok(None);
        };
        if account.data.is_empty() {
            return Ok(None);
        }
        Ok(Some(Claim::decode(claim.address, &account.data)?.status))
    }
}
