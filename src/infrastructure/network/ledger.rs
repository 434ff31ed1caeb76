// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::error::AppError;
use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{TransactionError, VersionedTransaction};

/// Program-account scan filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountFilter {
    DataSize(u64),
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl AccountFilter {
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::DataSize(len) => data.len() as u64 == *len,
            AccountFilter::Memcmp { offset, bytes } => data
                .get(*offset..offset.saturating_add(bytes.len()))
                .is_some_and(|window| window == bytes.as_slice()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SimulationReport {
    pub err: Option<TransactionError>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

/// Authoritative status of a sent signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureState {
    /// Seen by the cluster but not yet at confirmed commitment.
    Processed,
    Confirmed,
    Failed(TransactionError),
}

/// The ledger operations the executor needs; one RPC-backed implementation
/// in production, in-memory fakes in tests.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, AppError>;

    /// Batched read; the result is positionally aligned with `addresses`.
    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, AppError>;

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Account)>, AppError>;

    async fn latest_blockhash(&self) -> Result<Hash, AppError>;

    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationReport, AppError>;

    /// Send without preflight; the node rebroadcasts up to `max_retries` times.
    async fn send(&self, tx: &VersionedTransaction, max_retries: usize)
    -> Result<Signature, AppError>;

    async fn signature_state(&self, signature: &Signature)
    -> Result<Option<SignatureState>, AppError>;
}
