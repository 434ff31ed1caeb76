// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::constants::MAX_ACCOUNTS_PER_REQUEST;
use crate::domain::error::AppError;
use crate::infrastructure::network::ledger::{
    AccountFilter, Ledger, SignatureState, SimulationReport,
};
use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig,
    RpcSimulateTransactionConfig,
};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ConnectionFactory;

impl ConnectionFactory {
    pub fn rpc(rpc_url: &str) -> Result<RpcLedger, AppError> {
        let url =
            Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;
        let client = RpcClient::new_with_timeout_and_commitment(
            url.to_string(),
            RPC_TIMEOUT,
            CommitmentConfig::confirmed(),
        );
        Ok(RpcLedger::new(Arc::new(client)))
    }
}

/// `Ledger` over JSON-RPC at confirmed commitment.
#[derive(Clone)]
pub struct RpcLedger {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self {
            client,
            commitment: CommitmentConfig::confirmed(),
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

fn to_rpc_filter(filter: &AccountFilter) -> RpcFilterType {
    match filter {
        AccountFilter::DataSize(len) => RpcFilterType::DataSize(*len),
        AccountFilter::Memcmp { offset, bytes } => {
            RpcFilterType::Memcmp(Memcmp::new_raw_bytes(*offset, bytes.clone()))
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, AppError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value)
    }

    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, AppError> {
        let mut out = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_ACCOUNTS_PER_REQUEST) {
            let response = self
                .client
                .get_multiple_accounts_with_commitment(chunk, self.commitment)
                .await?;
            out.extend(response.value);
        }
        Ok(out)
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Account)>, AppError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters.iter().map(to_rpc_filter).collect()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                ..Default::default()
            },
            ..Default::default()
        };
        Ok(self
            .client
            .get_program_accounts_with_config(program_id, config)
            .await?)
    }

    async fn latest_blockhash(&self) -> Result<Hash, AppError> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationReport, AppError> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: false,
            commitment: Some(self.commitment),
            ..Default::default()
        };
        let result = self
            .client
            .simulate_transaction_with_config(tx, config)
            .await?
            .value;
        Ok(SimulationReport {
            err: result.err,
            logs: result.logs.unwrap_or_default(),
            units_consumed: result.units_consumed,
        })
    }

    async fn send(
        &self,
        tx: &VersionedTransaction,
        max_retries: usize,
    ) -> Result<Signature, AppError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            max_retries: Some(max_retries),
            ..Default::default()
        };
        Ok(self.client.send_transaction_with_config(tx, config).await?)
    }

    async fn signature_state(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureState>, AppError> {
        let statuses = self
            .client
            .get_signature_statuses_with_history(&[*signature])
            .await?
            .value;
        let Some(Some(status)) = statuses.into_iter().next() else {
            return Ok(None);
        };
        if let Some(err) = status.err.clone() {
            return Ok(Some(SignatureState::Failed(err)));
        }
        if status.satisfies_commitment(self.commitment) {
            Ok(Some(SignatureState::Confirmed))
        } else {
            Ok(Some(SignatureState::Processed))
        }
    }
}
