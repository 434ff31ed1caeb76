// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use clap::Parser;
use degen_executor::common::data_path::resolve_required_data_path;
use degen_executor::common::parsing::{parse_bytes32_hex, parse_pubkey};
use degen_executor::domain::claim::Claim;
use degen_executor::domain::error::AppError;
use degen_executor::infrastructure::data::reward_pool::RewardPool;
use degen_executor::infrastructure::network::ledger::Ledger;
use degen_executor::infrastructure::network::provider::ConnectionFactory;
use degen_executor::services::executor::derivation::derive_candidates;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recompute the candidate sequence for a seed or a live claim")]
struct Cli {
    /// Reward pool file (relative paths resolve inside the data directory)
    #[arg(long, default_value = "pools/mainnet.json")]
    pool: String,

    /// 32-byte seed as hex
    #[arg(long, conflicts_with = "claim")]
    seed: Option<String>,

    /// Pool version to derive against (defaults to the pool file's version)
    #[arg(long)]
    pool_version: Option<u32>,

    /// Candidate window
    #[arg(long, default_value_t = 10)]
    window: u32,

    /// Read seed, version and window from this claim account instead
    #[arg(long, requires = "rpc_url")]
    claim: Option<String>,

    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let pool_path = resolve_required_data_path(&cli.pool, None)?;
    let pool = RewardPool::load_from_file(&pool_path.to_string_lossy())?;

    let (seed, version, window) = match (&cli.claim, &cli.seed) {
        (Some(raw), _) => {
            let address = parse_pubkey(raw).ok_or_else(|| AppError::Validation {
                field: "claim".to_string(),
                message: format!("'{raw}' is not a base58 public key"),
            })?;
            let rpc_url = cli.rpc_url.as_deref().unwrap_or_default();
            let ledger = ConnectionFactory::rpc(rpc_url)?;
            let account = ledger
                .get_account(&address)
                .await?
                .ok_or_else(|| AppError::Validation {
                    field: "claim".to_string(),
                    message: format!("account {address} not found"),
                })?;
            let claim = Claim::decode(address, &account.data)?;
            (
                claim.randomness,
                claim.pool_version,
                u32::from(claim.candidate_window),
            )
        }
        (None, Some(raw)) => {
            let seed = parse_bytes32_hex(raw).ok_or_else(|| AppError::Validation {
                field: "seed".to_string(),
                message: "expected 64 hex characters".to_string(),
            })?;
            (seed, cli.pool_version.unwrap_or(pool.version), cli.window)
        }
        (None, None) => {
            return Err(AppError::Config(
                "either --seed or --claim is required".to_string(),
            ));
        }
    };

    if version != pool.version {
        eprintln!(
            "warning: deriving for pool version {version}, file {} is version {}",
            pool_path.display(),
            pool.version
        );
    }

    for candidate in derive_candidates(&seed, version, window, pool.mints()) {
        println!(
            "{}",
            json!({
                "rank": candidate.rank,
                "pool_index": candidate.pool_index,
                "mint": candidate.mint.to_string(),
            })
        );
    }
    Ok(())
}
