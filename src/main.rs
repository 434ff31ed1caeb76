// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use clap::Parser;
use degen_executor::app::config::{GlobalSettings, load_executor_keypair};
use degen_executor::app::logging::setup_logging;
use degen_executor::common::metrics::spawn_metrics_server;
use degen_executor::domain::error::AppError;
use degen_executor::domain::program::{ConfigAccount, DegenConfigAccount, ProgramAddresses};
use degen_executor::infrastructure::data::claim_source::{ClaimSource, LedgerClaimSource};
use degen_executor::infrastructure::data::mint_cache::MintProgramCache;
use degen_executor::infrastructure::data::reward_pool::RewardPool;
use degen_executor::infrastructure::network::ledger::Ledger;
use degen_executor::infrastructure::network::provider::ConnectionFactory;
use degen_executor::infrastructure::network::router::{JupiterClient, RouteProvider};
use degen_executor::services::executor::assembly::{Assembler, ComputeBudgetFallback};
use degen_executor::services::executor::retry_policy::RetryPlan;
use degen_executor::services::executor::submission::{SubmitSettings, Submitter};
use degen_executor::services::executor::{ExecutorService, Orchestrator};
use degen_executor::services::metrics::ExecutorStats;
use solana_sdk::signature::Signer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about = "degen reward executor")]
struct Cli {
    /// Path to config file (default: config.{toml,...} with THIS_ACTIVE = true)
    #[arg(long)]
    config: Option<String>,

    /// Run a single tick and exit
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Simulate every transaction, never send
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Metrics port (overrides config/env)
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    // No subscriber exists until settings are known.
    let settings = match GlobalSettings::load_with_path(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("degen-executor: {e}");
            std::process::exit(1);
        }
    };
    setup_logging(if settings.debug { "debug" } else { "info" }, settings.log_json);
    if let Err(e) = run(cli, settings).await {
        tracing::error!(target: "service", error = %e, "Fatal startup error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut settings: GlobalSettings) -> Result<(), AppError> {

    if cli.dry_run {
        settings.dry_run = true;
    }
    if cli.once {
        settings.run_once = true;
    }
    if let Some(port) = cli.metrics_port {
        settings.metrics_port = port;
    }

    let keypair_path = settings.executor_keypair_path_value();
    let signer = Arc::new(load_executor_keypair(&keypair_path)?);
    let executor = signer.pubkey();
    let program_id = settings.program_pubkey()?;
    let addresses = ProgramAddresses::new(program_id);

    let pool_path = settings.reward_pool_path()?;
    let pool = Arc::new(RewardPool::load_from_file(&pool_path)?);

    let ledger: Arc<dyn Ledger> = Arc::new(ConnectionFactory::rpc(&settings.rpc_url)?);
    let router: Arc<dyn RouteProvider> = Arc::new(
        JupiterClient::new(
            settings.jupiter_api_url_value(),
            settings.jupiter_api_key_value(),
            settings.quote_timeout(),
            settings.routing_max_attempts_value(),
        )
        .map_err(|e| AppError::Routing(e.to_string()))?,
    );

    let config_address = addresses.config();
    let degen_config_address = addresses.degen_config();
    let fetched = ledger
        .get_multiple_accounts(&[config_address, degen_config_address])
        .await?;
    let mut fetched = fetched.into_iter();
    let config = match fetched.next().flatten() {
        Some(account) => ConfigAccount::decode(config_address, &account.data)?,
        None => {
            return Err(AppError::Initialization(format!(
                "Program config {config_address} not found on {}",
                settings.cluster
            )));
        }
    };
    let degen_config = match fetched.next().flatten() {
        Some(account) => DegenConfigAccount::decode(degen_config_address, &account.data)?,
        None => {
            return Err(AppError::Initialization(format!(
                "Degen config {degen_config_address} not found on {}",
                settings.cluster
            )));
        }
    };
    if degen_config.executor != executor {
        tracing::warn!(
            target: "config",
            configured = %degen_config.executor,
            %executor,
            "Keypair is not the program's registered executor; executions will be rejected"
        );
    }
    if config.paused {
        tracing::warn!(target: "config", "Program is paused");
    }
    let base_mint = config.usdc_mint;

    tracing::info!(
        target: "config",
        cluster = %settings.cluster,
        rpc = %settings.rpc_url,
        program = %program_id,
        %executor,
        %base_mint,
        treasury = %config.treasury_usdc_ata,
        fee_bps = config.fee_bps,
        fallback_timeout_sec = degen_config.fallback_timeout_sec,
        pool = %pool_path,
        pool_version = pool.version,
        pool_size = pool.len(),
        pool_has_base = pool.contains(&base_mint),
        router = %settings.jupiter_api_url_value(),
        slippage_steps = ?settings.slippage_bps_steps,
        max_accounts_steps = ?settings.max_accounts_steps,
        dry_run = settings.dry_run,
        run_once = settings.run_once,
        "Executor configured"
    );

    let plan = RetryPlan::new(
        settings.slippage_bps_steps.clone(),
        settings.max_accounts_steps.clone(),
    )
    .ok_or_else(|| AppError::Config("retry sequences must not be empty".to_string()))?;

    let stats = Arc::new(ExecutorStats::default());
    let claims: Arc<dyn ClaimSource> =
        Arc::new(LedgerClaimSource::new(ledger.clone(), program_id));
    let submitter = Arc::new(Submitter::new(
        ledger.clone(),
        signer.clone(),
        SubmitSettings {
            dry_run: settings.dry_run,
            send_max_retries: settings.send_max_retries,
            confirm_timeout: settings.confirm_timeout(),
            confirm_poll: settings.confirm_poll(),
            status_poll_attempts: settings.status_poll_attempts_value(),
            status_poll_backoff: settings.status_poll_backoff(),
        },
    ));
    let assembler = Arc::new(Assembler::new(
        ledger.clone(),
        router,
        addresses,
        executor,
        base_mint,
        ComputeBudgetFallback {
            unit_limit: settings.compute_unit_limit_fallback,
            unit_price: settings.compute_unit_price_fallback,
        },
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        ledger.clone(),
        claims.clone(),
        pool,
        plan,
        Arc::new(MintProgramCache::new(settings.mint_cache_ttl())),
        assembler,
        submitter.clone(),
        stats.clone(),
    ));
    let service = ExecutorService::new(
        ledger,
        claims,
        orchestrator,
        submitter,
        executor,
        settings.poll_interval(),
    );

    let shutdown = CancellationToken::new();
    if settings.metrics_port != 0 {
        spawn_metrics_server(settings.metrics_port, stats, shutdown.clone()).await;
    }
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "service", "Ctrl-C received; finishing current claim");
            signal_token.cancel();
        }
    });

    let result = service.run(shutdown.clone(), settings.run_once).await;
    shutdown.cancel();
    result
}
