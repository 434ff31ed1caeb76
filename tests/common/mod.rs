// SPDX-License-Identifier: MIT
// In-memory ledger, router and claim source used by the integration tests

//! In-memory ledger, router and claim source used by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use degen_executor::domain::claim::{Claim, ClaimStatus};
use degen_executor::domain::constants::{MAINNET_USDC_MINT, VRF_REIMBURSEMENT_USDC};
use degen_executor::domain::error::AppError;
use degen_executor::domain::program::{
    ConfigAccount, DegenConfigAccount, ProgramAddresses, RoundAccount, instruction_discriminator,
};
use degen_executor::infrastructure::data::claim_source::ClaimSource;
use degen_executor::infrastructure::data::mint_cache::MintProgramCache;
use degen_executor::infrastructure::data::reward_pool::RewardPool;
use degen_executor::infrastructure::network::ledger::{
    AccountFilter, Ledger, SignatureState, SimulationReport,
};
use degen_executor::infrastructure::network::router::{
    Quote, QuoteRequest, RouteError, RouteProvider, SwapInstructions,
};
use degen_executor::services::executor::assembly::{Assembler, ComputeBudgetFallback};
use degen_executor::services::executor::retry_policy::RetryPlan;
use degen_executor::services::executor::submission::{SubmitSettings, Submitter};
use degen_executor::services::executor::Orchestrator;
use degen_executor::services::metrics::ExecutorStats;
use serde_json::json;
use solana_sdk::account::Account;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{TransactionError, VersionedTransaction};
use spl_token::solana_program::program_pack::Pack;
use spl_token::solana_program::system_program;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ROUND_ID: u64 = 17;
pub const BASE_MINT: Pubkey = MAINNET_USDC_MINT;
/// 1,000 USDC pot.
pub const ROUND_TOTAL: u64 = 1_000_000_000;
pub const FEE_BPS: u16 = 500;
/// Pot minus 5% fee minus the unpaid VRF reimbursement.
pub const PAYOUT: u64 = 950_000_000 - VRF_REIMBURSEMENT_USDC;
/// Compute-unit limit the fake router asks for.
pub const ROUTER_CU_LIMIT: u32 = 600_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusMode {
    /// Every sent signature is confirmed on the first poll.
    Confirm,
    /// The cluster never reports the signature.
    Silent,
}

pub struct FakeLedger {
    pub accounts: Mutex<HashMap<Pubkey, Account>>,
    pub sim_errors: Mutex<VecDeque<Option<TransactionError>>>,
    pub sent: Mutex<Vec<VersionedTransaction>>,
    pub simulated: Mutex<usize>,
    pub status_mode: Mutex<StatusMode>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            sim_errors: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            simulated: Mutex::new(0),
            status_mode: Mutex::new(StatusMode::Confirm),
        }
    }

    pub fn put(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(
            address,
            Account {
                lamports: 1_000_000,
                data,
                owner,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    /// Store an initialized SPL token account holding `amount`.
    pub fn put_token_account(&self, address: Pubkey, mint: Pubkey, owner: Pubkey, amount: u64) {
        let state = spl_token::state::Account {
            mint,
            owner,
            amount,
            state: spl_token::state::AccountState::Initialized,
            ..spl_token::state::Account::default()
        };
        let mut data = vec![0u8; spl_token::state::Account::LEN];
        state.pack_into_slice(&mut data);
        self.put(address, spl_token::id(), data);
    }

    pub fn push_sim_error(&self, err: Option<TransactionError>) {
        self.sim_errors.lock().unwrap().push_back(err);
    }

    pub fn set_status_mode(&self, mode: StatusMode) {
        *self.status_mode.lock().unwrap() = mode;
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Instructions of the `index`-th sent transaction, in message order.
    pub fn sent_instructions(&self, index: usize) -> Vec<SentInstruction> {
        let sent = self.sent.lock().unwrap();
        let tx = &sent[index];
        let keys = tx.message.static_account_keys();
        let key = |i: u8| keys.get(i as usize).copied().unwrap_or_default();
        tx.message
            .instructions()
            .iter()
            .map(|ix| SentInstruction {
                program_id: key(ix.program_id_index),
                accounts: ix.accounts.iter().map(|i| key(*i)).collect(),
                data: ix.data.clone(),
            })
            .collect()
    }

    /// Sent instructions calling `program_id` whose data starts with the named discriminator.
    pub fn sent_calls(&self, program_id: &Pubkey, ix_name: &str) -> Vec<Vec<u8>> {
        let disc = instruction_discriminator(ix_name);
        let sent = self.sent.lock().unwrap();
        let mut out = Vec::new();
        for tx in sent.iter() {
            let keys = tx.message.static_account_keys();
            for ix in tx.message.instructions() {
                let program = keys.get(ix.program_id_index as usize);
                if program == Some(program_id) && ix.data.starts_with(&disc) {
                    out.push(ix.data.clone());
                }
            }
        }
        out
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(addresses.iter().map(|a| accounts.get(a).cloned()).collect())
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Account)>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .filter(|(_, a)| a.owner == *program_id)
            .filter(|(_, a)| filters.iter().all(|f| f.matches(&a.data)))
            .map(|(k, a)| (*k, a.clone()))
            .collect())
    }

    async fn latest_blockhash(&self) -> Result<Hash, AppError> {
        Ok(Hash::new_unique())
    }

    async fn simulate(&self, _tx: &VersionedTransaction) -> Result<SimulationReport, AppError> {
        *self.simulated.lock().unwrap() += 1;
        let err = self.sim_errors.lock().unwrap().pop_front().flatten();
        Ok(SimulationReport {
            err,
            logs: vec!["Program log: fake".to_string()],
            units_consumed: Some(120_000),
        })
    }

    async fn send(
        &self,
        tx: &VersionedTransaction,
        _max_retries: usize,
    ) -> Result<Signature, AppError> {
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures[0])
    }

    async fn signature_state(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureState>, AppError> {
        let known = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .any(|tx| tx.signatures[0] == *signature);
        match *self.status_mode.lock().unwrap() {
            StatusMode::Confirm if known => Ok(Some(SignatureState::Confirmed)),
            _ => Ok(None),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SentInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<Pubkey>,
    pub data: Vec<u8>,
}

impl SentInstruction {
    pub fn calls(&self, program_id: &Pubkey, ix_name: &str) -> bool {
        self.program_id == *program_id && self.data.starts_with(&instruction_discriminator(ix_name))
    }
}

pub struct FakeRouter {
    pub quotes: Mutex<Vec<QuoteRequest>>,
    pub swap_requests: Mutex<usize>,
    /// Max-accounts limits whose swap instruction is too large, optionally
    /// only at one slippage level.
    pub oversized: Mutex<Vec<(Option<u16>, u16)>>,
    pub issued: Mutex<Vec<Quote>>,
    pub reject_all: Mutex<bool>,
    pub swap_program: Pubkey,
    pub setup_program: Pubkey,
    pub cleanup_program: Pubkey,
}

impl FakeRouter {
    pub fn new() -> Self {
        Self {
            quotes: Mutex::new(Vec::new()),
            swap_requests: Mutex::new(0),
            oversized: Mutex::new(Vec::new()),
            issued: Mutex::new(Vec::new()),
            reject_all: Mutex::new(false),
            swap_program: Pubkey::new_unique(),
            setup_program: Pubkey::new_unique(),
            cleanup_program: Pubkey::new_unique(),
        }
    }

    pub fn oversize_at(&self, max_accounts: u16) {
        self.oversized.lock().unwrap().push((None, max_accounts));
    }

    pub fn oversize_at_slippage(&self, slippage_bps: u16, max_accounts: u16) {
        self.oversized
            .lock()
            .unwrap()
            .push((Some(slippage_bps), max_accounts));
    }

    pub fn last_quote(&self) -> Option<Quote> {
        self.issued.lock().unwrap().last().cloned()
    }

    pub fn reject_everything(&self) {
        *self.reject_all.lock().unwrap() = true;
    }

    pub fn quote_log(&self) -> Vec<QuoteRequest> {
        self.quotes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RouteProvider for FakeRouter {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, RouteError> {
        self.quotes.lock().unwrap().push(request.clone());
        if *self.reject_all.lock().unwrap() {
            return Err(RouteError::Rejected {
                status: 400,
                code: "COULD_NOT_FIND_ANY_ROUTE".to_string(),
                message: "No routes found".to_string(),
            });
        }
        let out_amount = request.amount / 10;
        let threshold = out_amount - out_amount * request.slippage_bps as u64 / 10_000;
        let quote = Quote::from_json(json!({
            "inputMint": request.input_mint.to_string(),
            "inAmount": request.amount.to_string(),
            "outputMint": request.output_mint.to_string(),
            "outAmount": out_amount.to_string(),
            "otherAmountThreshold": threshold.to_string(),
            "swapMode": "ExactIn",
            "slippageBps": request.slippage_bps,
            "routePlan": [{
                "swapInfo": {"ammKey": "fake", "label": "Fake"},
                "percent": 100,
                "maxAccounts": request.max_accounts,
            }]
        }))?;
        self.issued.lock().unwrap().push(quote.clone());
        Ok(quote)
    }

    async fn swap_instructions(
        &self,
        quote: &Quote,
        user: &Pubkey,
        _destination: &Pubkey,
    ) -> Result<SwapInstructions, RouteError> {
        *self.swap_requests.lock().unwrap() += 1;
        let max_accounts = quote
            .route_plan
            .get(0)
            .and_then(|hop| hop.get("maxAccounts"))
            .and_then(|v| v.as_u64())
            .unwrap_or_default() as u16;
        let oversized = self.oversized.lock().unwrap().iter().any(|&(bps, limit)| {
            limit == max_accounts && bps.is_none_or(|bps| bps == quote.slippage_bps)
        });
        let payload = if oversized { 1_300 } else { 16 };
        Ok(SwapInstructions {
            compute_budget: vec![
                ComputeBudgetInstruction::set_compute_unit_limit(ROUTER_CU_LIMIT),
                ComputeBudgetInstruction::set_compute_unit_price(7),
            ],
            setup: vec![Instruction {
                program_id: self.setup_program,
                accounts: vec![AccountMeta::new_readonly(*user, false)],
                data: vec![0x01],
            }],
            swap: Some(Instruction {
                program_id: self.swap_program,
                accounts: vec![
                    AccountMeta::new_readonly(*user, true),
                    AccountMeta::new(Pubkey::new_unique(), false),
                ],
                data: vec![0xAB; payload],
            }),
            cleanup: Some(Instruction {
                program_id: self.cleanup_program,
                accounts: vec![AccountMeta::new_readonly(*user, false)],
                data: vec![0x02],
            }),
            lookup_tables: Vec::new(),
        })
    }
}

pub struct FakeClaims {
    pub ready: Mutex<Vec<Claim>>,
    pub status: Mutex<Option<ClaimStatus>>,
    pub status_reads: Mutex<usize>,
}

impl FakeClaims {
    pub fn new(ready: Vec<Claim>) -> Self {
        Self {
            ready: Mutex::new(ready),
            status: Mutex::new(Some(ClaimStatus::VrfReady)),
            status_reads: Mutex::new(0),
        }
    }

    pub fn set_status(&self, status: Option<ClaimStatus>) {
        *self.status.lock().unwrap() = status;
    }
}

#[async_trait]
impl ClaimSource for FakeClaims {
    async fn fetch_ready_claims(&self) -> Result<Vec<Claim>, AppError> {
        Ok(self.ready.lock().unwrap().clone())
    }

    async fn claim_status(&self, _claim: &Claim) -> Result<Option<ClaimStatus>, AppError> {
        *self.status_reads.lock().unwrap() += 1;
        Ok(*self.status.lock().unwrap())
    }
}

pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub router: Arc<FakeRouter>,
    pub claims: Arc<FakeClaims>,
    pub stats: Arc<ExecutorStats>,
    pub signer: Arc<Keypair>,
    pub addresses: ProgramAddresses,
    pub winner: Pubkey,
    pub base_mint: Pubkey,
    pub treasury_ata: Pubkey,
    pub round: Pubkey,
    pub round_vault: Pubkey,
    pub claim_address: Pubkey,
    pub pool: Arc<RewardPool>,
    pub submitter: Arc<Submitter>,
    pub orchestrator: Arc<Orchestrator>,
}

pub struct HarnessOptions {
    pub pool_mints: Vec<Pubkey>,
    pub pool_version: u32,
    pub fee_bps: u16,
    pub dry_run: bool,
    /// Mints owned by the system program instead of a token program.
    pub foreign_mints: Vec<Pubkey>,
}

impl HarnessOptions {
    pub fn with_mints(pool_mints: Vec<Pubkey>) -> Self {
        Self {
            pool_mints,
            pool_version: 1,
            fee_bps: FEE_BPS,
            dry_run: false,
            foreign_mints: Vec::new(),
        }
    }
}

pub fn unique_mints(n: usize) -> Vec<Pubkey> {
    (0..n).map(|_| Pubkey::new_unique()).collect()
}

pub fn harness(options: HarnessOptions) -> Harness {
    let ledger = Arc::new(FakeLedger::new());
    let router = Arc::new(FakeRouter::new());
    let claims = Arc::new(FakeClaims::new(Vec::new()));
    let stats = Arc::new(ExecutorStats::default());
    let signer = Arc::new(Keypair::new());
    let program_id = Pubkey::new_unique();
    let addresses = ProgramAddresses::new(program_id);
    let winner = Pubkey::new_unique();
    let treasury_ata = Pubkey::new_unique();
    let round = Pubkey::new_unique();
    let round_vault = Pubkey::new_unique();
    let claim_address = Pubkey::new_unique();

    ledger.put(
        addresses.config(),
        program_id,
        ConfigAccount {
            admin: Pubkey::new_unique(),
            usdc_mint: BASE_MINT,
            treasury_usdc_ata: treasury_ata,
            fee_bps: options.fee_bps,
            ticket_unit: 10_000,
            round_duration_sec: 120,
            min_participants: 2,
            min_total_tickets: 200,
            paused: false,
            bump: 255,
            max_deposit_per_user: 0,
        }
        .to_account_data(),
    );
    ledger.put(
        addresses.degen_config(),
        program_id,
        DegenConfigAccount {
            executor: signer.pubkey(),
            fallback_timeout_sec: 300,
            bump: 254,
        }
        .to_account_data(),
    );
    ledger.put(
        round,
        program_id,
        RoundAccount {
            round_id: ROUND_ID,
            status: 3,
            bump: 253,
            vault_usdc_ata: round_vault,
            total_usdc: ROUND_TOTAL,
            total_tickets: ROUND_TOTAL / 10_000,
            participants_count: 8,
            winner,
            vrf_payer: Pubkey::new_unique(),
            vrf_reimbursed: false,
            degen_mode_status: 2,
        }
        .to_account_data(),
    );
    for mint in &options.pool_mints {
        if *mint == BASE_MINT {
            continue;
        }
        let owner = if options.foreign_mints.contains(mint) {
            system_program::id()
        } else {
            spl_token::id()
        };
        ledger.put(*mint, owner, vec![0u8; 82]);
    }

    let pool = Arc::new(RewardPool::new(options.pool_version, options.pool_mints).unwrap());
    let submitter = Arc::new(Submitter::new(
        ledger.clone(),
        signer.clone(),
        SubmitSettings {
            dry_run: options.dry_run,
            send_max_retries: 0,
            confirm_timeout: Duration::from_millis(30),
            confirm_poll: Duration::from_millis(5),
            status_poll_attempts: 2,
            status_poll_backoff: Duration::from_millis(1),
        },
    ));
    let assembler = Arc::new(Assembler::new(
        ledger.clone(),
        router.clone(),
        addresses,
        signer.pubkey(),
        BASE_MINT,
        ComputeBudgetFallback {
            unit_limit: 400_000,
            unit_price: 10_000,
        },
    ));
    let plan = RetryPlan::new(vec![50, 100, 300], vec![64, 48, 32]).unwrap();
    let orchestrator = Arc::new(Orchestrator::new(
        ledger.clone(),
        claims.clone(),
        pool.clone(),
        plan,
        Arc::new(MintProgramCache::new(Duration::from_secs(60))),
        assembler,
        submitter.clone(),
        stats.clone(),
    ));

    Harness {
        ledger,
        router,
        claims,
        stats,
        signer,
        addresses,
        winner,
        base_mint: BASE_MINT,
        treasury_ata,
        round,
        round_vault,
        claim_address,
        pool,
        submitter,
        orchestrator,
    }
}

impl Harness {
    pub fn claim(&self, window: u8, fallback_after_ts: i64) -> Claim {
        Claim {
            address: self.claim_address,
            round: self.round,
            winner: self.winner,
            round_id: ROUND_ID,
            status: ClaimStatus::VrfReady,
            bump: 255,
            pool_version: self.pool.version,
            candidate_window: window,
            requested_at: 1_700_000_000,
            fulfilled_at: 1_700_000_020,
            fallback_after_ts,
            payout_raw: PAYOUT,
            randomness: [0x01; 32],
            ..Claim::default()
        }
    }

    /// The executor's base-asset settlement account.
    pub fn settlement(&self) -> Pubkey {
        degen_executor::services::executor::assembly::settlement_account(
            &self.signer.pubkey(),
            &self.base_mint,
        )
    }

    pub fn program_id(&self) -> Pubkey {
        self.addresses.program_id
    }
}
