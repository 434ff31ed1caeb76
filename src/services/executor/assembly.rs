// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use std::sync::Arc;

use solana_sdk::address_lookup_table::state::AddressLookupTable;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_token::solana_program::program_pack::Pack;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use thiserror::Error;

use crate::domain::claim::Claim;
use crate::domain::constants::{FALLBACK_REASON_NO_VIABLE_ROUTE, USDC_DECIMALS};
use crate::domain::error::AppError;
use crate::domain::program::{
    self, BeginExecutionArgs, ClaimAccounts, ConfigAccount, DegenConfigAccount, ProgramAddresses,
    RoundAccount, payout_from_round,
};
use crate::infrastructure::network::ledger::Ledger;
use crate::infrastructure::network::router::{QuoteRequest, RouteError, RouteProvider};
use crate::services::executor::derivation::Candidate;
use crate::services::executor::retry_policy::AttemptParams;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Ledger(#[from] AppError),

    #[error("candidate {mint} rejected: {reason}")]
    Candidate { mint: Pubkey, reason: String },
}

/// Live on-ledger state one claim's transactions are built against.
#[derive(Clone, Debug)]
pub struct ClaimContext {
    pub claim: Claim,
    pub accounts: ClaimAccounts,
    pub config: ConfigAccount,
    pub degen_config: DegenConfigAccount,
    pub round: RoundAccount,
    /// Recomputed from the live fee rate and VRF reimbursement; `None` when nothing is left.
    pub payout: Option<u64>,
}

/// Ordered instructions plus the lookup tables to compile them against.
#[derive(Clone, Debug, Default)]
pub struct BuiltTransaction {
    pub instructions: Vec<Instruction>,
    pub lookup_tables: Vec<AddressLookupTableAccount>,
    pub min_out: u64,
    pub route_hash: [u8; 32],
}

#[derive(Clone, Copy, Debug)]
pub struct ComputeBudgetFallback {
    pub unit_limit: u32,
    pub unit_price: u64,
}

impl ComputeBudgetFallback {
    pub fn instructions(&self) -> Vec<Instruction> {
        vec![
            ComputeBudgetInstruction::set_compute_unit_limit(self.unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(self.unit_price),
        ]
    }
}

pub struct Assembler {
    ledger: Arc<dyn Ledger>,
    router: Arc<dyn RouteProvider>,
    addresses: ProgramAddresses,
    executor: Pubkey,
    base_mint: Pubkey,
    compute_fallback: ComputeBudgetFallback,
}

/// Executor-owned base-asset (USDC) account every payout starts from.
pub fn settlement_account(executor: &Pubkey, base_mint: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(executor, base_mint, &spl_token::id())
}

impl Assembler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        router: Arc<dyn RouteProvider>,
        addresses: ProgramAddresses,
        executor: Pubkey,
        base_mint: Pubkey,
        compute_fallback: ComputeBudgetFallback,
    ) -> Self {
        Self {
            ledger,
            router,
            addresses,
            executor,
            base_mint,
            compute_fallback,
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.addresses.program_id
    }

    pub fn executor(&self) -> Pubkey {
        self.executor
    }

    /// Mint payouts are denominated in, as read from the program config at startup.
    pub fn base_mint(&self) -> Pubkey {
        self.base_mint
    }

    fn settlement(&self) -> Pubkey {
        settlement_account(&self.executor, &self.base_mint)
    }

    pub async fn load_context(&self, claim: &Claim) -> Result<ClaimContext, AppError> {
        let config_address = self.addresses.config();
        let degen_config_address = self.addresses.degen_config();
        let fetched = self
            .ledger
            .get_multiple_accounts(&[config_address, degen_config_address, claim.round])
            .await?;
        let mut fetched = fetched.into_iter();
        let config_account = fetched.next().flatten().ok_or_else(|| {
            AppError::Initialization(format!("program config {config_address} not found"))
        })?;
        let degen_config_account = fetched.next().flatten().ok_or_else(|| {
            AppError::Initialization(format!("degen config {degen_config_address} not found"))
        })?;
        let round_account = fetched.next().flatten().ok_or_else(|| AppError::Validation {
            field: "round".to_string(),
            message: format!("round {} account {} not found", claim.round_id, claim.round),
        })?;
        let config = ConfigAccount::decode(config_address, &config_account.data)?;
        let degen_config = DegenConfigAccount::decode(degen_config_address, &degen_config_account.data)?;
        let round = RoundAccount::decode(claim.round, &round_account.data)?;
        if config.usdc_mint != self.base_mint {
            return Err(AppError::Validation {
                field: "usdc_mint".to_string(),
                message: format!(
                    "program config mint {} differs from settlement mint {}",
                    config.usdc_mint, self.base_mint
                ),
            });
        }
        let payout = payout_from_round(&config, &round);
        let accounts = ClaimAccounts {
            executor: self.executor,
            config: config_address,
            degen_config: degen_config_address,
            round: claim.round,
            round_vault: round.vault_usdc_ata,
            claim: claim.address,
            winner: claim.winner,
        };
        Ok(ClaimContext {
            claim: claim.clone(),
            accounts,
            config,
            degen_config,
            round,
            payout,
        })
    }

    /// Drain a balance left in the settlement account by an interrupted run.
    pub async fn stale_drain(&self, ctx: &ClaimContext) -> Result<Vec<Instruction>, AppError> {
        let source = self.settlement();
        let Some(account) = self.ledger.get_account(&source).await? else {
            return Ok(Vec::new());
        };
        let balance = match spl_token::state::Account::unpack(&account.data) {
            Ok(state) => state.amount,
            Err(e) => {
                tracing::warn!(target: "assembly", account = %source, error = %e, "Settlement account unreadable; skipping drain");
                return Ok(Vec::new());
            }
        };
        if balance == 0 {
            return Ok(Vec::new());
        }
        let treasury_ata = ctx.config.treasury_usdc_ata;
        tracing::warn!(
            target: "assembly",
            balance,
            treasury = %treasury_ata,
            "Stale settlement balance found; draining to treasury"
        );
        let transfer = spl_token::instruction::transfer_checked(
            &spl_token::id(),
            &source,
            &self.base_mint,
            &treasury_ata,
            &self.executor,
            &[],
            balance,
            USDC_DECIMALS,
        )
        .map_err(|e| AppError::Initialization(format!("drain transfer: {e}")))?;
        Ok(vec![transfer])
    }

    /// Direct USDC payout: no routing involved.
    pub async fn build_base(
        &self,
        ctx: &ClaimContext,
        candidate: &Candidate,
        payout: u64,
    ) -> Result<BuiltTransaction, BuildError> {
        let source = self.settlement();
        let destination = get_associated_token_address_with_program_id(
            &ctx.claim.winner,
            &self.base_mint,
            &spl_token::id(),
        );
        let args = begin_args(candidate, payout, [0u8; 32])?;

        let mut instructions = self.compute_fallback.instructions();
        instructions.extend(self.stale_drain(ctx).await?);
        instructions.push(program::begin_degen_execution(
            &self.addresses.program_id,
            &ctx.accounts,
            &source,
            &self.base_mint,
            &self.base_mint,
            &args,
        ));
        instructions.push(create_associated_token_account_idempotent(
            &self.executor,
            &ctx.claim.winner,
            &self.base_mint,
            &spl_token::id(),
        ));
        instructions.push(
            spl_token::instruction::transfer_checked(
                &spl_token::id(),
                &source,
                &self.base_mint,
                &destination,
                &self.executor,
                &[],
                payout,
                USDC_DECIMALS,
            )
            .map_err(|e| AppError::Initialization(format!("payout transfer: {e}")))?,
        );
        instructions.push(program::finalize_degen_execution(
            &self.addresses.program_id,
            &ctx.accounts,
            &destination,
            &self.base_mint,
        ));
        Ok(BuiltTransaction {
            instructions,
            lookup_tables: Vec::new(),
            min_out: payout,
            route_hash: args.route_hash,
        })
    }

    /// Routed swap into `candidate.mint`, owned by `token_program`.
    pub async fn build_swap(
        &self,
        ctx: &ClaimContext,
        candidate: &Candidate,
        token_program: &Pubkey,
        payout: u64,
        params: AttemptParams,
    ) -> Result<BuiltTransaction, BuildError> {
        let request = QuoteRequest {
            input_mint: self.base_mint,
            output_mint: candidate.mint,
            amount: payout,
            slippage_bps: params.slippage_bps,
            max_accounts: Some(params.max_accounts),
            only_direct_routes: params.direct_only,
        };
        let quote = self.router.quote(&request).await?;
        if quote.other_amount_threshold == 0 {
            return Err(BuildError::Candidate {
                mint: candidate.mint,
                reason: "quote has zero minimum output".to_string(),
            });
        }
        let destination = get_associated_token_address_with_program_id(
            &ctx.claim.winner,
            &candidate.mint,
            token_program,
        );
        let swap = self
            .router
            .swap_instructions(&quote, &self.executor, &destination)
            .await?;
        let Some(swap_ix) = swap.swap.clone() else {
            return Err(BuildError::Route(RouteError::Decode(
                "swap instruction missing".to_string(),
            )));
        };
        let route_hash = quote.route_hash();
        let args = begin_args(candidate, quote.other_amount_threshold, route_hash)?;

        let mut instructions = if swap.compute_budget.is_empty() {
            self.compute_fallback.instructions()
        } else {
            swap.compute_budget.clone()
        };
        instructions.extend(self.stale_drain(ctx).await?);
        instructions.push(create_associated_token_account_idempotent(
            &self.executor,
            &ctx.claim.winner,
            &candidate.mint,
            token_program,
        ));
        instructions.push(program::begin_degen_execution(
            &self.addresses.program_id,
            &ctx.accounts,
            &self.settlement(),
            &self.base_mint,
            &candidate.mint,
            &args,
        ));
        instructions.extend(swap.setup.iter().cloned());
        instructions.push(swap_ix);
        instructions.extend(swap.cleanup.iter().cloned());
        instructions.push(program::finalize_degen_execution(
            &self.addresses.program_id,
            &ctx.accounts,
            &destination,
            &candidate.mint,
        ));

        let lookup_tables = self.resolve_lookup_tables(&swap.lookup_tables).await?;
        tracing::debug!(
            target: "assembly",
            mint = %candidate.mint,
            in_amount = quote.in_amount,
            out_amount = quote.out_amount,
            min_out = quote.other_amount_threshold,
            hops = quote.hop_count(),
            lookup_tables = lookup_tables.len(),
            "Swap transaction assembled"
        );
        Ok(BuiltTransaction {
            instructions,
            lookup_tables,
            min_out: quote.other_amount_threshold,
            route_hash,
        })
    }

    /// Guaranteed base-asset settlement once the deadline has passed.
    pub fn build_fallback(&self, ctx: &ClaimContext) -> Vec<Instruction> {
        let mut instructions = self.compute_fallback.instructions();
        instructions.push(create_associated_token_account_idempotent(
            &self.executor,
            &ctx.claim.winner,
            &self.base_mint,
            &spl_token::id(),
        ));
        let winner_ata = get_associated_token_address_with_program_id(
            &ctx.claim.winner,
            &self.base_mint,
            &spl_token::id(),
        );
        instructions.push(program::finalize_degen_fallback(
            &self.addresses.program_id,
            &ctx.accounts,
            &winner_ata,
            &ctx.config.treasury_usdc_ata,
            FALLBACK_REASON_NO_VIABLE_ROUTE,
        ));
        instructions
    }

    pub async fn resolve_lookup_tables(
        &self,
        keys: &[Pubkey],
    ) -> Result<Vec<AddressLookupTableAccount>, AppError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let accounts = self.ledger.get_multiple_accounts(keys).await?;
        let mut out = Vec::with_capacity(keys.len());
        for (key, account) in keys.iter().zip(accounts) {
            let Some(account) = account else {
                tracing::warn!(target: "assembly", table = %key, "Lookup table not found");
                continue;
            };
            match AddressLookupTable::deserialize(&account.data) {
                Ok(table) => out.push(AddressLookupTableAccount {
                    key: *key,
                    addresses: table.addresses.to_vec(),
                }),
                Err(e) => {
                    tracing::warn!(target: "assembly", table = %key, error = %e, "Lookup table undecodable");
                }
            }
        }
        Ok(out)
    }
}

fn begin_args(
    candidate: &Candidate,
    min_out: u64,
    route_hash: [u8; 32],
) -> Result<BeginExecutionArgs, BuildError> {
    let reject = |reason: &str| BuildError::Candidate {
        mint: candidate.mint,
        reason: reason.to_string(),
    };
    Ok(BeginExecutionArgs {
        candidate_rank: u8::try_from(candidate.rank).map_err(|_| reject("rank exceeds u8"))?,
        token_index: candidate.pool_index,
        min_out,
        route_hash,
    })
}
