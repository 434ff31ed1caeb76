// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

// =============================================================================
// LEDGER LIMITS (protocol constants, never configurable)
// =============================================================================

/// Serialized transaction ceiling (IPv6 MTU minus headers).
pub const MAX_TRANSACTION_BYTES: usize = 1232;
pub const MAX_COMPUTE_UNITS: u32 = 1_400_000;
/// `getMultipleAccounts` page size.
pub const MAX_ACCOUNTS_PER_REQUEST: usize = 100;

// =============================================================================
// ASSETS
// =============================================================================

/// Payouts start in the program's configured USDC mint (`Config.usdc_mint`).
pub const USDC_DECIMALS: u8 = 6;
pub const MAINNET_USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const WSOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

// =============================================================================
// ISSUING PROGRAM
// =============================================================================

pub const CONFIG_SEED: &[u8] = b"cfg";
pub const DEGEN_CONFIG_SEED: &[u8] = b"degen_cfg";

pub const BPS_DENOMINATOR: u64 = 10_000;
/// Fixed reimbursement to the VRF payer, taken from the pot at claim time.
pub const VRF_REIMBURSEMENT_USDC: u64 = 200_000;

/// `finalize_degen_fallback` reason: every candidate failed or no route was viable.
pub const FALLBACK_REASON_NO_VIABLE_ROUTE: u8 = 1;

/// Routing program `SlippageToleranceExceeded`.
pub const ROUTER_SLIPPAGE_ERROR_CODE: u32 = 6001;
/// Issuing program `MinOutNotMet` raised by `finalize_degen_execution`.
pub const PROGRAM_MIN_OUT_ERROR_CODE: u32 = 6020;

pub fn is_slippage_error_code(code: u32) -> bool {
    matches!(code, ROUTER_SLIPPAGE_ERROR_CODE | PROGRAM_MIN_OUT_ERROR_CODE)
}

// =============================================================================
// ROUTING SERVICE
// =============================================================================

pub const DEFAULT_JUPITER_API_URL: &str = "https://api.jup.ag/swap/v1";
pub const DEFAULT_JUPITER_LITE_API_URL: &str = "https://lite-api.jup.ag/swap/v1";
