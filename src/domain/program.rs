// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Client-side view of the issuing program: account layouts, PDA derivation
//! and the three instructions the executor is allowed to send.

use crate::domain::constants::{
    BPS_DENOMINATOR, CONFIG_SEED, DEGEN_CONFIG_SEED, VRF_REIMBURSEMENT_USDC,
};
use crate::domain::error::AppError;
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::sysvar;
use spl_token::solana_program::system_program;

pub const ANCHOR_DISCRIMINATOR_LEN: usize = 8;

pub const CONFIG_ACCOUNT: &str = "Config";
pub const CONFIG_ACCOUNT_LEN: usize = ANCHOR_DISCRIMINATOR_LEN + 154;

pub const DEGEN_CONFIG_ACCOUNT: &str = "DegenConfig";
pub const DEGEN_CONFIG_ACCOUNT_LEN: usize = ANCHOR_DISCRIMINATOR_LEN + 64;

pub const ROUND_ACCOUNT: &str = "Round";
pub const ROUND_ACCOUNT_LEN: usize = ANCHOR_DISCRIMINATOR_LEN + 8240;

const MAX_PARTICIPANTS: usize = 200;

// Round body offsets; participants and the Fenwick tree sit between winner and vrf payer.
const ROUND_ROUND_ID: usize = 0;
const ROUND_STATUS: usize = 8;
const ROUND_BUMP: usize = 9;
const ROUND_VAULT_USDC_ATA: usize = 40;
const ROUND_TOTAL_USDC: usize = 72;
const ROUND_TOTAL_TICKETS: usize = 80;
const ROUND_PARTICIPANTS_COUNT: usize = 88;
const ROUND_WINNER: usize = 136;
const ROUND_VRF_PAYER: usize = 168 + 32 * MAX_PARTICIPANTS + 8 * (MAX_PARTICIPANTS + 1);
const ROUND_VRF_REIMBURSED: usize = ROUND_VRF_PAYER + 32;
const ROUND_DEGEN_MODE_STATUS: usize = ROUND_VRF_REIMBURSED + 1;

fn namespaced_discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

pub fn account_discriminator(name: &str) -> [u8; 8] {
    namespaced_discriminator("account", name)
}

pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    namespaced_discriminator("global", name)
}

/// Little-endian cursor over raw account data.
pub struct AccountReader<'a> {
    account: Pubkey,
    data: &'a [u8],
    offset: usize,
}

impl<'a> AccountReader<'a> {
    pub fn new(account: Pubkey, data: &'a [u8]) -> Self {
        Self {
            account,
            data,
            offset: 0,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AppError> {
        let end = self.offset.saturating_add(len);
        let Some(slice) = self.data.get(self.offset..end) else {
            return Err(AppError::Decode {
                account: self.account.to_string(),
                reason: format!(
                    "truncated at offset {} (wanted {len} bytes, have {})",
                    self.offset,
                    self.data.len()
                ),
            });
        };
        self.offset = end;
        Ok(slice)
    }

    /// Jump to an absolute offset; the next read checks bounds.
    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Seek relative to the end of the discriminator.
    pub fn at(&mut self, body_offset: usize) -> &mut Self {
        self.seek(ANCHOR_DISCRIMINATOR_LEN + body_offset);
        self
    }

    pub fn skip(&mut self, len: usize) -> Result<(), AppError> {
        self.take(len).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], AppError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn expect_discriminator(&mut self, expected: &[u8; 8]) -> Result<(), AppError> {
        let found: [u8; 8] = self.array()?;
        if &found != expected {
            return Err(AppError::Decode {
                account: self.account.to_string(),
                reason: format!(
                    "discriminator mismatch: expected {}, found {}",
                    hex::encode(expected),
                    hex::encode(found)
                ),
            });
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8, AppError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, AppError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, AppError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, AppError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, AppError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, AppError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub fn bytes32(&mut self) -> Result<[u8; 32], AppError> {
        self.array()
    }

    pub fn pubkey(&mut self) -> Result<Pubkey, AppError> {
        Ok(Pubkey::new_from_array(self.array()?))
    }
}

/// Global program configuration (`["cfg"]`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigAccount {
    pub admin: Pubkey,
    pub usdc_mint: Pubkey,
    pub treasury_usdc_ata: Pubkey,
    pub fee_bps: u16,
    pub ticket_unit: u64,
    pub round_duration_sec: u32,
    pub min_participants: u16,
    pub min_total_tickets: u64,
    pub paused: bool,
    pub bump: u8,
    pub max_deposit_per_user: u64,
}

impl ConfigAccount {
    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self, AppError> {
        let mut reader = AccountReader::new(address, data);
        reader.expect_discriminator(&account_discriminator(CONFIG_ACCOUNT))?;
        let config = Self {
            admin: reader.pubkey()?,
            usdc_mint: reader.pubkey()?,
            treasury_usdc_ata: reader.pubkey()?,
            fee_bps: reader.u16()?,
            ticket_unit: reader.u64()?,
            round_duration_sec: reader.u32()?,
            min_participants: reader.u16()?,
            min_total_tickets: reader.u64()?,
            paused: reader.bool()?,
            bump: reader.u8()?,
            max_deposit_per_user: reader.u64()?,
        };
        reader.skip(24)?;
        Ok(config)
    }

    pub fn to_account_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CONFIG_ACCOUNT_LEN);
        out.extend_from_slice(&account_discriminator(CONFIG_ACCOUNT));
        out.extend_from_slice(self.admin.as_ref());
        out.extend_from_slice(self.usdc_mint.as_ref());
        out.extend_from_slice(self.treasury_usdc_ata.as_ref());
        out.extend_from_slice(&self.fee_bps.to_le_bytes());
        out.extend_from_slice(&self.ticket_unit.to_le_bytes());
        out.extend_from_slice(&self.round_duration_sec.to_le_bytes());
        out.extend_from_slice(&self.min_participants.to_le_bytes());
        out.extend_from_slice(&self.min_total_tickets.to_le_bytes());
        out.push(u8::from(self.paused));
        out.push(self.bump);
        out.extend_from_slice(&self.max_deposit_per_user.to_le_bytes());
        out.resize(CONFIG_ACCOUNT_LEN, 0);
        out
    }
}

/// Degen-mode settings (`["degen_cfg"]`), including the registered executor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DegenConfigAccount {
    pub executor: Pubkey,
    pub fallback_timeout_sec: u32,
    pub bump: u8,
}

impl DegenConfigAccount {
    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self, AppError> {
        let mut reader = AccountReader::new(address, data);
        reader.expect_discriminator(&account_discriminator(DEGEN_CONFIG_ACCOUNT))?;
        let config = Self {
            executor: reader.pubkey()?,
            fallback_timeout_sec: reader.u32()?,
            bump: reader.u8()?,
        };
        reader.skip(27)?;
        Ok(config)
    }

    pub fn to_account_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DEGEN_CONFIG_ACCOUNT_LEN);
        out.extend_from_slice(&account_discriminator(DEGEN_CONFIG_ACCOUNT));
        out.extend_from_slice(self.executor.as_ref());
        out.extend_from_slice(&self.fallback_timeout_sec.to_le_bytes());
        out.push(self.bump);
        out.resize(DEGEN_CONFIG_ACCOUNT_LEN, 0);
        out
    }
}

/// The fields of a round the executor needs; the participant table is skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundAccount {
    pub round_id: u64,
    pub status: u8,
    pub bump: u8,
    pub vault_usdc_ata: Pubkey,
    pub total_usdc: u64,
    pub total_tickets: u64,
    pub participants_count: u16,
    pub winner: Pubkey,
    pub vrf_payer: Pubkey,
    pub vrf_reimbursed: bool,
    pub degen_mode_status: u8,
}

impl RoundAccount {
    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self, AppError> {
        let mut reader = AccountReader::new(address, data);
        reader.expect_discriminator(&account_discriminator(ROUND_ACCOUNT))?;
        let round_id = reader.at(ROUND_ROUND_ID).u64()?;
        let status = reader.at(ROUND_STATUS).u8()?;
        let bump = reader.at(ROUND_BUMP).u8()?;
        let vault_usdc_ata = reader.at(ROUND_VAULT_USDC_ATA).pubkey()?;
        let total_usdc = reader.at(ROUND_TOTAL_USDC).u64()?;
        let total_tickets = reader.at(ROUND_TOTAL_TICKETS).u64()?;
        let participants_count = reader.at(ROUND_PARTICIPANTS_COUNT).u16()?;
        let winner = reader.at(ROUND_WINNER).pubkey()?;
        let vrf_payer = reader.at(ROUND_VRF_PAYER).pubkey()?;
        let vrf_reimbursed = reader.at(ROUND_VRF_REIMBURSED).bool()?;
        let degen_mode_status = reader.at(ROUND_DEGEN_MODE_STATUS).u8()?;
        Ok(Self {
            round_id,
            status,
            bump,
            vault_usdc_ata,
            total_usdc,
            total_tickets,
            participants_count,
            winner,
            vrf_payer,
            vrf_reimbursed,
            degen_mode_status,
        })
    }

    pub fn to_account_data(&self) -> Vec<u8> {
        let mut out = vec![0u8; ROUND_ACCOUNT_LEN];
        out[..ANCHOR_DISCRIMINATOR_LEN].copy_from_slice(&account_discriminator(ROUND_ACCOUNT));
        let body = &mut out[ANCHOR_DISCRIMINATOR_LEN..];
        let mut put = |offset: usize, bytes: &[u8]| {
            body[offset..offset + bytes.len()].copy_from_slice(bytes);
        };
        put(ROUND_ROUND_ID, &self.round_id.to_le_bytes());
        put(ROUND_STATUS, &[self.status]);
        put(ROUND_BUMP, &[self.bump]);
        put(ROUND_VAULT_USDC_ATA, self.vault_usdc_ata.as_ref());
        put(ROUND_TOTAL_USDC, &self.total_usdc.to_le_bytes());
        put(ROUND_TOTAL_TICKETS, &self.total_tickets.to_le_bytes());
        put(ROUND_PARTICIPANTS_COUNT, &self.participants_count.to_le_bytes());
        put(ROUND_WINNER, self.winner.as_ref());
        put(ROUND_VRF_PAYER, self.vrf_payer.as_ref());
        put(ROUND_VRF_REIMBURSED, &[u8::from(self.vrf_reimbursed)]);
        put(ROUND_DEGEN_MODE_STATUS, &[self.degen_mode_status]);
        out
    }

    /// Reimbursement still owed to whoever paid for randomness.
    pub fn pending_vrf_reimbursement(&self) -> u64 {
        if self.vrf_payer == Pubkey::default() || self.vrf_reimbursed {
            0
        } else {
            VRF_REIMBURSEMENT_USDC
        }
    }
}

/// Winner payout as the execution path settles it: pot minus protocol fee
/// minus any outstanding VRF reimbursement. `None` when nothing is left.
pub fn payout_from_round(config: &ConfigAccount, round: &RoundAccount) -> Option<u64> {
    let total = u128::from(round.total_usdc);
    let fee = total
        .checked_mul(u128::from(config.fee_bps))?
        .checked_div(u128::from(BPS_DENOMINATOR))?;
    let payout = total
        .checked_sub(fee)?
        .checked_sub(u128::from(round.pending_vrf_reimbursement()))?;
    u64::try_from(payout).ok().filter(|amount| *amount > 0)
}

/// PDA derivation for one program deployment.
#[derive(Clone, Copy, Debug)]
pub struct ProgramAddresses {
    pub program_id: Pubkey,
}

impl ProgramAddresses {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn config(&self) -> Pubkey {
        Pubkey::find_program_address(&[CONFIG_SEED], &self.program_id).0
    }

    pub fn degen_config(&self) -> Pubkey {
        Pubkey::find_program_address(&[DEGEN_CONFIG_SEED], &self.program_id).0
    }
}

/// Accounts shared by every instruction touching one claim.
#[derive(Clone, Debug)]
pub struct ClaimAccounts {
    pub executor: Pubkey,
    pub config: Pubkey,
    pub degen_config: Pubkey,
    pub round: Pubkey,
    pub round_vault: Pubkey,
    pub claim: Pubkey,
    pub winner: Pubkey,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeginExecutionArgs {
    pub candidate_rank: u8,
    pub token_index: u32,
    pub min_out: u64,
    pub route_hash: [u8; 32],
}

impl BeginExecutionArgs {
    /// Offset of `min_out` inside the instruction data.
    pub const MIN_OUT_OFFSET: usize = 8 + 1 + 4;
}

pub fn begin_degen_execution(
    program_id: &Pubkey,
    accounts: &ClaimAccounts,
    executor_usdc_ata: &Pubkey,
    usdc_mint: &Pubkey,
    output_mint: &Pubkey,
    args: &BeginExecutionArgs,
) -> Instruction {
    let mut data = instruction_discriminator("begin_degen_execution").to_vec();
    data.push(args.candidate_rank);
    data.extend_from_slice(&args.token_index.to_le_bytes());
    data.extend_from_slice(&args.min_out.to_le_bytes());
    data.extend_from_slice(&args.route_hash);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.executor, true),
            AccountMeta::new_readonly(accounts.config, false),
            AccountMeta::new_readonly(accounts.degen_config, false),
            AccountMeta::new(accounts.round, false),
            AccountMeta::new(accounts.round_vault, false),
            AccountMeta::new(accounts.claim, false),
            AccountMeta::new(*executor_usdc_ata, false),
            AccountMeta::new_readonly(*usdc_mint, false),
            AccountMeta::new_readonly(*output_mint, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::instructions::id(), false),
        ],
        data,
    }
}

pub fn finalize_degen_execution(
    program_id: &Pubkey,
    accounts: &ClaimAccounts,
    receiver_token_ata: &Pubkey,
    output_mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.executor, true),
            AccountMeta::new_readonly(accounts.config, false),
            AccountMeta::new_readonly(accounts.degen_config, false),
            AccountMeta::new(accounts.claim, false),
            AccountMeta::new_readonly(accounts.winner, false),
            AccountMeta::new(*receiver_token_ata, false),
            AccountMeta::new_readonly(*output_mint, false),
        ],
        data: instruction_discriminator("finalize_degen_execution").to_vec(),
    }
}

pub fn finalize_degen_fallback(
    program_id: &Pubkey,
    accounts: &ClaimAccounts,
    winner_usdc_ata: &Pubkey,
    treasury_usdc_ata: &Pubkey,
    reason_code: u8,
) -> Instruction {
    let mut data = instruction_discriminator("finalize_degen_fallback").to_vec();
    data.push(reason_code);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.executor, true),
            AccountMeta::new_readonly(accounts.config, false),
            AccountMeta::new_readonly(accounts.degen_config, false),
            AccountMeta::new(accounts.round, false),
            AccountMeta::new(accounts.round_vault, false),
            AccountMeta::new(accounts.claim, false),
            AccountMeta::new_readonly(accounts.winner, false),
            AccountMeta::new(*winner_usdc_ata, false),
            AccountMeta::new(*treasury_usdc_ata, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}
