// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

pub fn parse_boolish(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse `"50, 100 300"` style lists (comma or whitespace separated, optional brackets/quotes).
pub fn parse_u16_list(raw: &str) -> Result<Vec<u16>, String> {
    let cleaned = raw.trim_matches(|c| matches!(c, '`' | '"' | '\'' | '[' | ']'));
    cleaned
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u16>()
                .map_err(|e| format!("invalid number '{part}': {e}"))
        })
        .collect()
}

pub fn parse_pubkey(s: &str) -> Option<Pubkey> {
    Pubkey::from_str(s.trim()).ok()
}

pub fn parse_bytes32_hex(s: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(strip_0x(s.trim())).ok()?;
    bytes.try_into().ok()
}
