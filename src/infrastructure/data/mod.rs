// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod claim_source;
pub mod mint_cache;
pub mod reward_pool;

