// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>
#![allow(clippy::too_many_arguments)]

//! Settlement engine for degen-mode prize claims: derives reward candidates
//! from the claim seed, routes the payout through a swap aggregator and
//! falls back to a base-asset payout once the deadline passes.

pub mod app;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use infrastructure::{data, network};
pub use services::executor;
