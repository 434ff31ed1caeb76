// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod ledger;
pub mod provider;
pub mod router;

pub use ledger::{AccountFilter, Ledger, SignatureState, SimulationReport};
pub use provider::{ConnectionFactory, RpcLedger};
pub use router::{JupiterClient, Quote, QuoteRequest, RouteError, RouteProvider, SwapInstructions};
