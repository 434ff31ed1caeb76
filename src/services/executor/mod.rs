// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

pub mod assembly;
pub mod derivation;
pub mod fallback;
pub mod orchestrator;
pub mod retry_policy;
pub mod service;
pub mod submission;

pub use orchestrator::{ClaimOutcome, Orchestrator};
pub use service::ExecutorService;
