// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

pub mod data_path;
pub mod metrics;
pub mod parsing;
pub mod retry;
pub mod time_utils;

