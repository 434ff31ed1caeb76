// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const QUIET_MODULES: &str = "h2=info,hyper=info,hyper_util=info,reqwest=info,rustls=info,solana_client=warn,solana_rpc_client=warn";

/// Expand a bare level ("debug") with quiet defaults for chatty transport crates.
/// Directive strings containing ',' or '=' are used verbatim.
fn filter_spec(log_level: &str) -> String {
    let normalized = log_level.trim();
    if normalized.contains(',') || normalized.contains('=') {
        normalized.to_string()
    } else if normalized.is_empty() {
        format!("info,{QUIET_MODULES}")
    } else {
        format!("{normalized},{QUIET_MODULES}")
    }
}

pub fn setup_logging(log_level: &str, json_format: bool) {
    let spec = filter_spec(log_level);
    let filter = EnvFilter::from_str(&spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false);
        subscriber.with(json_layer).try_init().is_ok()
    } else {
        let fmt_layer = fmt::layer().with_target(true).compact();
        subscriber.with(fmt_layer).try_init().is_ok()
    };
    if !installed {
        return;
    }

    let base = spec.split(',').next().unwrap_or("info");
    tracing::info!(
        target: "service",
        base,
        format = if json_format { "json" } else { "compact" },
        "Logging initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::filter_spec;

    #[test]
    fn bare_level_gets_quiet_module_defaults() {
        let spec = filter_spec("debug");
        assert!(spec.starts_with("debug,"));
        assert!(spec.contains("solana_rpc_client=warn"));
    }

    #[test]
    fn custom_directives_are_kept_verbatim() {
        assert_eq!(
            filter_spec("info,degen_executor=trace"),
            "info,degen_executor=trace"
        );
    }
}
