// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::common::data_path::{resolve_data_path, resolve_required_data_path};
use crate::common::parsing::{parse_boolish, parse_pubkey, parse_u16_list};
use crate::domain::constants::{
    DEFAULT_JUPITER_API_URL, DEFAULT_JUPITER_LITE_API_URL, MAX_COMPUTE_UNITS,
};
use crate::domain::error::AppError;
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, read_keypair_file};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    #[default]
    Mainnet,
    Devnet,
}

impl Cluster {
    pub fn as_str(self) -> &'static str {
        match self {
            Cluster::Mainnet => "mainnet",
            Cluster::Devnet => "devnet",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalSettings {
    // General
    #[serde(default = "default_false")]
    pub debug: bool,
    #[serde(default = "default_false")]
    pub log_json: bool,
    #[serde(default)]
    pub cluster: Cluster,
    pub data_dir: Option<String>,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    // Ledger
    pub rpc_url: String,
    pub program_id: String,
    #[serde(default)]
    pub executor_keypair_path: String,

    // Reward pool
    pub reward_pool_path: Option<String>,
    #[serde(default = "default_mint_cache_ttl_secs")]
    pub mint_cache_ttl_secs: u64,

    // Routing service
    pub jupiter_api_url: Option<String>,
    pub jupiter_api_key: Option<String>,
    #[serde(default = "default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
    #[serde(default = "default_routing_max_attempts")]
    pub routing_max_attempts: usize,

    // Retry search
    #[serde(
        default = "default_slippage_bps_steps",
        deserialize_with = "deserialize_u16_list"
    )]
    pub slippage_bps_steps: Vec<u16>,
    #[serde(
        default = "default_max_accounts_steps",
        deserialize_with = "deserialize_u16_list"
    )]
    pub max_accounts_steps: Vec<u16>,

    // Transactions
    #[serde(default = "default_compute_unit_limit_fallback")]
    pub compute_unit_limit_fallback: u32,
    #[serde(default = "default_compute_unit_price_fallback")]
    pub compute_unit_price_fallback: u64,
    #[serde(default = "default_send_max_retries")]
    pub send_max_retries: usize,
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    #[serde(default = "default_confirm_poll_ms")]
    pub confirm_poll_ms: u64,
    #[serde(default = "default_status_poll_attempts")]
    pub status_poll_attempts: usize,
    #[serde(default = "default_status_poll_backoff_ms")]
    pub status_poll_backoff_ms: u64,

    // Service loop
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_false")]
    pub run_once: bool,
    #[serde(default = "default_false")]
    pub dry_run: bool,
}

// Defaults
fn default_false() -> bool {
    false
}
fn default_metrics_port() -> u16 {
    0
}
fn default_mint_cache_ttl_secs() -> u64 {
    600
}
fn default_quote_timeout_ms() -> u64 {
    5_000
}
fn default_routing_max_attempts() -> usize {
    3
}
fn default_slippage_bps_steps() -> Vec<u16> {
    vec![50, 100, 300, 500]
}
fn default_max_accounts_steps() -> Vec<u16> {
    vec![64, 48, 32, 24]
}
fn default_compute_unit_limit_fallback() -> u32 {
    400_000
}
fn default_compute_unit_price_fallback() -> u64 {
    50_000
}
fn default_send_max_retries() -> usize {
    3
}
fn default_confirm_timeout_ms() -> u64 {
    60_000
}
fn default_confirm_poll_ms() -> u64 {
    1_000
}
fn default_status_poll_attempts() -> usize {
    5
}
fn default_status_poll_backoff_ms() -> u64 {
    2_000
}
fn default_poll_interval_secs() -> u64 {
    15
}

fn deserialize_u16_list<'de, D>(deserializer: D) -> Result<Vec<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{Error, SeqAccess, Visitor};

    struct ListVisitor;

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<u16>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a sequence of integers or a comma-separated string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            parse_u16_list(v).map_err(E::custom)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u16::try_from(v).map(|n| vec![n]).map_err(E::custom)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u16::try_from(v).map(|n| vec![n]).map_err(E::custom)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = Vec::new();
            while let Some(elem) = seq.next_element::<u16>()? {
                out.push(elem);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(ListVisitor)
}

impl GlobalSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let selected_config = resolve_config_path(path);
        let mut builder = Config::builder();

        if let Some(ref selected_path) = selected_config {
            builder = builder.add_source(File::from(Path::new(selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Precedence: CLI (in main) > env/.env > selected profile file.
        builder = builder.add_source(Environment::default());

        let mut settings: GlobalSettings = builder.build()?.try_deserialize()?;

        // List-valued env vars arrive as plain strings; parse them explicitly.
        if let Ok(raw) = std::env::var("SLIPPAGE_BPS_STEPS") {
            settings.slippage_bps_steps = parse_u16_list(&raw).map_err(AppError::Config)?;
        }
        if let Ok(raw) = std::env::var("MAX_ACCOUNTS_STEPS") {
            settings.max_accounts_steps = parse_u16_list(&raw).map_err(AppError::Config)?;
        }
        if let Some(once) = env_bool("RUN_ONCE") {
            settings.run_once = once;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.executor_keypair_path.trim().is_empty() {
            return Err(AppError::Config(
                "EXECUTOR_KEYPAIR_PATH is missing".to_string(),
            ));
        }
        Url::parse(&self.rpc_url)
            .map_err(|e| AppError::Config(format!("Invalid RPC URL {}: {e}", self.rpc_url)))?;
        self.program_pubkey()?;
        if self.cluster == Cluster::Mainnet && self.jupiter_api_key_value().is_none() {
            return Err(AppError::Config(
                "JUPITER_API_KEY is required on mainnet".to_string(),
            ));
        }
        if self.compute_unit_limit_fallback == 0
            || self.compute_unit_limit_fallback > MAX_COMPUTE_UNITS
        {
            return Err(AppError::Validation {
                field: "compute_unit_limit_fallback".to_string(),
                message: format!("must be within 1..={MAX_COMPUTE_UNITS}"),
            });
        }
        validate_steps("slippage_bps_steps", &self.slippage_bps_steps, true)?;
        validate_steps("max_accounts_steps", &self.max_accounts_steps, false)?;
        Ok(())
    }

    pub fn program_pubkey(&self) -> Result<Pubkey, AppError> {
        parse_pubkey(&self.program_id).ok_or_else(|| AppError::Validation {
            field: "program_id".to_string(),
            message: format!("'{}' is not a base58 public key", self.program_id),
        })
    }

    pub fn jupiter_api_url_value(&self) -> String {
        self.jupiter_api_url
            .as_ref()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                if self.jupiter_api_key_value().is_some() {
                    DEFAULT_JUPITER_API_URL.to_string()
                } else {
                    DEFAULT_JUPITER_LITE_API_URL.to_string()
                }
            })
    }

    pub fn jupiter_api_key_value(&self) -> Option<String> {
        self.jupiter_api_key
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Pool file for the configured cluster; `data/pools/<cluster>.json` unless overridden.
    pub fn reward_pool_path(&self) -> Result<String, AppError> {
        let default_path = format!("pools/{}.json", self.cluster);
        let raw = std::env::var("REWARD_POOL_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.reward_pool_path
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
            })
            .unwrap_or(default_path);
        let resolved = resolve_required_data_path(&raw, self.data_dir.as_deref())?;
        Ok(resolved.to_string_lossy().to_string())
    }

    pub fn executor_keypair_path_value(&self) -> String {
        resolve_data_path(self.executor_keypair_path.trim(), self.data_dir.as_deref())
            .to_string_lossy()
            .to_string()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms.max(250))
    }

    pub fn routing_max_attempts_value(&self) -> usize {
        self.routing_max_attempts.clamp(1, 10)
    }

    pub fn confirm_poll(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_ms.max(10))
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms.max(self.confirm_poll_ms.max(10)))
    }

    pub fn status_poll_attempts_value(&self) -> usize {
        self.status_poll_attempts.max(1)
    }

    pub fn status_poll_backoff(&self) -> Duration {
        Duration::from_millis(self.status_poll_backoff_ms.max(10))
    }

    pub fn mint_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.mint_cache_ttl_secs.max(1))
    }
}

/// Read the executor's signing key from a JSON keypair file.
pub fn load_executor_keypair(path: &str) -> Result<Keypair, AppError> {
    read_keypair_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to read executor keypair {path}: {e}").into())
}

fn validate_steps(field: &str, steps: &[u16], ascending: bool) -> Result<(), AppError> {
    if steps.is_empty() || steps.contains(&0) {
        return Err(AppError::Validation {
            field: field.to_string(),
            message: "must be a non-empty list of positive values".to_string(),
        });
    }
    let ordered = steps.windows(2).all(|w| {
        if ascending {
            w[0] < w[1]
        } else {
            w[0] > w[1]
        }
    });
    if !ordered {
        return Err(AppError::Validation {
            field: field.to_string(),
            message: format!(
                "must be strictly {} ({steps:?})",
                if ascending { "increasing" } else { "decreasing" }
            ),
        });
    }
    Ok(())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().as_deref().and_then(parse_boolish)
}

fn resolve_config_path(path: Option<&str>) -> Option<String> {
    if let Some(path) = path {
        return Some(path.to_string());
    }
    detect_active_config_file()
}

fn detect_active_config_file() -> Option<String> {
    let priority_files = ["config.prod.toml", "config.devnet.toml", "config.toml"];

    for file in priority_files.iter() {
        if let Some(true) = config_has_active_flag(file) {
            return Some((*file).to_string());
        }
    }

    // Fallback: any config.*.toml with THIS_ACTIVE = true
    if let Ok(entries) = fs::read_dir(".") {
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str())
                && name.starts_with("config.")
                && name.ends_with(".toml")
                && let Some(true) = config_has_active_flag(name)
            {
                return Some(name.to_string());
            }
        }
    }

    None
}

fn config_has_active_flag(path: &str) -> Option<bool> {
    let p = Path::new(path);
    if !p.exists() {
        return None;
    }

    Config::builder()
        .add_source(File::from(p))
        .build()
        .ok()?
        .get_bool("THIS_ACTIVE")
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn base_settings() -> GlobalSettings {
        GlobalSettings {
            debug: false,
            log_json: false,
            cluster: Cluster::Devnet,
            data_dir: None,
            metrics_port: default_metrics_port(),
            rpc_url: "http://127.0.0.1:8899".to_string(),
            program_id: Pubkey::new_unique().to_string(),
            executor_keypair_path: "/tmp/executor.json".to_string(),
            reward_pool_path: None,
            mint_cache_ttl_secs: default_mint_cache_ttl_secs(),
            jupiter_api_url: None,
            jupiter_api_key: None,
            quote_timeout_ms: default_quote_timeout_ms(),
            routing_max_attempts: default_routing_max_attempts(),
            slippage_bps_steps: default_slippage_bps_steps(),
            max_accounts_steps: default_max_accounts_steps(),
            compute_unit_limit_fallback: default_compute_unit_limit_fallback(),
            compute_unit_price_fallback: default_compute_unit_price_fallback(),
            send_max_retries: default_send_max_retries(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
            confirm_poll_ms: default_confirm_poll_ms(),
            status_poll_attempts: default_status_poll_attempts(),
            status_poll_backoff_ms: default_status_poll_backoff_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            run_once: false,
            dry_run: false,
        }
    }

    fn temp_config(tag: &str, body: &str) -> std::path::PathBuf {
        let tmp = std::env::temp_dir().join(format!(
            "degen-config-{tag}-{}-{}.toml",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::write(&tmp, body).expect("write temp config");
        tmp
    }

    #[test]
    fn defaults_validate_on_devnet() {
        assert!(base_settings().validate().is_ok());
    }

    #[test]
    fn mainnet_requires_routing_credentials() {
        let mut settings = base_settings();
        settings.cluster = Cluster::Mainnet;
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("JUPITER_API_KEY")));
        settings.jupiter_api_key = Some("key".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn missing_keypair_path_is_fatal() {
        let mut settings = base_settings();
        settings.executor_keypair_path = "  ".to_string();
        assert!(matches!(settings.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn step_sequences_must_be_ordered() {
        let mut settings = base_settings();
        settings.slippage_bps_steps = vec![100, 50];
        assert!(matches!(
            settings.validate(),
            Err(AppError::Validation { field, .. }) if field == "slippage_bps_steps"
        ));

        let mut settings = base_settings();
        settings.max_accounts_steps = vec![32, 64];
        assert!(matches!(
            settings.validate(),
            Err(AppError::Validation { field, .. }) if field == "max_accounts_steps"
        ));

        let mut settings = base_settings();
        settings.max_accounts_steps.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn compute_limit_fallback_respects_ledger_ceiling() {
        let mut settings = base_settings();
        settings.compute_unit_limit_fallback = MAX_COMPUTE_UNITS + 1;
        assert!(matches!(
            settings.validate(),
            Err(AppError::Validation { field, .. }) if field == "compute_unit_limit_fallback"
        ));
    }

    #[test]
    fn routing_url_follows_credentials() {
        let mut settings = base_settings();
        assert_eq!(settings.jupiter_api_url_value(), DEFAULT_JUPITER_LITE_API_URL);
        settings.jupiter_api_key = Some("k".to_string());
        assert_eq!(settings.jupiter_api_url_value(), DEFAULT_JUPITER_API_URL);
        settings.jupiter_api_url = Some("https://router.example/v1/".to_string());
        assert_eq!(settings.jupiter_api_url_value(), "https://router.example/v1");
    }

    #[test]
    fn timing_values_have_safe_floor() {
        let mut settings = base_settings();
        settings.poll_interval_secs = 0;
        settings.confirm_poll_ms = 0;
        settings.confirm_timeout_ms = 1;
        settings.status_poll_attempts = 0;
        settings.routing_max_attempts = 0;
        assert_eq!(settings.poll_interval(), Duration::from_secs(1));
        assert_eq!(settings.confirm_poll(), Duration::from_millis(10));
        assert_eq!(settings.confirm_timeout(), Duration::from_millis(10));
        assert_eq!(settings.status_poll_attempts_value(), 1);
        assert_eq!(settings.routing_max_attempts_value(), 1);
    }

    #[test]
    fn unreadable_keypair_names_the_path() {
        let path = "/nonexistent/degen-executor/keypair.json";
        let err = load_executor_keypair(path).unwrap_err();
        assert!(matches!(&err, AppError::Unknown(_)));
        assert!(err.to_string().contains(path));
    }

    #[test]
    fn explicit_config_path_wins_over_active_discovery() {
        let resolved = resolve_config_path(Some("custom-config.toml"));
        assert_eq!(resolved.as_deref(), Some("custom-config.toml"));
    }

    #[test]
    fn file_lists_and_env_overrides_are_applied() {
        let _env_lock = env_lock_guard();
        let program_id = Pubkey::new_unique();
        let tmp = temp_config(
            "lists",
            &format!(
                r#"
cluster = "devnet"
rpc_url = "http://127.0.0.1:8899"
program_id = "{program_id}"
executor_keypair_path = "/tmp/file-keypair.json"
max_accounts_steps = [40, 20]
"#
            ),
        );
        let old_steps = std::env::var("SLIPPAGE_BPS_STEPS").ok();
        let old_key = std::env::var("EXECUTOR_KEYPAIR_PATH").ok();
        unsafe {
            std::env::set_var("SLIPPAGE_BPS_STEPS", "25,75");
            std::env::set_var("EXECUTOR_KEYPAIR_PATH", "/tmp/env-keypair.json");
        }

        let loaded = GlobalSettings::load_with_path(Some(tmp.to_str().expect("utf8 path")));

        std::fs::remove_file(&tmp).ok();
        unsafe {
            match old_steps {
                Some(v) => std::env::set_var("SLIPPAGE_BPS_STEPS", v),
                None => std::env::remove_var("SLIPPAGE_BPS_STEPS"),
            }
            match old_key {
                Some(v) => std::env::set_var("EXECUTOR_KEYPAIR_PATH", v),
                None => std::env::remove_var("EXECUTOR_KEYPAIR_PATH"),
            }
        }

        let loaded = loaded.expect("load settings");
        assert_eq!(loaded.max_accounts_steps, vec![40, 20]);
        assert_eq!(loaded.slippage_bps_steps, vec![25, 75]);
        assert_eq!(loaded.executor_keypair_path, "/tmp/env-keypair.json");
        assert_eq!(loaded.program_pubkey().expect("program id"), program_id);
    }
}
