// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! Client for the external liquidity-routing service (Jupiter swap API).

use crate::common::retry::retry_async_when;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(400);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Rate limiting, 5xx, timeouts and dropped connections.
    #[error("routing service unavailable: {0}")]
    Transient(String),

    /// Business-logic rejection (no route, untradable token, bad amount...).
    #[error("routing service rejected request ({status}): {code} {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("routing service response malformed: {0}")]
    Decode(String),
}

impl RouteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RouteError::Transient(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount: u64,
    pub slippage_bps: u16,
    pub max_accounts: Option<u16>,
    pub only_direct_routes: bool,
}

/// Parsed quote plus the raw body, which must be echoed back verbatim.
#[derive(Clone, Debug)]
pub struct Quote {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub in_amount: u64,
    pub out_amount: u64,
    /// Worst acceptable output after slippage.
    pub other_amount_threshold: u64,
    pub slippage_bps: u16,
    pub route_plan: Value,
    pub raw: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteFields {
    input_mint: String,
    output_mint: String,
    in_amount: String,
    out_amount: String,
    other_amount_threshold: String,
    slippage_bps: u16,
    #[serde(default)]
    route_plan: Value,
}

fn parse_amount(field: &str, raw: &str) -> Result<u64, RouteError> {
    raw.parse::<u64>()
        .map_err(|e| RouteError::Decode(format!("{field} '{raw}': {e}")))
}

fn parse_key(field: &str, raw: &str) -> Result<Pubkey, RouteError> {
    Pubkey::from_str(raw).map_err(|e| RouteError::Decode(format!("{field} '{raw}': {e}")))
}

impl Quote {
    pub fn from_json(raw: Value) -> Result<Self, RouteError> {
        let fields: QuoteFields = serde_json::from_value(raw.clone())
            .map_err(|e| RouteError::Decode(format!("quote: {e}")))?;
        Ok(Self {
            input_mint: parse_key("inputMint", &fields.input_mint)?,
            output_mint: parse_key("outputMint", &fields.output_mint)?,
            in_amount: parse_amount("inAmount", &fields.in_amount)?,
            out_amount: parse_amount("outAmount", &fields.out_amount)?,
            other_amount_threshold: parse_amount(
                "otherAmountThreshold",
                &fields.other_amount_threshold,
            )?,
            slippage_bps: fields.slippage_bps,
            route_plan: fields.route_plan,
            raw,
        })
    }

    /// SHA-256 of the route plan JSON, recorded on-ledger for auditability.
    pub fn route_hash(&self) -> [u8; 32] {
        let encoded = serde_json::to_vec(&self.route_plan).unwrap_or_default();
        Sha256::digest(&encoded).into()
    }

    pub fn hop_count(&self) -> usize {
        self.route_plan.as_array().map(Vec::len).unwrap_or(0)
    }
}

/// Ledger operations implementing one quote.
#[derive(Clone, Debug, Default)]
pub struct SwapInstructions {
    pub compute_budget: Vec<Instruction>,
    pub setup: Vec<Instruction>,
    pub swap: Option<Instruction>,
    pub cleanup: Option<Instruction>,
    pub lookup_tables: Vec<Pubkey>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAccount {
    pubkey: String,
    is_signer: bool,
    is_writable: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInstruction {
    program_id: String,
    accounts: Vec<WireAccount>,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSwapInstructions {
    #[serde(default)]
    compute_budget_instructions: Vec<WireInstruction>,
    #[serde(default)]
    setup_instructions: Vec<WireInstruction>,
    swap_instruction: WireInstruction,
    cleanup_instruction: Option<WireInstruction>,
    #[serde(default)]
    address_lookup_table_addresses: Vec<String>,
}

impl WireInstruction {
    fn into_instruction(self) -> Result<Instruction, RouteError> {
        let program_id = parse_key("programId", &self.program_id)?;
        let accounts = self
            .accounts
            .into_iter()
            .map(|a| {
                let key = parse_key("account", &a.pubkey)?;
                Ok(if a.is_writable {
                    AccountMeta::new(key, a.is_signer)
                } else {
                    AccountMeta::new_readonly(key, a.is_signer)
                })
            })
            .collect::<Result<Vec<_>, RouteError>>()?;
        let data = BASE64_STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| RouteError::Decode(format!("instruction data: {e}")))?;
        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl SwapInstructions {
    pub fn from_json(raw: Value) -> Result<Self, RouteError> {
        let wire: WireSwapInstructions = serde_json::from_value(raw)
            .map_err(|e| RouteError::Decode(format!("swap-instructions: {e}")))?;
        let convert = |list: Vec<WireInstruction>| {
            list.into_iter()
                .map(WireInstruction::into_instruction)
                .collect::<Result<Vec<_>, RouteError>>()
        };
        Ok(Self {
            compute_budget: convert(wire.compute_budget_instructions)?,
            setup: convert(wire.setup_instructions)?,
            swap: Some(wire.swap_instruction.into_instruction()?),
            cleanup: wire
                .cleanup_instruction
                .map(WireInstruction::into_instruction)
                .transpose()?,
            lookup_tables: wire
                .address_lookup_table_addresses
                .iter()
                .map(|s| parse_key("addressLookupTableAddresses", s))
                .collect::<Result<Vec<_>, RouteError>>()?,
        })
    }
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, RouteError>;

    async fn swap_instructions(
        &self,
        quote: &Quote,
        user: &Pubkey,
        destination: &Pubkey,
    ) -> Result<SwapInstructions, RouteError>;
}

#[derive(Clone)]
pub struct JupiterClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_attempts: usize,
}

impl JupiterClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
        max_attempts: usize,
    ) -> Result<Self, RouteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RouteError::Transient(format!("http client init: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_attempts: max_attempts.max(1),
        })
    }

    fn classify_transport(err: reqwest::Error) -> RouteError {
        RouteError::Transient(if err.is_timeout() {
            format!("timeout: {err}")
        } else {
            err.to_string()
        })
    }

    async fn read_body(resp: reqwest::Response) -> Result<Value, RouteError> {
        let status = resp.status();
        let text = resp.text().await.map_err(Self::classify_transport)?;
        if status.is_success() {
            return serde_json::from_str(&text)
                .map_err(|e| RouteError::Decode(format!("body: {e}")));
        }
        Err(classify_status(status, &text))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }

    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote, RouteError> {
        let mut params: Vec<(&str, String)> = vec![
            ("inputMint", request.input_mint.to_string()),
            ("outputMint", request.output_mint.to_string()),
            ("amount", request.amount.to_string()),
            ("slippageBps", request.slippage_bps.to_string()),
            ("swapMode", "ExactIn".to_string()),
        ];
        if let Some(max_accounts) = request.max_accounts {
            params.push(("maxAccounts", max_accounts.to_string()));
        }
        if request.only_direct_routes {
            params.push(("onlyDirectRoutes", "true".to_string()));
        }
        let resp = self
            .authorize(self.client.get(format!("{}/quote", self.base_url)))
            .query(&params)
            .send()
            .await
            .map_err(Self::classify_transport)?;
        Quote::from_json(Self::read_body(resp).await?)
    }

    async fn fetch_swap_instructions(
        &self,
        quote: &Quote,
        user: &Pubkey,
        destination: &Pubkey,
    ) -> Result<SwapInstructions, RouteError> {
        let body = json!({
            "quoteResponse": quote.raw,
            "userPublicKey": user.to_string(),
            "destinationTokenAccount": destination.to_string(),
            "wrapAndUnwrapSol": false,
            "dynamicComputeUnitLimit": true,
        });
        let resp = self
            .authorize(
                self.client
                    .post(format!("{}/swap-instructions", self.base_url)),
            )
            .json(&body)
            .send()
            .await
            .map_err(Self::classify_transport)?;
        SwapInstructions::from_json(Self::read_body(resp).await?)
    }
}

/// 429 and 5xx are transient; any other non-success status is a rejection.
fn classify_status(status: StatusCode, body: &str) -> RouteError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return RouteError::Transient(format!("{status}: {}", truncate(body, 200)));
    }
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .map(ToString::to_string)
    };
    RouteError::Rejected {
        status: status.as_u16(),
        code: field("errorCode").unwrap_or_else(|| "UNKNOWN".to_string()),
        message: field("error").unwrap_or_else(|| truncate(body, 200).to_string()),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl RouteProvider for JupiterClient {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, RouteError> {
        retry_async_when(
            |attempt| {
                if attempt > 1 {
                    tracing::debug!(target: "router", attempt, output = %request.output_mint, "Retrying quote");
                }
                self.fetch_quote(request)
            },
            self.max_attempts,
            RETRY_INITIAL_DELAY,
            RouteError::is_transient,
        )
        .await
    }

    async fn swap_instructions(
        &self,
        quote: &Quote,
        user: &Pubkey,
        destination: &Pubkey,
    ) -> Result<SwapInstructions, RouteError> {
        retry_async_when(
            |attempt| {
                if attempt > 1 {
                    tracing::debug!(target: "router", attempt, output = %quote.output_mint, "Retrying swap-instructions");
                }
                self.fetch_swap_instructions(quote, user, destination)
            },
            self.max_attempts,
            RETRY_INITIAL_DELAY,
            RouteError::is_transient,
        )
        .await
    }
}
