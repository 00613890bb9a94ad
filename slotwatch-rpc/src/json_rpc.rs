//! JSON-RPC sample source for Solana-compatible nodes.
//!
//! Each read is a single JSON-RPC 2.0 `POST` to the configured endpoint.
//!
//! ## Methods Used
//!
//! - **`getSlot`**: current slot
//! - **`getBlockTime`**: block timestamp for a slot
//! - **`getRecentPerformanceSamples`**: latest sample window (limit 1)
//! - **`getVoteAccounts`**: voting validator count
//!
//! ## Example
//!
//! ```rust,no_run
//! use slotwatch_rpc::json_rpc::JsonRpcSource;
//! use slotwatch_rpc::SampleSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = JsonRpcSource::builder()
//!         .endpoint("https://api.devnet.solana.com")
//!         .max_retries(2)
//!         .build()?;
//!
//!     let slot = source.fetch_current_slot().await?;
//!     let block_time = source.fetch_block_time(slot).await?;
//!     let sample = source.fetch_performance_sample().await?;
//!
//!     println!("slot {} at {:?}: {:?}", slot, block_time, sample.map(|s| s.derive()));
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use slotwatch_types::PerformanceSample;

use crate::{SampleSource, TransportError};

/// Public mainnet endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

/// Error codes the node uses when a slot has no block (skipped, pruned, or
/// not yet available). These mean "no timestamp", not a failed read.
const BLOCK_NOT_AVAILABLE: i64 = -32004;
const SLOT_SKIPPED: i64 = -32007;
const LONG_TERM_STORAGE_SLOT_SKIPPED: i64 = -32009;

/// JSON-RPC source for polling a Solana-compatible node.
#[derive(Debug)]
pub struct JsonRpcSource {
    client: Client,
    endpoint: String,
    description: String,
    max_retries: u32,
    retry_delay: Duration,
    next_id: AtomicU64,
}

impl JsonRpcSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> JsonRpcSourceBuilder {
        JsonRpcSourceBuilder::default()
    }

    /// The endpoint this source polls.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue a call, retrying transport failures up to `max_retries` times.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[Value],
    ) -> Result<Option<T>, TransportError> {
        let mut attempt = 0;
        loop {
            match self.call_once(method, params).await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(method, attempt, error = %err, "retrying RPC call");
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                result => return result,
            }
        }
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[Value],
    ) -> Result<Option<T>, TransportError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::Http(format!(
                "RPC endpoint returned status {}",
                response.status()
            )));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))?;

        body.into_result()
    }
}

#[async_trait]
impl SampleSource for JsonRpcSource {
    async fn fetch_current_slot(&self) -> Result<u64, TransportError> {
        self.call::<u64>("getSlot", &[])
            .await?
            .ok_or_else(|| TransportError::Parse("getSlot returned no result".to_string()))
    }

    async fn fetch_block_time(&self, slot: u64) -> Result<Option<i64>, TransportError> {
        match self.call::<i64>("getBlockTime", &[Value::from(slot)]).await {
            Err(TransportError::Rpc { code, .. }) if is_missing_block(code) => Ok(None),
            other => other,
        }
    }

    async fn fetch_performance_sample(&self) -> Result<Option<PerformanceSample>, TransportError> {
        let samples = self
            .call::<Vec<Value>>("getRecentPerformanceSamples", &[Value::from(1)])
            .await?;
        Ok(first_valid_sample(samples.unwrap_or_default()))
    }

    async fn fetch_validator_count(&self) -> Result<Option<u64>, TransportError> {
        let accounts = self.call::<VoteAccounts>("getVoteAccounts", &[]).await?;
        Ok(accounts.map(|a| a.current.len() as u64))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for JsonRpcSource.
#[derive(Debug, Default)]
pub struct JsonRpcSourceBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_delay: Option<Duration>,
}

impl JsonRpcSourceBuilder {
    /// Set the RPC endpoint URL (default: public mainnet).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the per-request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set how many times a failed request is retried (default: 3).
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the base delay between retries; attempt `n` waits `n * delay`
    /// (default: 200 milliseconds).
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<JsonRpcSource, TransportError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Ok(JsonRpcSource {
            client,
            description: format!("json-rpc: {}", endpoint),
            endpoint,
            max_retries: self.max_retries.unwrap_or(3),
            retry_delay: self.retry_delay.unwrap_or(Duration::from_millis(200)),
            next_id: AtomicU64::new(1),
        })
    }
}

fn is_missing_block(code: i64) -> bool {
    matches!(
        code,
        BLOCK_NOT_AVAILABLE | SLOT_SKIPPED | LONG_TERM_STORAGE_SLOT_SKIPPED
    )
}

// A malformed sample is treated like no sample at all.
fn first_valid_sample(samples: Vec<Value>) -> Option<PerformanceSample> {
    let first = samples.into_iter().next()?;
    match serde_json::from_value(first) {
        Ok(sample) => Some(sample),
        Err(e) => {
            debug!(error = %e, "discarding malformed performance sample");
            None
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "no_params")]
    params: &'a [Value],
}

fn no_params(params: &&[Value]) -> bool {
    params.is_empty()
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<Option<T>, TransportError> {
        match self.error {
            Some(err) => Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            }),
            None => Ok(self.result),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct VoteAccounts {
    #[serde(default)]
    current: Vec<IgnoredAny>,
}
