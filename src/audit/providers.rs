//! External data providers used by the audit
//!
//! Holder distribution and honeypot detection are not computed locally.
//! They come from pluggable providers behind two capability traits, so the
//! auditor can run against a real API, the built-in simulator, or a
//! deterministic fake in tests.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};

/// Holder distribution summary for a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderData {
    pub count: u64,
    /// Share of supply held by the largest holder (%)
    pub top_holder_percent: f64,
}

/// Honeypot verdict for a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotReport {
    pub is_honeypot: bool,
    /// Buy tax (%)
    #[serde(default)]
    pub buy_tax: f64,
    /// Sell tax (%)
    #[serde(default)]
    pub sell_tax: f64,
}

/// Source of holder distribution data
#[async_trait]
pub trait HolderDataProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    async fn fetch_holder_data(&self, mint: &str) -> Result<HolderData>;
}

/// Source of honeypot verdicts
#[async_trait]
pub trait HoneypotProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    async fn detect_honeypot(&self, mint: &str) -> Result<HoneypotReport>;
}

/// Holder data from the Helius DAS `getTokenAccounts` method
pub struct HeliusHolderProvider {
    client: Client,
    rpc_url: String,
    /// Accounts fetched per lookup
    limit: u32,
}

impl HeliusHolderProvider {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        Self::with_rpc_url(
            format!("https://mainnet.helius-rpc.com/?api-key={}", api_key),
            timeout,
        )
    }

    pub fn with_rpc_url(rpc_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rpc_url,
            limit: 1000,
        })
    }

    /// Summarize holder balances into count and top-holder share
    fn summarize(accounts: &[TokenAccount]) -> HolderData {
        let balances: Vec<u64> = accounts
            .iter()
            .map(|a| a.amount)
            .filter(|amount| *amount > 0)
            .collect();
        let total: u64 = balances.iter().sum();
        let top = balances.iter().copied().max().unwrap_or(0);

        HolderData {
            count: balances.len() as u64,
            top_holder_percent: if total > 0 {
                top as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

#[async_trait]
impl HolderDataProvider for HeliusHolderProvider {
    fn name(&self) -> &'static str {
        "helius"
    }

    async fn fetch_holder_data(&self, mint: &str) -> Result<HolderData> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "holder-audit",
            "method": "getTokenAccounts",
            "params": {
                "page": 1,
                "limit": self.limit,
                "mint": mint,
                "options": {
                    "showZeroBalance": false
                }
            }
        });

        debug!("Fetching token holders for {}", mint);

        let response = self.client.post(&self.rpc_url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Helius RPC error {}: {}", status, body)));
        }

        let rpc_response: RpcResponse<TokenAccountsResult> = response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("Failed to parse RPC response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(Error::Provider(format!("Helius RPC error: {}", error.message)));
        }

        let result = rpc_response
            .result
            .ok_or_else(|| Error::Provider("No result in Helius RPC response".to_string()))?;

        Ok(Self::summarize(&result.token_accounts))
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenAccountsResult {
    #[serde(rename = "token_accounts", default)]
    token_accounts: Vec<TokenAccount>,
}

#[derive(Debug, Deserialize)]
struct TokenAccount {
    amount: u64,
}

/// Honeypot verdicts from an HTTP detector
///
/// Issues `GET {base_url}/{mint}` and expects a JSON body shaped like
/// [`HoneypotReport`] (`isHoneypot`, `buyTax`, `sellTax`).
pub struct HttpHoneypotProvider {
    client: Client,
    base_url: String,
}

impl HttpHoneypotProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HoneypotProvider for HttpHoneypotProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn detect_honeypot(&self, mint: &str) -> Result<HoneypotReport> {
        let url = format!("{}/{}", self.base_url, mint);
        debug!("Requesting honeypot verdict for {}", mint);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Honeypot API error {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("Failed to parse honeypot verdict: {}", e)))
    }
}

/// Randomized stand-in for both providers
///
/// Useful for running the monitor without API keys. Holder counts fall in
/// 10..110, the top holder owns 5 to 35 %, one token in ten is a honeypot and
/// taxes stay under 5 %.
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    latency: Duration,
}

impl SimulatedProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl HolderDataProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn fetch_holder_data(&self, _mint: &str) -> Result<HolderData> {
        let data = {
            let mut rng = rand::thread_rng();
            HolderData {
                count: rng.gen_range(10..110),
                top_holder_percent: rng.gen_range(5.0..35.0),
            }
        };
        tokio::time::sleep(self.latency).await;
        Ok(data)
    }
}

#[async_trait]
impl HoneypotProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn detect_honeypot(&self, _mint: &str) -> Result<HoneypotReport> {
        let report = {
            let mut rng = rand::thread_rng();
            HoneypotReport {
                is_honeypot: rng.gen_bool(0.1),
                buy_tax: rng.gen_range(0.0..5.0),
                sell_tax: rng.gen_range(0.0..5.0),
            }
        };
        tokio::time::sleep(self.latency).await;
        Ok(report)
    }
}
