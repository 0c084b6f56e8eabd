// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::types::AssetKind;
use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use tracing::info;

// Config trait shared by node configuration files. Supports both YAML and
// JSON formats based on the file extension.
pub trait Config: Serialize + DeserializeOwned {
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = if matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        ) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(config)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    // Rpc url for the chain fullnode, used to locate and fetch transactions.
    pub chain_rpc_url: String,
    // Per-request timeout for chain RPC calls.
    #[serde(default = "default_rpc_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PaymentConfig {
    // The server-held recipient address every verified payment must pay to.
    // Never taken from client input.
    pub recipient_address: String,
    // Ledger currency code for entries written by this node, e.g. "SOL".
    pub currency: String,
    // Decimal places of the smallest currency unit, used for display amounts
    // in payment-request URIs.
    pub currency_decimals: u8,
    // Token mint address. When set, payments are verified as token
    // transfers of this mint instead of native transfers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_mint: Option<String>,
    // Label shown by wallets on the payment request.
    pub label: String,
}

impl PaymentConfig {
    pub fn asset_kind(&self) -> AssetKind {
        match &self.token_mint {
            Some(mint) => AssetKind::Token(mint.clone()),
            None => AssetKind::Native,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContestNodeConfig {
    // The port that the API server listens on.
    pub server_listen_port: u16,
    // The port for the metrics server.
    pub metrics_port: u16,
    // Chain configuration
    pub chain: ChainConfig,
    // Payment configuration
    pub payment: PaymentConfig,
}

impl Config for ContestNodeConfig {}

impl ContestNodeConfig {
    /// Validate the configuration before the node starts. Misconfiguration
    /// is a startup failure, not a per-request one.
    pub fn validate(&self) -> Result<()> {
        info!("Starting config validation");
        if self.chain.chain_rpc_url.is_empty() {
            return Err(anyhow!("chain-rpc-url must not be empty"));
        }
        if self.payment.recipient_address.is_empty() {
            return Err(anyhow!("payment recipient-address must not be empty"));
        }
        if self.payment.currency.is_empty() {
            return Err(anyhow!("payment currency must not be empty"));
        }
        if self.payment.currency_decimals > 18 {
            return Err(anyhow!(
                "payment currency-decimals {} exceeds the supported maximum of 18",
                self.payment.currency_decimals
            ));
        }
        if let Some(mint) = &self.payment.token_mint {
            if mint.is_empty() {
                return Err(anyhow!("payment token-mint must not be empty when set"));
            }
        }
        info!("Config validation complete");
        Ok(())
    }
}
