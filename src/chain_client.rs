// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Chain client seam.
//!
//! `ChainClientInner` is the only contact surface the payment pipeline has
//! with the external ledger: locate a transaction that embedded a
//! reference key, and fetch a transaction's detail by hash. The JSON-RPC
//! implementation below speaks the chain node's wire format; tests use a
//! preset-response mock.

use crate::metrics::ContestMetrics;
use crate::types::{AssetKind, RawTransfer, TransactionDetail};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("transient rpc error: {0}")]
    Transient(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// Transient errors degrade to "not found yet" on the polling path;
    /// the client's polling loop is the retry mechanism.
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Http(_) | RpcError::Transient(_))
    }
}

#[async_trait]
pub trait ChainClientInner: Send + Sync {
    /// Most recent transaction hash that embedded `reference` in its
    /// account keys, if any.
    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<String>, RpcError>;

    /// Full transaction detail for `tx_hash`. None when the node does not
    /// know the transaction yet.
    async fn get_transaction(&self, tx_hash: &str) -> Result<Option<TransactionDetail>, RpcError>;
}

pub struct ChainJsonRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    metrics: Arc<ContestMetrics>,
}

impl ChainJsonRpcClient {
    pub fn new(rpc_url: &str, request_timeout: Duration, metrics: Arc<ContestMetrics>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("failed to build http client");
        Self {
            http,
            rpc_url: rpc_url.to_string(),
            metrics,
        }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.metrics
            .chain_rpc_queries
            .with_label_values(&[method])
            .inc();
        let timer = self
            .metrics
            .chain_rpc_latency
            .with_label_values(&[method])
            .start_timer();

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let result = async {
            let response: Value = self
                .http
                .post(&self.rpc_url)
                .json(&body)
                .send()
                .await?
                .json()
                .await?;
            if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
                let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                // Node-side throttling and catch-up codes are transient
                if code == 429 || code == -32005 {
                    return Err(RpcError::Transient(message));
                }
                return Err(RpcError::Rpc { code, message });
            }
            response
                .get("result")
                .cloned()
                .ok_or_else(|| RpcError::InvalidResponse("missing result field".to_string()))
        }
        .await;
        timer.observe_duration();

        if result.is_err() {
            self.metrics
                .chain_rpc_errors
                .with_label_values(&[method])
                .inc();
        }
        result
    }

    fn parse_transaction_detail(tx_hash: &str, result: &Value) -> Result<TransactionDetail, RpcError> {
        let meta = result
            .get("meta")
            .filter(|m| !m.is_null())
            .ok_or_else(|| RpcError::InvalidResponse("missing meta".to_string()))?;
        let confirmed = meta.get("err").map(Value::is_null).unwrap_or(false);

        let message = result
            .pointer("/transaction/message")
            .ok_or_else(|| RpcError::InvalidResponse("missing transaction message".to_string()))?;
        let fee_payer = account_key(message, 0)
            .ok_or_else(|| RpcError::InvalidResponse("missing fee payer".to_string()))?;

        let mut transfers = Vec::new();
        if let Some(instructions) = message.get("instructions").and_then(Value::as_array) {
            for instruction in instructions {
                if let Some(transfer) = parse_transfer_instruction(instruction) {
                    transfers.push(transfer);
                }
            }
        }

        Ok(TransactionDetail {
            tx_hash: tx_hash.to_string(),
            confirmed,
            fee_payer,
            transfers,
        })
    }
}

/// Account keys arrive either as plain strings or as `{pubkey: ...}`
/// objects depending on the encoding the node used.
fn account_key(message: &Value, index: usize) -> Option<String> {
    let key = message.get("accountKeys")?.as_array()?.get(index)?;
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("pubkey")?.as_str().map(|s| s.to_string()),
        _ => None,
    }
}

/// Parse one instruction into a normalized transfer, if it is one.
///
/// Native transfers are system-program `transfer` instructions with a
/// lamport amount; token transfers are token-program `transferChecked`
/// instructions, which carry the mint alongside the raw amount.
fn parse_transfer_instruction(instruction: &Value) -> Option<RawTransfer> {
    let program = instruction.get("program")?.as_str()?;
    let parsed = instruction.get("parsed")?;
    let kind = parsed.get("type")?.as_str()?;
    let info = parsed.get("info")?;

    match (program, kind) {
        ("system", "transfer") => Some(RawTransfer {
            from: info.get("source")?.as_str()?.to_string(),
            to: info.get("destination")?.as_str()?.to_string(),
            amount: info.get("lamports")?.as_u64()?,
            asset: AssetKind::Native,
        }),
        ("spl-token", "transferChecked") => {
            let amount = info
                .pointer("/tokenAmount/amount")?
                .as_str()?
                .parse::<u64>()
                .ok()?;
            Some(RawTransfer {
                from: info
                    .get("authority")
                    .or_else(|| info.get("multisigAuthority"))?
                    .as_str()?
                    .to_string(),
                to: info.get("destination")?.as_str()?.to_string(),
                amount,
                asset: AssetKind::Token(info.get("mint")?.as_str()?.to_string()),
            })
        }
        _ => None,
    }
}

#[async_trait]
impl ChainClientInner for ChainJsonRpcClient {
    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<String>, RpcError> {
        let result = self
            .rpc_call(
                "getSignaturesForAddress",
                json!([reference, { "limit": 1 }]),
            )
            .await?;
        let signatures = result
            .as_array()
            .ok_or_else(|| RpcError::InvalidResponse("expected signature array".to_string()))?;
        let found = signatures
            .first()
            .and_then(|entry| entry.get("signature"))
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        debug!(
            "[ChainClient] Reference scan for {}: {:?}",
            reference, found
        );
        Ok(found)
    }

    async fn get_transaction(&self, tx_hash: &str) -> Result<Option<TransactionDetail>, RpcError> {
        let result = self
            .rpc_call(
                "getTransaction",
                json!([tx_hash, { "encoding": "jsonParsed", "commitment": "confirmed" }]),
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Self::parse_transaction_detail(tx_hash, &result).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed_tx(confirmed: bool) -> Value {
        json!({
            "meta": { "err": if confirmed { Value::Null } else { json!({"InstructionError": [0, "Custom"]}) } },
            "transaction": {
                "message": {
                    "accountKeys": [
                        { "pubkey": "Payer111" },
                        { "pubkey": "Recipient111" },
                    ],
                    "instructions": [
                        {
                            "program": "system",
                            "programId": "11111111111111111111111111111111",
                            "parsed": {
                                "type": "transfer",
                                "info": {
                                    "source": "Payer111",
                                    "destination": "Recipient111",
                                    "lamports": 5_000_000u64,
                                }
                            }
                        },
                        {
                            "program": "spl-token",
                            "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                            "parsed": {
                                "type": "transferChecked",
                                "info": {
                                    "authority": "Payer111",
                                    "destination": "TokenAcct111",
                                    "mint": "Mint111",
                                    "tokenAmount": { "amount": "2500" }
                                }
                            }
                        },
                        {
                            "program": "memo",
                            "programId": "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr",
                            "parsed": "contest:c1"
                        }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parse_transaction_detail() {
        let detail =
            ChainJsonRpcClient::parse_transaction_detail("sig1", &parsed_tx(true)).unwrap();
        assert!(detail.confirmed);
        assert_eq!(detail.fee_payer, "Payer111");
        assert_eq!(detail.transfers.len(), 2);
        assert_eq!(
            detail.transfers[0],
            RawTransfer {
                from: "Payer111".to_string(),
                to: "Recipient111".to_string(),
                amount: 5_000_000,
                asset: AssetKind::Native,
            }
        );
        assert_eq!(
            detail.transfers[1].asset,
            AssetKind::Token("Mint111".to_string())
        );
        assert_eq!(detail.transfers[1].amount, 2500);
    }

    #[test]
    fn test_parse_failed_transaction_is_unconfirmed() {
        let detail =
            ChainJsonRpcClient::parse_transaction_detail("sig1", &parsed_tx(false)).unwrap();
        assert!(!detail.confirmed);
    }

    #[test]
    fn test_parse_rejects_missing_meta() {
        let err =
            ChainJsonRpcClient::parse_transaction_detail("sig1", &json!({"transaction": {}}))
                .unwrap_err();
        assert!(matches!(err, RpcError::InvalidResponse(_)));
    }

    #[test]
    fn test_account_key_string_form() {
        let message = json!({ "accountKeys": ["A", "B"] });
        assert_eq!(account_key(&message, 1), Some("B".to_string()));
        assert_eq!(account_key(&message, 9), None);
    }

    #[test]
    fn test_transient_classification() {
        assert!(RpcError::Transient("throttled".to_string()).is_transient());
        assert!(!RpcError::Rpc {
            code: -32602,
            message: "bad params".to_string()
        }
        .is_transient());
        assert!(!RpcError::InvalidResponse("x".to_string()).is_transient());
    }
}
