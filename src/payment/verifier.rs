// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Payment verification: fetch a transaction by hash and normalize it into
//! a single `VerifiedTransfer`.
//!
//! Native-asset and token transfers have different on-chain layouts but
//! the same output shape; the dispatch on `AssetKind` lives here and only
//! here.

use crate::chain_client::ChainClientInner;
use crate::error::{ContestError, ContestResult};
use crate::types::{AssetKind, VerifiedTransfer};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PaymentVerifier {
    chain_client: Arc<dyn ChainClientInner>,
}

impl PaymentVerifier {
    pub fn new(chain_client: Arc<dyn ChainClientInner>) -> Self {
        Self { chain_client }
    }

    /// Fetch `tx_hash` and pick out the transfer of `asset` it carries.
    ///
    /// Returns None when the node does not know the transaction yet (the
    /// reference scan can race ahead of transaction availability) and a
    /// transfer with `confirmed == false` when the transaction is known
    /// but not yet successfully confirmed.
    ///
    /// When the transaction carries several matching transfers, the one
    /// paying `preferred_recipient` wins; otherwise the first one is
    /// reported, so that recipient validation downstream sees the actual
    /// on-chain destination.
    pub async fn verify(
        &self,
        tx_hash: &str,
        asset: &AssetKind,
        preferred_recipient: &str,
    ) -> ContestResult<Option<VerifiedTransfer>> {
        let detail = match self.chain_client.get_transaction(tx_hash).await {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                debug!("[Verifier] Tx {} not yet available", tx_hash);
                return Ok(None);
            }
            Err(e) if e.is_transient() => {
                warn!("[Verifier] Transient chain error for tx {}: {:?}", tx_hash, e);
                return Ok(None);
            }
            Err(e) => return Err(ContestError::RpcError(e.to_string())),
        };

        let matching: Vec<_> = detail
            .transfers
            .iter()
            .filter(|t| t.asset == *asset)
            .collect();
        let transfer = matching
            .iter()
            .find(|t| t.to == preferred_recipient)
            .or_else(|| matching.first())
            .ok_or_else(|| ContestError::NoMatchingTransfer(tx_hash.to_string()))?;

        Ok(Some(VerifiedTransfer {
            confirmed: detail.confirmed,
            from: transfer.from.clone(),
            to: transfer.to.clone(),
            amount: transfer.amount,
            asset: transfer.asset.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_mock_client::MockChainClient;
    use crate::types::{RawTransfer, TransactionDetail};

    fn native(from: &str, to: &str, amount: u64) -> RawTransfer {
        RawTransfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            asset: AssetKind::Native,
        }
    }

    fn token(from: &str, to: &str, amount: u64, mint: &str) -> RawTransfer {
        RawTransfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            asset: AssetKind::Token(mint.to_string()),
        }
    }

    fn detail(tx: &str, confirmed: bool, transfers: Vec<RawTransfer>) -> TransactionDetail {
        TransactionDetail {
            tx_hash: tx.to_string(),
            confirmed,
            fee_payer: "Payer111".to_string(),
            transfers,
        }
    }

    #[tokio::test]
    async fn test_native_transfer_normalized() {
        let mock = MockChainClient::new();
        mock.set_transaction(detail(
            "sig1",
            true,
            vec![native("Payer111", "Recipient111", 5000)],
        ));
        let verifier = PaymentVerifier::new(Arc::new(mock));

        let transfer = verifier
            .verify("sig1", &AssetKind::Native, "Recipient111")
            .await
            .unwrap()
            .unwrap();
        assert!(transfer.confirmed);
        assert_eq!(transfer.from, "Payer111");
        assert_eq!(transfer.to, "Recipient111");
        assert_eq!(transfer.amount, 5000);
        assert_eq!(transfer.asset, AssetKind::Native);
    }

    #[tokio::test]
    async fn test_token_transfer_selected_by_mint() {
        let mock = MockChainClient::new();
        mock.set_transaction(detail(
            "sig1",
            true,
            vec![
                native("Payer111", "Recipient111", 1),
                token("Payer111", "TokenAcct111", 2500, "Mint111"),
                token("Payer111", "TokenAcct222", 9999, "OtherMint"),
            ],
        ));
        let verifier = PaymentVerifier::new(Arc::new(mock));

        let transfer = verifier
            .verify(
                "sig1",
                &AssetKind::Token("Mint111".to_string()),
                "TokenAcct111",
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transfer.amount, 2500);
        assert_eq!(transfer.asset, AssetKind::Token("Mint111".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tx_is_pending() {
        let verifier = PaymentVerifier::new(Arc::new(MockChainClient::new()));
        assert!(verifier
            .verify("sig1", &AssetKind::Native, "Recipient111")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_no_matching_asset_is_error() {
        let mock = MockChainClient::new();
        mock.set_transaction(detail(
            "sig1",
            true,
            vec![token("Payer111", "TokenAcct111", 2500, "Mint111")],
        ));
        let verifier = PaymentVerifier::new(Arc::new(mock));
        assert!(matches!(
            verifier.verify("sig1", &AssetKind::Native, "Recipient111").await,
            Err(ContestError::NoMatchingTransfer(_))
        ));
    }

    #[tokio::test]
    async fn test_mismatched_recipient_still_reported() {
        // The transfer goes somewhere else entirely; the verifier reports
        // the actual destination so validation can reject it.
        let mock = MockChainClient::new();
        mock.set_transaction(detail(
            "sig1",
            true,
            vec![native("Payer111", "Attacker111", 5000)],
        ));
        let verifier = PaymentVerifier::new(Arc::new(mock));

        let transfer = verifier
            .verify("sig1", &AssetKind::Native, "Recipient111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transfer.to, "Attacker111");
    }

    #[tokio::test]
    async fn test_unconfirmed_transaction_flagged() {
        let mock = MockChainClient::new();
        mock.set_transaction(detail(
            "sig1",
            false,
            vec![native("Payer111", "Recipient111", 5000)],
        ));
        let verifier = PaymentVerifier::new(Arc::new(mock));
        let transfer = verifier
            .verify("sig1", &AssetKind::Native, "Recipient111")
            .await
            .unwrap()
            .unwrap();
        assert!(!transfer.confirmed);
    }
}
