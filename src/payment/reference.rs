// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Payment-request encoding.
//!
//! A payment request is rendered as a URI the client hands to the user's
//! wallet. The `reference` parameter is a single-use random key the wallet
//! embeds in the transaction's account keys; the resolver later scans for
//! it to locate the payment. References are never reused across attempts.

use crate::utils::format_decimal_amount;
use rand::RngCore;
use url::form_urlencoded;

pub const PAYMENT_URI_SCHEME: &str = "solana";

/// Generate a fresh single-use reference key (base58, 32 random bytes, the
/// same shape as an address so it can ride along as an account key).
pub fn new_reference() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bs58::encode(bytes).into_string()
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub recipient: String,
    /// Amount in the smallest currency unit
    pub amount: u64,
    /// Decimal places used to render the display amount
    pub decimals: u8,
    pub reference: String,
    pub label: String,
    pub message: String,
    /// Correlation string carried in the transaction memo
    pub memo: String,
    pub token_mint: Option<String>,
}

impl PaymentRequest {
    pub fn to_uri(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("amount", &format_decimal_amount(self.amount, self.decimals))
            .append_pair("reference", &self.reference)
            .append_pair("label", &self.label)
            .append_pair("message", &self.message)
            .append_pair("memo", &self.memo);
        if let Some(mint) = &self.token_mint {
            query.append_pair("token", mint);
        }
        format!(
            "{}:{}?{}",
            PAYMENT_URI_SCHEME,
            self.recipient,
            query.finish()
        )
    }
}
