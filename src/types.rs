// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core domain types shared across the scheduler, the distributor and the
//! payment reconciliation pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Draft,
    Active,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub id: String,
    pub slug: String,
    pub start_at_ms: u64,
    pub end_at_ms: u64,
    pub status: ContestStatus,
    /// Prize pool in the smallest currency unit
    pub prize_pool: u64,
    /// Free-form business configuration (entry fee, voting windows, jury
    /// lists). Opaque to the scheduling and distribution core.
    pub config: serde_json::Value,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub contest_id: String,
    pub vote_count: u64,
    pub status: SubmissionStatus,
    pub created_at_ms: u64,
}

/// Asset carried by an on-chain transfer. Token transfers carry the mint
/// address they were issued from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "mint", rename_all = "snake_case")]
pub enum AssetKind {
    Native,
    Token(String),
}

/// Normalized view of an on-chain transfer, shared by the native-asset and
/// token-transfer verification paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTransfer {
    pub confirmed: bool,
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub asset: AssetKind,
}

/// Raw transaction detail as fetched from the chain, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDetail {
    pub tx_hash: String,
    pub confirmed: bool,
    pub fee_payer: String,
    pub transfers: Vec<RawTransfer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransfer {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub asset: AssetKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: u64,
    pub user_id: String,
    pub currency: String,
    /// Signed delta in the smallest currency unit
    pub delta: i64,
    pub reason: String,
    /// Unique across all entries when present; the sole replay protection
    /// for external payments
    pub external_tx_hash: Option<String>,
    pub related_contest_id: Option<String>,
    pub related_submission_id: Option<String>,
    pub created_at_ms: u64,
}

/// Ledger entry before it is assigned an id and timestamp by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub user_id: String,
    pub currency: String,
    pub delta: i64,
    pub reason: String,
    pub external_tx_hash: Option<String>,
    pub related_contest_id: Option<String>,
    pub related_submission_id: Option<String>,
}

/// One rank's share of a contest prize pool. Transient: persisted only as
/// ledger entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub rank: u8,
    pub user_id: String,
    pub submission_id: String,
    pub amount: u64,
}

/// Outcome of a single payment poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The reference has not been located on chain yet. Expected while the
    /// user completes the payment in their wallet.
    NotFound,
    /// A transaction was located but is not confirmed yet.
    PendingConfirmation { tx_hash: String },
    /// The transaction was already admitted into the ledger.
    AlreadyProcessed { tx_hash: String },
    /// The payment was verified and admitted into the ledger.
    Verified {
        tx_hash: String,
        amount: u64,
        from: String,
        to: String,
    },
}

impl PollOutcome {
    /// Metrics label for the outcome
    pub fn as_label(&self) -> &'static str {
        match self {
            PollOutcome::NotFound => "not_found",
            PollOutcome::PendingConfirmation { .. } => "pending_confirmation",
            PollOutcome::AlreadyProcessed { .. } => "already_processed",
            PollOutcome::Verified { .. } => "verified",
        }
    }
}
