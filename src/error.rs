// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::types::ContestStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContestError {
    // The reference key is empty or not valid base58
    InvalidReference(String),
    // No recipient address configured for payment verification
    RecipientNotConfigured,
    // The referenced transaction does not exist on chain
    TxNotFound,
    // Tx exists but carries no transfer of the expected asset
    NoMatchingTransfer(String),
    // An entry with this external tx hash already exists in the ledger
    DuplicateExternalTx(String),
    // On-chain sender does not match the caller's registered wallet
    PayerMismatch { expected: String, actual: String },
    // On-chain amount is below the expected amount
    AmountTooLow { expected: u64, actual: u64 },
    // On-chain recipient does not match the configured recipient
    RecipientMismatch { expected: String, actual: String },
    // Contest does not exist
    ContestNotFound(String),
    // Submission does not exist
    SubmissionNotFound(String),
    // Contest is not in a status that permits the requested transition
    InvalidStatusTransition {
        from: ContestStatus,
        to: ContestStatus,
    },
    // End time is not after start time, or otherwise unusable
    InvalidEndTime(String),
    // Transient chain RPC error, caller's polling loop is the retry mechanism
    TransientRpcError(String),
    // Permanent chain RPC error
    RpcError(String),
    // Storage error
    StorageError(String),
    // Uncategorized internal error
    InternalError(String),
}

impl ContestError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            ContestError::InvalidReference(_) => "invalid_reference",
            ContestError::RecipientNotConfigured => "recipient_not_configured",
            ContestError::TxNotFound => "tx_not_found",
            ContestError::NoMatchingTransfer(_) => "no_matching_transfer",
            ContestError::DuplicateExternalTx(_) => "duplicate_external_tx",
            ContestError::PayerMismatch { .. } => "payer_mismatch",
            ContestError::AmountTooLow { .. } => "amount_too_low",
            ContestError::RecipientMismatch { .. } => "recipient_mismatch",
            ContestError::ContestNotFound(_) => "contest_not_found",
            ContestError::SubmissionNotFound(_) => "submission_not_found",
            ContestError::InvalidStatusTransition { .. } => "invalid_status_transition",
            ContestError::InvalidEndTime(_) => "invalid_end_time",
            ContestError::TransientRpcError(_) => "transient_rpc_error",
            ContestError::RpcError(_) => "rpc_error",
            ContestError::StorageError(_) => "storage_error",
            ContestError::InternalError(_) => "internal_error",
        }
    }

    /// Mismatch rejections are permanent: retrying with the same input cannot succeed
    pub fn is_permanent_rejection(&self) -> bool {
        matches!(
            self,
            ContestError::PayerMismatch { .. }
                | ContestError::AmountTooLow { .. }
                | ContestError::RecipientMismatch { .. }
                | ContestError::InvalidReference(_)
        )
    }
}

pub type ContestResult<T> = Result<T, ContestError>;
