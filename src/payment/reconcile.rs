// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Payment reconciliation: match a claimed payment (by reference) to a
//! confirmed on-chain transaction and admit it into the ledger exactly
//! once.
//!
//! This is a polling protocol. The client calls `poll` repeatedly until it
//! sees `Verified` or `AlreadyProcessed`; the service holds no per-session
//! state, only the ledger's external-tx-hash uniqueness.

use crate::chain_client::ChainClientInner;
use crate::error::{ContestError, ContestResult};
use crate::ledger::LedgerStore;
use crate::metrics::ContestMetrics;
use crate::payment::resolver::ReferenceResolver;
use crate::payment::verifier::PaymentVerifier;
use crate::types::{AssetKind, NewLedgerEntry, PollOutcome};
use std::sync::Arc;
use tracing::{info, warn};

/// One poll attempt. The expected recipient is deliberately absent: it is
/// server-held configuration, never client input.
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub reference: String,
    /// Minimum acceptable amount, smallest currency unit
    pub expected_amount: u64,
    pub user_id: String,
    /// The caller's registered wallet. When None the payer check is
    /// skipped; some flows permit unregistered payers.
    pub payer_wallet: Option<String>,
    /// Business credit this payment grants. May be zero when the payment
    /// only gates a separate credit action.
    pub credit_delta: i64,
    pub reason: String,
    pub related_contest_id: Option<String>,
    pub related_submission_id: Option<String>,
}

pub struct PaymentReconciler {
    resolver: ReferenceResolver,
    verifier: PaymentVerifier,
    ledger: Arc<dyn LedgerStore>,
    recipient_address: String,
    asset: AssetKind,
    currency: String,
    metrics: Arc<ContestMetrics>,
}

impl PaymentReconciler {
    pub fn new(
        chain_client: Arc<dyn ChainClientInner>,
        ledger: Arc<dyn LedgerStore>,
        recipient_address: String,
        asset: AssetKind,
        currency: String,
        metrics: Arc<ContestMetrics>,
    ) -> Self {
        Self {
            resolver: ReferenceResolver::new(chain_client.clone()),
            verifier: PaymentVerifier::new(chain_client),
            ledger,
            recipient_address,
            asset,
            currency,
            metrics,
        }
    }

    /// The server-held recipient address payments are verified against.
    pub fn recipient_address(&self) -> &str {
        &self.recipient_address
    }

    pub async fn poll(&self, request: &PollRequest) -> ContestResult<PollOutcome> {
        let outcome = self.poll_inner(request).await;
        match &outcome {
            Ok(result) => {
                self.metrics
                    .payment_polls
                    .with_label_values(&[result.as_label()])
                    .inc();
            }
            Err(e) => {
                self.metrics
                    .payment_poll_rejections
                    .with_label_values(&[e.error_type()])
                    .inc();
            }
        }
        outcome
    }

    async fn poll_inner(&self, request: &PollRequest) -> ContestResult<PollOutcome> {
        if self.recipient_address.is_empty() {
            return Err(ContestError::RecipientNotConfigured);
        }

        // 1. Locate the transaction that embedded the reference.
        let Some(tx_hash) = self.resolver.resolve(&request.reference).await? else {
            return Ok(PollOutcome::NotFound);
        };

        // 2. Idempotency gate, before any further verification work: the
        // resolver legitimately returns the same hash across many polls.
        // This lookup is an optimization; the ledger's uniqueness check on
        // insert is the correctness mechanism.
        if self.ledger.find_by_external_tx(&tx_hash).await?.is_some() {
            return Ok(PollOutcome::AlreadyProcessed { tx_hash });
        }

        // 3. Fetch and normalize the transfer.
        let Some(transfer) = self
            .verifier
            .verify(&tx_hash, &self.asset, &self.recipient_address)
            .await?
        else {
            return Ok(PollOutcome::PendingConfirmation { tx_hash });
        };
        if !transfer.confirmed {
            return Ok(PollOutcome::PendingConfirmation { tx_hash });
        }

        // 4. Validate payer, amount, recipient, in that order.
        if let Some(wallet) = &request.payer_wallet {
            if transfer.from != *wallet {
                warn!(
                    "[Reconcile] Payer mismatch for tx {}: expected {}, got {}",
                    tx_hash, wallet, transfer.from
                );
                return Err(ContestError::PayerMismatch {
                    expected: wallet.clone(),
                    actual: transfer.from,
                });
            }
        }
        if transfer.amount < request.expected_amount {
            return Err(ContestError::AmountTooLow {
                expected: request.expected_amount,
                actual: transfer.amount,
            });
        }
        if transfer.to != self.recipient_address {
            warn!(
                "[Reconcile] Recipient mismatch for tx {}: expected {}, got {}",
                tx_hash, self.recipient_address, transfer.to
            );
            return Err(ContestError::RecipientMismatch {
                expected: self.recipient_address.clone(),
                actual: transfer.to,
            });
        }

        // 5. Admit into the ledger. A concurrent poll may have won the
        // race between the lookup above and this insert; the store's
        // atomic uniqueness check turns that into AlreadyProcessed.
        let entry = NewLedgerEntry {
            user_id: request.user_id.clone(),
            currency: self.currency.clone(),
            delta: request.credit_delta,
            reason: request.reason.clone(),
            external_tx_hash: Some(tx_hash.clone()),
            related_contest_id: request.related_contest_id.clone(),
            related_submission_id: request.related_submission_id.clone(),
        };
        match self.ledger.append(entry).await {
            Ok(_) => {
                self.metrics.ledger_entries_written.inc();
                info!(
                    "[Reconcile] Verified payment tx={} amount={} from={} user={}",
                    tx_hash, transfer.amount, transfer.from, request.user_id
                );
                Ok(PollOutcome::Verified {
                    tx_hash,
                    amount: transfer.amount,
                    from: transfer.from,
                    to: transfer.to,
                })
            }
            Err(ContestError::DuplicateExternalTx(_)) => {
                Ok(PollOutcome::AlreadyProcessed { tx_hash })
            }
            Err(e) => Err(e),
        }
    }
}
