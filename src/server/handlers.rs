// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! API handlers for payment polling, scheduler admin operations and voting.

use crate::error::ContestError;
use crate::payment::{new_reference, PaymentRequest, PollRequest};
use crate::server::ApiState;
use crate::types::{ContestStatus, PollOutcome};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Create the API router with all endpoints
pub fn create_api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/payments/request", post(create_payment_request))
        .route("/payments/poll", post(poll_payment))
        .route("/contests/:id/activate", post(activate_contest))
        .route("/contests/:id/end-at", put(update_contest_end_at))
        .route("/contests/:id/end-now", post(end_contest_now))
        .route("/contests/:id", delete(delete_contest))
        .route(
            "/contests/:id/submissions/:submission_id/vote",
            post(cast_vote),
        )
        .with_state(state)
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequestBody {
    /// Amount in the smallest currency unit
    amount: u64,
    message: String,
    /// Correlation string carried in the transaction memo
    memo: String,
    /// Optional client echo of the recipient. The server-held address is
    /// authoritative; a disagreeing echo is rejected outright.
    #[serde(default)]
    recipient_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequestResponse {
    uri: String,
    reference: String,
    recipient: String,
    label: String,
}

/// Mint a fresh payment request: a single-use reference plus the wallet
/// URI that embeds it.
async fn create_payment_request(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<PaymentRequestBody>,
) -> Result<Json<PaymentRequestResponse>, ApiErrorResponse> {
    state
        .metrics
        .requests_received
        .with_label_values(&["payments_request"])
        .inc();

    let recipient = state.payment.recipient_address.clone();
    if let Some(claimed) = &body.recipient_address {
        if *claimed != recipient {
            warn!(
                "[Server] Payment request claimed recipient {} differs from configured {}",
                claimed, recipient
            );
            return Err(ApiErrorResponse::bad_request(
                "recipient address does not match server configuration",
            ));
        }
    }

    let reference = new_reference();
    let request = PaymentRequest {
        recipient: recipient.clone(),
        amount: body.amount,
        decimals: state.payment.currency_decimals,
        reference: reference.clone(),
        label: state.payment.label.clone(),
        message: body.message,
        memo: body.memo,
        token_mint: state.payment.token_mint.clone(),
    };
    info!("[Server] Created payment request reference={}", reference);
    Ok(Json(PaymentRequestResponse {
        uri: request.to_uri(),
        reference,
        recipient,
        label: state.payment.label.clone(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollBody {
    reference: String,
    /// Minimum acceptable amount, smallest currency unit
    expected_amount: u64,
    user_id: String,
    #[serde(default)]
    payer_wallet: Option<String>,
    /// Ledger credit granted on verification; defaults to zero for
    /// payments that only gate a separate credit action.
    #[serde(default)]
    credit_delta: i64,
    #[serde(default)]
    reason: Option<String>,
    /// Optional client echo of the recipient, validated against server
    /// configuration and never used for verification.
    #[serde(default)]
    recipient_address: Option<String>,
    #[serde(default)]
    contest_id: Option<String>,
    #[serde(default)]
    submission_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PollResponse {
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    already_processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
}

impl PollResponse {
    fn not_found() -> Self {
        Self {
            found: false,
            message: Some("transaction not located yet".to_string()),
            success: None,
            already_processed: None,
            tx_hash: None,
            amount: None,
            from: None,
            to: None,
        }
    }

    fn pending(tx_hash: String) -> Self {
        Self {
            found: false,
            message: Some("transaction awaiting confirmation".to_string()),
            success: None,
            already_processed: None,
            tx_hash: Some(tx_hash),
            amount: None,
            from: None,
            to: None,
        }
    }

    fn already_processed(tx_hash: String) -> Self {
        Self {
            found: true,
            message: None,
            success: Some(true),
            already_processed: Some(true),
            tx_hash: Some(tx_hash),
            amount: None,
            from: None,
            to: None,
        }
    }

    fn verified(tx_hash: String, amount: u64, from: String, to: String) -> Self {
        Self {
            found: true,
            message: None,
            success: Some(true),
            already_processed: Some(false),
            tx_hash: Some(tx_hash),
            amount: Some(amount),
            from: Some(from),
            to: Some(to),
        }
    }
}

async fn poll_payment(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<PollBody>,
) -> Result<Json<PollResponse>, ApiErrorResponse> {
    state
        .metrics
        .requests_received
        .with_label_values(&["payments_poll"])
        .inc();

    if let Some(claimed) = &body.recipient_address {
        if *claimed != state.payment.recipient_address {
            warn!(
                "[Server] Poll claimed recipient {} differs from configured {}",
                claimed, state.payment.recipient_address
            );
            return Err(ApiErrorResponse::bad_request(
                "recipient address does not match server configuration",
            ));
        }
    }

    let request = PollRequest {
        reference: body.reference,
        expected_amount: body.expected_amount,
        user_id: body.user_id,
        payer_wallet: body.payer_wallet,
        credit_delta: body.credit_delta,
        reason: body.reason.unwrap_or_else(|| "crypto payment".to_string()),
        related_contest_id: body.contest_id,
        related_submission_id: body.submission_id,
    };
    let outcome = state
        .reconciler
        .poll(&request)
        .await
        .map_err(ApiErrorResponse::from_error)?;

    let response = match outcome {
        PollOutcome::NotFound => PollResponse::not_found(),
        PollOutcome::PendingConfirmation { tx_hash } => PollResponse::pending(tx_hash),
        PollOutcome::AlreadyProcessed { tx_hash } => PollResponse::already_processed(tx_hash),
        PollOutcome::Verified {
            tx_hash,
            amount,
            from,
            to,
        } => PollResponse::verified(tx_hash, amount, from, to),
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContestStatusResponse {
    contest_id: String,
    status: ContestStatus,
}

async fn activate_contest(
    State(state): State<Arc<ApiState>>,
    Path(contest_id): Path<String>,
) -> Result<Json<ContestStatusResponse>, ApiErrorResponse> {
    state
        .metrics
        .requests_received
        .with_label_values(&["contests_activate"])
        .inc();
    state
        .scheduler
        .activate_contest(&contest_id)
        .await
        .map_err(ApiErrorResponse::from_error)?;
    Ok(Json(ContestStatusResponse {
        contest_id,
        status: ContestStatus::Active,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEndAtBody {
    end_at_ms: u64,
}

async fn update_contest_end_at(
    State(state): State<Arc<ApiState>>,
    Path(contest_id): Path<String>,
    Json(body): Json<UpdateEndAtBody>,
) -> Result<StatusCode, ApiErrorResponse> {
    state
        .metrics
        .requests_received
        .with_label_values(&["contests_end_at"])
        .inc();
    state
        .scheduler
        .update_contest_end_at(&contest_id, body.end_at_ms)
        .await
        .map_err(ApiErrorResponse::from_error)?;
    Ok(StatusCode::OK)
}

async fn end_contest_now(
    State(state): State<Arc<ApiState>>,
    Path(contest_id): Path<String>,
) -> Result<Json<ContestStatusResponse>, ApiErrorResponse> {
    state
        .metrics
        .requests_received
        .with_label_values(&["contests_end_now"])
        .inc();
    state
        .scheduler
        .end_contest_now(&contest_id)
        .await
        .map_err(ApiErrorResponse::from_error)?;
    Ok(Json(ContestStatusResponse {
        contest_id,
        status: ContestStatus::Ended,
    }))
}

async fn delete_contest(
    State(state): State<Arc<ApiState>>,
    Path(contest_id): Path<String>,
) -> Result<StatusCode, ApiErrorResponse> {
    state
        .metrics
        .requests_received
        .with_label_values(&["contests_delete"])
        .inc();
    let removed = state
        .scheduler
        .delete_contest(&contest_id)
        .await
        .map_err(ApiErrorResponse::from_error)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiErrorResponse::not_found(&format!(
            "contest {} not found",
            contest_id
        )))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteBody {
    user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteResponse {
    vote_count: u64,
    remaining: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitedResponse {
    error: &'static str,
    retry_after_secs: u64,
}

async fn cast_vote(
    State(state): State<Arc<ApiState>>,
    Path((contest_id, submission_id)): Path<(String, String)>,
    Json(body): Json<VoteBody>,
) -> Result<Json<VoteResponse>, Response> {
    state
        .metrics
        .requests_received
        .with_label_values(&["votes"])
        .inc();

    let contest = state
        .store
        .get_contest(&contest_id)
        .await
        .map_err(|e| ApiErrorResponse::from_error(e).into_response())?
        .ok_or_else(|| {
            ApiErrorResponse::not_found(&format!("contest {} not found", contest_id))
                .into_response()
        })?;
    if contest.status != ContestStatus::Active {
        return Err(ApiErrorResponse::conflict(&format!(
            "contest {} is not active",
            contest_id
        ))
        .into_response());
    }

    if !state.limiter.allow(&body.user_id).await {
        state.metrics.votes_rate_limited.inc();
        let retry_after_secs = match state.limiter.reset_time(&body.user_id).await {
            Some(reset) => reset
                .saturating_duration_since(tokio::time::Instant::now())
                .as_secs(),
            None => 0,
        };
        info!(
            "[Server] Vote by {} rate limited, retry in {}s",
            body.user_id, retry_after_secs
        );
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", retry_after_secs.to_string())],
            Json(RateLimitedResponse {
                error: "rate_limited",
                retry_after_secs,
            }),
        )
            .into_response());
    }

    let vote_count = state
        .store
        .record_vote(&submission_id)
        .await
        .map_err(|e| ApiErrorResponse::from_error(e).into_response())?;
    let remaining = state.limiter.remaining(&body.user_id).await;
    Ok(Json(VoteResponse {
        vote_count,
        remaining,
    }))
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    message: String,
}

/// API error response wrapper
pub(crate) struct ApiErrorResponse {
    status: StatusCode,
    body: Json<ApiError>,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error: &str, message: &str) -> Self {
        Self {
            status,
            body: Json(ApiError {
                error: error.to_string(),
                message: message.to_string(),
            }),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn conflict(message: &str) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    fn from_error(error: ContestError) -> Self {
        let status = match &error {
            ContestError::ContestNotFound(_)
            | ContestError::SubmissionNotFound(_)
            | ContestError::TxNotFound => StatusCode::NOT_FOUND,
            ContestError::InvalidReference(_)
            | ContestError::InvalidEndTime(_)
            | ContestError::PayerMismatch { .. }
            | ContestError::AmountTooLow { .. }
            | ContestError::RecipientMismatch { .. }
            | ContestError::NoMatchingTransfer(_) => StatusCode::BAD_REQUEST,
            ContestError::InvalidStatusTransition { .. } | ContestError::DuplicateExternalTx(_) => {
                StatusCode::CONFLICT
            }
            ContestError::RecipientNotConfigured
            | ContestError::TransientRpcError(_)
            | ContestError::RpcError(_)
            | ContestError::StorageError(_)
            | ContestError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.error_type(), &format!("{:?}", error))
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}
