// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface: payment endpoints, scheduler admin operations, voting,
//! health and metrics.

use crate::config::PaymentConfig;
use crate::contest_store::ContestStore;
use crate::metrics::ContestMetrics;
use crate::payment::PaymentReconciler;
use crate::rate_limiter::VoteRateLimiter;
use crate::scheduler::ContestScheduler;
use axum::{extract::State, routing::get, Router};
use prometheus::{Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub mod handlers;

pub use handlers::create_api_router;

/// Shared state handed to every API handler.
pub struct ApiState {
    pub reconciler: Arc<PaymentReconciler>,
    pub scheduler: Arc<ContestScheduler>,
    pub store: Arc<dyn ContestStore>,
    pub limiter: Arc<VoteRateLimiter>,
    pub payment: PaymentConfig,
    pub metrics: Arc<ContestMetrics>,
}

pub fn run_server(socket_address: SocketAddr, state: Arc<ApiState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("[Server] API server listening on {}", socket_address);
        let listener = tokio::net::TcpListener::bind(socket_address).await.unwrap();
        axum::serve(listener, create_api_router(state).into_make_service())
            .await
            .unwrap();
    })
}

pub fn start_metrics_server(
    socket_address: SocketAddr,
    registry: Registry,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("[Server] Metrics server listening on {}", socket_address);
        let router = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(registry);
        let listener = tokio::net::TcpListener::bind(socket_address).await.unwrap();
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    })
}

async fn metrics_handler(State(registry): State<Registry>) -> String {
    TextEncoder::new()
        .encode_to_string(&registry.gather())
        .unwrap_or_default()
}
