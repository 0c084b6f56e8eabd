// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Node wiring: build every component from the validated config and start
//! the API server.

use crate::chain_client::ChainJsonRpcClient;
use crate::config::ContestNodeConfig;
use crate::contest_store::{ContestStore, InMemoryContestStore};
use crate::ledger::{InMemoryLedgerStore, LedgerStore};
use crate::metrics::ContestMetrics;
use crate::payment::PaymentReconciler;
use crate::rate_limiter::VoteRateLimiter;
use crate::scheduler::ContestScheduler;
use crate::server::{run_server, ApiState};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// How often the vote limiter sweeps idle keys.
const LIMITER_EVICTION_INTERVAL: Duration = Duration::from_secs(300);

pub async fn run_contest_node(
    config: ContestNodeConfig,
    prometheus_registry: prometheus::Registry,
) -> anyhow::Result<JoinHandle<()>> {
    config.validate()?;
    let metrics = Arc::new(ContestMetrics::new(&prometheus_registry));

    let chain_client = Arc::new(ChainJsonRpcClient::new(
        &config.chain.chain_rpc_url,
        Duration::from_millis(config.chain.request_timeout_ms),
        metrics.clone(),
    ));
    let store: Arc<dyn ContestStore> = Arc::new(InMemoryContestStore::new());
    let ledger: Arc<dyn LedgerStore> = Arc::new(InMemoryLedgerStore::new());

    let scheduler = ContestScheduler::new(
        store.clone(),
        ledger.clone(),
        config.payment.currency.clone(),
        metrics.clone(),
    );
    let armed = scheduler
        .initialize()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize scheduler: {:?}", e))?;
    info!("[Node] Scheduler armed {} contests", armed);

    let reconciler = Arc::new(PaymentReconciler::new(
        chain_client,
        ledger,
        config.payment.recipient_address.clone(),
        config.payment.asset_kind(),
        config.payment.currency.clone(),
        metrics.clone(),
    ));

    let limiter = Arc::new(VoteRateLimiter::for_votes());
    limiter.start_eviction_task(LIMITER_EVICTION_INTERVAL);

    let state = Arc::new(ApiState {
        reconciler,
        scheduler,
        store,
        limiter,
        payment: config.payment.clone(),
        metrics,
    });
    let server_address = SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
        config.server_listen_port,
    );
    Ok(run_server(server_address, state))
}
