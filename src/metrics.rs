// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, HistogramVec, IntCounter,
    IntCounterVec, IntGauge, Registry,
};
use std::sync::Arc;

const RPC_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

#[derive(Clone, Debug)]
pub struct ContestMetrics {
    pub(crate) requests_received: IntCounterVec,

    // Payment reconciliation
    pub(crate) payment_polls: IntCounterVec,
    pub(crate) payment_poll_rejections: IntCounterVec,
    pub(crate) ledger_entries_written: IntCounter,

    // Scheduling and distribution
    pub(crate) contests_armed: IntGauge,
    pub(crate) timer_slices_scheduled: IntCounter,
    pub(crate) distributions_fired: IntCounter,
    pub(crate) distribution_failures: IntCounter,

    // Voting
    pub(crate) votes_rate_limited: IntCounter,

    // Chain RPC
    pub(crate) chain_rpc_queries: IntCounterVec,
    pub(crate) chain_rpc_errors: IntCounterVec,
    pub(crate) chain_rpc_latency: HistogramVec,
}

impl ContestMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            requests_received: register_int_counter_vec_with_registry!(
                "contest_requests_received",
                "Total number of API requests received, by route",
                &["route"],
                registry,
            )
            .unwrap(),
            payment_polls: register_int_counter_vec_with_registry!(
                "contest_payment_polls",
                "Total number of payment polls, by outcome",
                &["outcome"],
                registry,
            )
            .unwrap(),
            payment_poll_rejections: register_int_counter_vec_with_registry!(
                "contest_payment_poll_rejections",
                "Total number of rejected payment polls, by error type",
                &["error_type"],
                registry,
            )
            .unwrap(),
            ledger_entries_written: register_int_counter_with_registry!(
                "contest_ledger_entries_written",
                "Total number of ledger entries written",
                registry,
            )
            .unwrap(),
            contests_armed: register_int_gauge_with_registry!(
                "contest_contests_armed",
                "Number of contests with a live end-time timer",
                registry,
            )
            .unwrap(),
            timer_slices_scheduled: register_int_counter_with_registry!(
                "contest_timer_slices_scheduled",
                "Total number of timer slices scheduled, including chained re-arms",
                registry,
            )
            .unwrap(),
            distributions_fired: register_int_counter_with_registry!(
                "contest_distributions_fired",
                "Total number of completed reward distributions",
                registry,
            )
            .unwrap(),
            distribution_failures: register_int_counter_with_registry!(
                "contest_distribution_failures",
                "Total number of failed reward distributions (contest left active)",
                registry,
            )
            .unwrap(),
            votes_rate_limited: register_int_counter_with_registry!(
                "contest_votes_rate_limited",
                "Total number of votes denied by the in-memory rate limiter",
                registry,
            )
            .unwrap(),
            chain_rpc_queries: register_int_counter_vec_with_registry!(
                "contest_chain_rpc_queries",
                "Total number of chain RPC queries, by method",
                &["method"],
                registry,
            )
            .unwrap(),
            chain_rpc_errors: register_int_counter_vec_with_registry!(
                "contest_chain_rpc_errors",
                "Total number of chain RPC errors, by method",
                &["method"],
                registry,
            )
            .unwrap(),
            chain_rpc_latency: register_histogram_vec_with_registry!(
                "contest_chain_rpc_latency",
                "Latency of chain RPC queries in seconds, by method",
                &["method"],
                RPC_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Arc<Self> {
        Arc::new(Self::new(&Registry::new()))
    }
}
