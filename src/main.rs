// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use contest_engine::config::{Config, ContestNodeConfig};
use contest_engine::node::run_contest_node;
use contest_engine::server::start_metrics_server;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(rename_all = "kebab-case")]
#[clap(name = env!("CARGO_BIN_NAME"))]
struct Args {
    #[clap(long)]
    pub config_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ContestNodeConfig::load(&args.config_path)?;

    let metrics_address =
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), config.metrics_port);
    let prometheus_registry = prometheus::Registry::new();
    start_metrics_server(metrics_address, prometheus_registry.clone());
    info!("Metrics server started at port {}", config.metrics_port);

    let handle = run_contest_node(config, prometheus_registry).await?;
    handle
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))
}
