//! Payment backend of the Voyagr travel site, split in 2 main modules:
//!
//! - [gateway] (Paytm gateway integration)
//! - [payment] (payment lifecycle and the site facing API)
#![doc = include_str!("../README.md")]

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod config;
/// Paytm gateway integration
///
/// Request signing, the HTTP client for the gateway API and the callback
/// endpoint the gateway posts to.
mod gateway;
/// Payment lifecycle
///
/// Coordinates initiation, callback handling and verification, and exposes
/// them to the booking site.
mod payment;
mod state;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    match dotenvy::dotenv() {
        Ok(p) => tracing::info!(path = %p.display(), "Loaded environment variables from .env"),
        Err(e) => tracing::warn!("Failed to load environment variables from .env: {e}"),
    };
    let config = config::Config::from_env()?;

    let gateway = gateway::PaytmGateway::new(&config);
    let gateway = gateway.context("build gateway client")?;
    let coordinator = payment::coordinator::PaymentCoordinator::new(
        config.merchant.clone(),
        Arc::new(gateway),
        Arc::new(gateway::checksum::PaytmChecksum),
        Arc::new(payment::recorder::LogRecorder),
    );

    let port = config.port;
    tracing::info!(
        environment = %config.environment,
        mid = %config.merchant.mid,
        "Payment gateway configured"
    );
    let app = state::AppState::new(config, Arc::new(coordinator)).into_router();

    let listener = tokio::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("bind port {port}"))?;

    tracing::info!("Serving on port {port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
