//! Nester dashboard - synchronization and aggregation layer
//!
//! Polls a local probe or the central server, publishes immutable snapshots
//! with derived statistics, and serves them on a local web dashboard with
//! on-demand per-probe detail.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod detail;
pub mod error;
pub mod filter;
pub mod io;
pub mod model;
pub mod poller;
pub mod snapshot;
pub mod state;
pub mod views;

pub use config::{load_config, Config, SiteMode};
pub use error::{DashboardError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::context::DashboardContext;
use crate::io::ReqwestHttpClient;
use crate::poller::Poller;

/// Wire the client, poller, detail caches and context for a configuration
pub fn build_context(config: &Config, http: Arc<dyn io::HttpClient>) -> Arc<DashboardContext> {
    let api = Arc::new(ApiClient::new(
        &config.base_url,
        config.request_timeout(),
        http,
    ));
    let poller = Poller::new(
        snapshot::source_for(config.mode, Arc::clone(&api)),
        state::new_state_handle(),
        config.poll_interval(),
    );

    Arc::new(DashboardContext::new(
        poller,
        detail::logs_cache(Arc::clone(&api), config.detail_ttl()),
        detail::equipment_cache(api, config.detail_ttl()),
    ))
}

/// Run the dashboard with the given configuration until ctrl-c
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let http: Arc<dyn io::HttpClient> =
        Arc::new(ReqwestHttpClient::with_timeout(config.request_timeout())?);
    let ctx = build_context(&config, http);
    let cancel = CancellationToken::new();

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Start dashboard if enabled
    if config.dashboard.enabled {
        let dashboard_port = config.dashboard.port;
        let dashboard_ctx = Arc::clone(&ctx);
        let cancel_for_dashboard = cancel.clone();

        tokio::spawn(async move {
            let router = dashboard::build_router(dashboard_ctx);
            let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
            tracing::info!("Dashboard listening on http://{}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        dashboard_port,
                        e
                    );
                    return;
                }
            };

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_dashboard.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Dashboard stopped");
        });
    }

    tracing::info!(
        "Synchronizing {} ({} mode)",
        config.base_url,
        config.mode
    );
    ctx.poller().start().await;

    cancel.cancelled().await;

    ctx.shutdown().await;
    tracing::info!("Nester dashboard stopped");

    Ok(())
}
