//! Standalone broker
//!
//! Binds the collection and distribution addresses and relays between them
//! until Ctrl+C.
//!
//! Environment:
//! - `FANOUT_FRONTEND_ADDR` (default `ipc:///tmp/ipcsub`)
//! - `FANOUT_BACKEND_ADDR` (default `ipc:///tmp/ipcpub`)
//! - `RUST_LOG` to adjust logging

use std::sync::Arc;

use fanout_rs::broker::{BrokerConfig, BrokerProxy, RelayStats};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fanout_rs=debug".parse()?)
                .add_directive("fanout_broker=info".parse()?),
        )
        .init();

    let config = BrokerConfig::from_env()?;

    let proxy = match BrokerProxy::bind(&config).await {
        Ok(proxy) => proxy,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start broker");
            return Err(e.into());
        }
    };

    let stats_task = config
        .stats_interval
        .map(|interval| tokio::spawn(log_stats(Arc::clone(proxy.stats()), interval)));

    let result = proxy
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    if let Some(task) = stats_task {
        task.abort();
    }

    let snap = proxy.stats().snapshot();
    tracing::info!(
        downstream = snap.downstream_messages,
        upstream = snap.upstream_messages,
        failures = snap.send_failures,
        "Broker stopped"
    );

    result?;
    Ok(())
}

async fn log_stats(stats: Arc<RelayStats>, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let snap = stats.snapshot();
        tracing::info!(
            uptime_secs = snap.uptime.as_secs(),
            downstream = snap.downstream_messages,
            downstream_bytes = snap.downstream_bytes,
            upstream = snap.upstream_messages,
            failures = snap.send_failures,
            rate = format!("{:.2}/s", snap.downstream_rate()),
            "Relay stats"
        );
    }
}
