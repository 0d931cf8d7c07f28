//! Fan-out HTTP server
//!
//! Serves `GET /zmq/sse/` and `POST /zmq/` against a running broker.
//!
//! Environment:
//! - `FANOUT_BIND_ADDR` (default `127.0.0.1:8000`)
//! - `FANOUT_PUBLISH_ADDR` (default `ipc:///tmp/ipcsub`)
//! - `FANOUT_SUBSCRIBE_ADDR` (default `ipc:///tmp/ipcpub`)
//! - `RUST_LOG` to adjust logging

use fanout_rs::server::{FanoutServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fanout_rs=info".parse()?)
                .add_directive("fanout_server=info".parse()?),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let server = FanoutServer::new(config).await?;

    println!("Listening on http://{}", server.bind_addr());
    println!("  curl -N http://{}/zmq/sse/", server.bind_addr());
    println!("  curl -X POST http://{}/zmq/", server.bind_addr());

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
