//! Direct pub/sub demo
//!
//! Binds a publisher on `ipc:///tmp/pubsub`, connects a subscriber to it, and
//! publishes `HELLO` ten times, one second apart.
//!
//! Run with: `cargo run --example pubber`

use std::time::Duration;

use fanout_rs::port::{PublishConfig, PublishPort, SubscribeConfig, SubscribePort};
use fanout_rs::transport::Address;
use fanout_rs::Recv;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fanout_rs=info".parse()?)
                .add_directive("pubber=info".parse()?),
        )
        .init();

    let addr = Address::default_direct();
    let publisher = PublishPort::open(&PublishConfig::bind(addr.clone())).await?;
    let subscriber = SubscribePort::open(
        &SubscribeConfig::connect(addr).timeout(Duration::from_millis(1000)),
    )
    .await?;

    let printer = tokio::spawn(async move {
        let mut received = 0;
        while received < 10 {
            match subscriber.receive().await {
                Ok(Recv::Delivered(msg)) => {
                    received += 1;
                    println!("received: {}", msg.payload_str().unwrap_or("<binary>"));
                }
                Ok(Recv::TimedOut) => println!("(no message within 1s)"),
                Err(e) => {
                    eprintln!("receive failed: {}", e);
                    break;
                }
            }
        }
    });

    // Subscriptions propagate asynchronously; give the first one a moment
    tokio::time::sleep(Duration::from_millis(100)).await;

    for i in 1..=10 {
        publisher.publish("HELLO").await?;
        println!("published HELLO ({}/10)", i);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    printer.await?;
    Ok(())
}
