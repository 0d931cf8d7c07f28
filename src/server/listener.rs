//! HTTP surface
//!
//! `GET /zmq/sse/` opens an event stream for the caller; `POST /zmq/`
//! publishes the request body (or `SUCCESS` when the body is empty).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::bridge::{CurrentTimeTranslator, PassthroughTranslator, PortLease, StreamBridge};
use crate::error::Result;
use crate::port::{PublishPort, SubscribePort};
use crate::registry::SubscriberRegistry;

use super::config::{EventFormat, PortMode, ServerConfig};

/// Path of the event stream endpoint
pub const SSE_PATH: &str = "/zmq/sse/";

/// Path of the publish endpoint
pub const PUBLISH_PATH: &str = "/zmq/";

/// Payload published when a `POST` carries no body
pub const DEFAULT_PUBLISH_PAYLOAD: &[u8] = b"SUCCESS";

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Where event streams get their subscribe port
#[derive(Debug)]
enum SubscriberSource {
    Dedicated(Arc<SubscriberRegistry>),
    Shared(Arc<SubscribePort>),
}

#[derive(Debug)]
struct Inner {
    publisher: PublishPort,
    subscribers: SubscriberSource,
    event_format: EventFormat,
    connection_semaphore: Option<Arc<Semaphore>>,
    shutdown: CancellationToken,
}

/// Router state
#[derive(Debug, Clone)]
struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    async fn lease(&self) -> Result<PortLease> {
        match &self.inner.subscribers {
            SubscriberSource::Dedicated(registry) => {
                Ok(PortLease::Dedicated(registry.register_next().await?))
            }
            SubscriberSource::Shared(port) => Ok(PortLease::Shared(Arc::clone(port))),
        }
    }
}

/// Fan-out HTTP server
#[derive(Debug)]
pub struct FanoutServer {
    config: ServerConfig,
    state: AppState,
}

impl FanoutServer {
    /// Open the publish port (and the shared subscribe port in shared mode)
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let publisher = PublishPort::open(&config.publish).await?;

        let subscribers = match config.port_mode {
            PortMode::Dedicated => {
                SubscriberSource::Dedicated(Arc::new(SubscriberRegistry::new(config.subscribe.clone())))
            }
            PortMode::Shared => {
                SubscriberSource::Shared(Arc::new(SubscribePort::open(&config.subscribe).await?))
            }
        };

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let inner = Inner {
            publisher,
            subscribers,
            event_format: config.event_format,
            connection_semaphore,
            shutdown: CancellationToken::new(),
        };

        Ok(Self {
            config,
            state: AppState {
                inner: Arc::new(inner),
            },
        })
    }

    /// Routes of the server
    pub fn router(&self) -> Router {
        Router::new()
            .route(SSE_PATH, get(stream_events))
            .route(PUBLISH_PATH, post(publish))
            .with_state(self.state.clone())
    }

    /// Publish port shared by `POST` requests
    pub fn publisher(&self) -> &PublishPort {
        &self.state.inner.publisher
    }

    /// Subscriber registry (dedicated mode only)
    pub fn registry(&self) -> Option<&Arc<SubscriberRegistry>> {
        match &self.state.inner.subscribers {
            SubscriberSource::Dedicated(registry) => Some(registry),
            SubscriberSource::Shared(_) => None,
        }
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Open event streams end when `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            addr = %listener.local_addr()?,
            mode = ?self.config.port_mode,
            format = %self.config.event_format,
            "Fanout server listening"
        );

        let streams = self.state.inner.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
                streams.cancel();
            })
            .await?;

        Ok(())
    }
}

async fn stream_events(State(state): State<AppState>) -> Response {
    // Check connection limit
    let permit = match &state.inner.connection_semaphore {
        Some(sem) => match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!("Event stream rejected: limit reached");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        },
        None => None,
    };

    let lease = match state.lease().await {
        Ok(lease) => lease,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open subscribe port");
            return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
        }
    };

    let bridge = StreamBridge::new(lease).with_cancellation(&state.inner.shutdown);
    let bridge = match state.inner.event_format {
        EventFormat::CurrentTime => bridge.with_translator(CurrentTimeTranslator),
        EventFormat::Passthrough => bridge.with_translator(PassthroughTranslator),
    };

    // The permit lives as long as the body stream
    let body = bridge.into_stream().map(move |chunk| {
        let _held = &permit;
        chunk
    });

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

async fn publish(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let payload = if body.is_empty() {
        Bytes::from_static(DEFAULT_PUBLISH_PAYLOAD)
    } else {
        body
    };

    match state.inner.publisher.publish(payload).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "Publish failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
