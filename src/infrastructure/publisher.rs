//! Downstream Event Publisher
//!
//! Sessions push decoded dice events through the [`EventSink`] seam; the
//! production implementation forwards them to the Socket.IO server the
//! browser clients listen on.

use async_trait::async_trait;
use futures::FutureExt;
use rust_socketio::asynchronous::{Client, ClientBuilder};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publisher unavailable: {0}")]
    Unavailable(String),
    #[error("socket.io error: {0}")]
    SocketIo(#[from] rust_socketio::Error),
}

/// Sink for decoded dice events. Delivery is fire-and-forget: a failed emit
/// is reported to the caller but never retried here.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn emit(&self, event: &'static str, payload: Value) -> Result<(), PublishError>;
}

/// Socket.IO client publishing dice events to the bridge server.
pub struct SocketIoPublisher {
    client: Client,
}

impl SocketIoPublisher {
    /// Connect to the server, presenting the static auth payload the bridge
    /// is registered under.
    pub async fn connect(url: &str, auth: Value) -> Result<Self, PublishError> {
        let client = ClientBuilder::new(url)
            .auth(auth)
            .on("open", |_, _| {
                async { info!("Connected to bridge server") }.boxed()
            })
            .on("close", |_, _| {
                async { warn!("Disconnected from bridge server") }.boxed()
            })
            .connect()
            .await?;

        Ok(Self { client })
    }
}

#[async_trait]
impl EventSink for SocketIoPublisher {
    async fn emit(&self, event: &'static str, payload: Value) -> Result<(), PublishError> {
        self.client.emit(event, payload).await?;
        Ok(())
    }
}
