//! Transport Boundary
//!
//! Traits the session and supervisor layers drive the radio through. The
//! production implementation lives in [`super::connection`]; tests swap in
//! the in-memory transport from [`super::mock`].

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no bluetooth adapter available")]
    NoAdapter,
    #[error("device {0} not found")]
    DeviceNotFound(String),
    #[error("characteristic {0} not present on device")]
    MissingCharacteristic(Uuid),
    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),
}

/// One advertisement seen during discovery.
#[derive(Debug, Clone)]
pub struct AdvertisedDie {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
}

/// A characteristic and the capabilities the session cares about.
#[derive(Debug, Clone, Copy)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub writable: bool,
    pub notifiable: bool,
}

/// One raw notification frame, as delivered by the device.
#[derive(Debug, Clone)]
pub struct RawNotification {
    pub characteristic: Uuid,
    pub data: Vec<u8>,
}

/// Discovery and connection establishment.
#[async_trait]
pub trait DiceTransport: Send + Sync + 'static {
    type Connection: DiceConnection;

    /// Advertised devices currently in range. Names are reported as-is; the
    /// caller filters by prefix.
    async fn discover(&self) -> Result<Vec<AdvertisedDie>, TransportError>;

    /// Locate the named device and open a connection to it.
    async fn connect(&self, name: &str) -> Result<Self::Connection, TransportError>;
}

/// An open connection to one die.
///
/// `subscribe` hands back a per-session frame queue: the transport pushes raw
/// notifications into it in delivery order and closes it when the link drops.
#[async_trait]
pub trait DiceConnection: Send + Sync + 'static {
    async fn characteristics(&self) -> Result<Vec<CharacteristicInfo>, TransportError>;

    async fn subscribe(
        &self,
        characteristic: Uuid,
    ) -> Result<mpsc::Receiver<RawNotification>, TransportError>;

    async fn write(&self, characteristic: Uuid, payload: &[u8]) -> Result<(), TransportError>;

    async fn is_connected(&self) -> bool;

    async fn disconnect(&self);
}
