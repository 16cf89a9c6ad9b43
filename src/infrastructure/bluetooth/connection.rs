//! BLE Connection Module
//!
//! btleplug-backed implementation of the transport boundary: adapter setup,
//! scan-window discovery, connecting to a die by advertised name, and
//! forwarding its notification stream into the per-session frame queue.

use crate::infrastructure::bluetooth::transport::{
    AdvertisedDie, CharacteristicInfo, DiceConnection, DiceTransport, RawNotification,
    TransportError,
};
use async_trait::async_trait;
use btleplug::api::{
    Central, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Capacity of a session's raw frame queue. Dice notify at human rolling
/// cadence, so a small buffer only has to absorb decode/publish latency.
const FRAME_QUEUE_CAPACITY: usize = 64;

pub struct BtleTransport {
    adapter: Adapter,
    scan_window: Duration,
}

impl BtleTransport {
    /// Open the first available Bluetooth adapter.
    pub async fn new(scan_window: Duration) -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(TransportError::NoAdapter)?;
        Ok(Self {
            adapter,
            scan_window,
        })
    }

    /// Run one scan window and collect whatever the adapter has seen.
    async fn scan_peripherals(&self) -> Result<Vec<Peripheral>, TransportError> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(self.scan_window).await;
        let peripherals = self.adapter.peripherals().await?;
        self.adapter.stop_scan().await?;
        Ok(peripherals)
    }
}

#[async_trait]
impl DiceTransport for BtleTransport {
    type Connection = BtleConnection;

    async fn discover(&self) -> Result<Vec<AdvertisedDie>, TransportError> {
        let mut dice = Vec::new();
        for peripheral in self.scan_peripherals().await? {
            if let Some(props) = peripheral.properties().await? {
                if let Some(name) = props.local_name {
                    dice.push(AdvertisedDie {
                        name,
                        address: peripheral.address().to_string(),
                        rssi: props.rssi,
                    });
                }
            }
        }
        Ok(dice)
    }

    async fn connect(&self, name: &str) -> Result<BtleConnection, TransportError> {
        for peripheral in self.scan_peripherals().await? {
            let advertised = peripheral
                .properties()
                .await?
                .and_then(|props| props.local_name);
            if advertised.as_deref() != Some(name) {
                continue;
            }

            peripheral.connect().await?;
            peripheral.discover_services().await?;
            return Ok(BtleConnection { peripheral });
        }

        Err(TransportError::DeviceNotFound(name.to_string()))
    }
}

pub struct BtleConnection {
    peripheral: Peripheral,
}

impl BtleConnection {
    fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic, TransportError> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(TransportError::MissingCharacteristic(uuid))
    }
}

#[async_trait]
impl DiceConnection for BtleConnection {
    async fn characteristics(&self) -> Result<Vec<CharacteristicInfo>, TransportError> {
        Ok(self
            .peripheral
            .characteristics()
            .into_iter()
            .map(|c| CharacteristicInfo {
                uuid: c.uuid,
                writable: c.properties.contains(CharPropFlags::WRITE)
                    || c.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
                notifiable: c.properties.contains(CharPropFlags::NOTIFY),
            })
            .collect())
    }

    async fn subscribe(
        &self,
        characteristic: Uuid,
    ) -> Result<mpsc::Receiver<RawNotification>, TransportError> {
        let target = self.find_characteristic(characteristic)?;
        self.peripheral.subscribe(&target).await?;

        let mut notifications = self.peripheral.notifications().await?;
        let (tx, rx) = mpsc::channel(FRAME_QUEUE_CAPACITY);

        // Forward the notification stream into the session's queue. The
        // stream ends when the peripheral disconnects, which closes the
        // queue and lets the session observe the loss.
        tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != characteristic {
                    continue;
                }
                let frame = RawNotification {
                    characteristic: notification.uuid,
                    data: notification.value,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn write(&self, characteristic: Uuid, payload: &[u8]) -> Result<(), TransportError> {
        let target = self.find_characteristic(characteristic)?;
        self.peripheral
            .write(&target, payload, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn disconnect(&self) {
        if let Err(e) = self.peripheral.disconnect().await {
            debug!(error = %e, "disconnect failed");
        }
    }
}
