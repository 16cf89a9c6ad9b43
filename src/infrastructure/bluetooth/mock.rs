//! In-memory transport and sink for lifecycle tests.
//!
//! `MockTransport` stands in for the radio: tests script its discovery
//! results and connection behavior, then inspect the connections and frames
//! each session produced. `MockSink` records every published event.

use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::transport::{
    AdvertisedDie, CharacteristicInfo, DiceConnection, DiceTransport, RawNotification,
    TransportError,
};
use crate::infrastructure::publisher::{EventSink, PublishError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Default)]
pub struct MockTransport {
    discovered: Mutex<Vec<AdvertisedDie>>,
    fail_connect: AtomicBool,
    fail_discover: AtomicBool,
    omit_control: AtomicBool,
    omit_notify: AtomicBool,
    connect_attempts: AtomicUsize,
    connections: Mutex<Vec<MockConnection>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the advertisement results returned by `discover`.
    pub fn set_discovered(&self, names: &[&str]) {
        let dice = names
            .iter()
            .enumerate()
            .map(|(i, name)| AdvertisedDie {
                name: (*name).to_string(),
                address: format!("00:11:22:33:44:{i:02X}"),
                rssi: Some(-42),
            })
            .collect();
        *self.discovered.lock().unwrap() = dice;
    }

    pub fn fail_connects(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    pub fn fail_discovery(&self) {
        self.fail_discover.store(true, Ordering::SeqCst);
    }

    pub fn omit_control_char(&self) {
        self.omit_control.store(true, Ordering::SeqCst);
    }

    pub fn omit_notify_char(&self) {
        self.omit_notify.store(true, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> Vec<MockConnection> {
        self.connections.lock().unwrap().clone()
    }

    /// Block (under test time) until a session has opened a connection.
    pub async fn wait_for_connection(&self) -> MockConnection {
        loop {
            if let Some(conn) = self.connections.lock().unwrap().last().cloned() {
                return conn;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl DiceTransport for MockTransport {
    type Connection = MockConnection;

    async fn discover(&self) -> Result<Vec<AdvertisedDie>, TransportError> {
        if self.fail_discover.load(Ordering::SeqCst) {
            return Err(TransportError::NoAdapter);
        }
        Ok(self.discovered.lock().unwrap().clone())
    }

    async fn connect(&self, name: &str) -> Result<MockConnection, TransportError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::DeviceNotFound(name.to_string()));
        }

        let conn = MockConnection {
            inner: Arc::new(ConnInner {
                connected: AtomicBool::new(true),
                omit_control: self.omit_control.load(Ordering::SeqCst),
                omit_notify: self.omit_notify.load(Ordering::SeqCst),
                written: Mutex::new(Vec::new()),
                frame_tx: Mutex::new(None),
            }),
        };
        self.connections.lock().unwrap().push(conn.clone());
        Ok(conn)
    }
}

struct ConnInner {
    connected: AtomicBool,
    omit_control: bool,
    omit_notify: bool,
    written: Mutex<Vec<(Uuid, Vec<u8>)>>,
    frame_tx: Mutex<Option<mpsc::Sender<RawNotification>>>,
}

#[derive(Clone)]
pub struct MockConnection {
    inner: Arc<ConnInner>,
}

impl MockConnection {
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.inner.written.lock().unwrap().clone()
    }

    /// Block (under test time) until the session has subscribed.
    pub async fn wait_for_subscriber(&self) {
        loop {
            if self.inner.frame_tx.lock().unwrap().is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Deliver one raw notification on the notify characteristic.
    pub async fn push_frame(&self, data: &[u8]) {
        let tx = self
            .inner
            .frame_tx
            .lock()
            .unwrap()
            .clone()
            .expect("no subscriber");
        tx.send(RawNotification {
            characteristic: protocol::NOTIFY_CHAR_UUID,
            data: data.to_vec(),
        })
        .await
        .expect("frame queue closed");
    }

    /// Simulate the link dropping: the frame queue closes and polls report
    /// the connection as gone.
    pub async fn drop_link(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.frame_tx.lock().unwrap().take();
    }
}

#[async_trait]
impl DiceConnection for MockConnection {
    async fn characteristics(&self) -> Result<Vec<CharacteristicInfo>, TransportError> {
        let mut characteristics = Vec::new();
        if !self.inner.omit_control {
            characteristics.push(CharacteristicInfo {
                uuid: protocol::CONTROL_CHAR_UUID,
                writable: true,
                notifiable: false,
            });
        }
        if !self.inner.omit_notify {
            characteristics.push(CharacteristicInfo {
                uuid: protocol::NOTIFY_CHAR_UUID,
                writable: false,
                notifiable: true,
            });
        }
        Ok(characteristics)
    }

    async fn subscribe(
        &self,
        _characteristic: Uuid,
    ) -> Result<mpsc::Receiver<RawNotification>, TransportError> {
        let (tx, rx) = mpsc::channel(64);
        *self.inner.frame_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn write(&self, characteristic: Uuid, payload: &[u8]) -> Result<(), TransportError> {
        self.inner
            .written
            .lock()
            .unwrap()
            .push((characteristic, payload.to_vec()));
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.frame_tx.lock().unwrap().take();
    }
}

#[derive(Default)]
pub struct MockSink {
    events: Mutex<Vec<(&'static str, Value)>>,
    fail: AtomicBool,
}

impl MockSink {
    pub fn events(&self) -> Vec<(&'static str, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn fail_emits(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Block (under test time) until at least `count` events have arrived.
    pub async fn wait_for_events(&self, count: usize) {
        loop {
            if self.events.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl EventSink for MockSink {
    async fn emit(&self, event: &'static str, payload: Value) -> Result<(), PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable("sink offline".to_string()));
        }
        self.events.lock().unwrap().push((event, payload));
        Ok(())
    }
}
