//! Device Session
//!
//! Owns the connect → subscribe → listen → retry lifecycle for one die.
//! Every failure is contained here: connect errors, missing characteristics,
//! and dropped links all funnel into the same fixed-delay retry, and the
//! session only ends when its supervisor cancels it.

use crate::domain::dice::DieType;
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::transport::{
    DiceConnection, DiceTransport, RawNotification, TransportError,
};
use crate::infrastructure::publisher::EventSink;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("required characteristic {0} not exposed by device")]
    ProtocolMismatch(Uuid),
    #[error("connection lost")]
    ConnectionLost,
}

/// Per-session policy, shared by every die the supervisor manages.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub control_uuid: Uuid,
    pub notify_uuid: Uuid,
    pub die_type: DieType,
    /// Wait between connection cycles after any failure or disconnect.
    pub retry_delay: Duration,
    /// Coarse `is_connected` poll interval while listening.
    pub connection_poll: Duration,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            control_uuid: Uuid::parse_str(&settings.control_char_uuid)?,
            notify_uuid: Uuid::parse_str(&settings.notify_char_uuid)?,
            die_type: settings.die_type,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            connection_poll: Duration::from_millis(settings.connection_poll_ms),
        })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            control_uuid: protocol::CONTROL_CHAR_UUID,
            notify_uuid: protocol::NOTIFY_CHAR_UUID,
            die_type: DieType::default(),
            retry_delay: Duration::from_secs(3),
            connection_poll: Duration::from_secs(1),
        }
    }
}

pub struct DiceSession<T: DiceTransport, S: EventSink> {
    name: String,
    transport: Arc<T>,
    sink: Arc<S>,
    config: SessionConfig,
}

impl<T: DiceTransport, S: EventSink> DiceSession<T, S> {
    pub fn new(name: String, transport: Arc<T>, sink: Arc<S>, config: SessionConfig) -> Self {
        Self {
            name,
            transport,
            sink,
            config,
        }
    }

    /// Drive the session until the token is cancelled. Never gives up on its
    /// own: every failed cycle schedules another attempt after the fixed
    /// retry delay.
    pub async fn run(self, cancel: CancellationToken) {
        info!(dice = %self.name, "session started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.connect_cycle(&cancel).await {
                Ok(()) => {
                    // Only a cancellation ends a cycle cleanly.
                    break;
                }
                Err(e) => {
                    warn!(
                        dice = %self.name,
                        error = %e,
                        retry_in = ?self.config.retry_delay,
                        "session cycle ended"
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.config.retry_delay) => {}
            }
        }

        info!(dice = %self.name, "session stopped");
    }

    /// One connection cycle. The connection handle never escapes this
    /// function: every exit path, including cancellation, releases it.
    async fn connect_cycle(&self, cancel: &CancellationToken) -> Result<(), SessionError> {
        let conn = self.transport.connect(&self.name).await?;
        info!(dice = %self.name, "connected");

        let result = self.listen(&conn, cancel).await;
        conn.disconnect().await;
        result
    }

    async fn listen(
        &self,
        conn: &T::Connection,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let characteristics = conn.characteristics().await?;
        let control = characteristics
            .iter()
            .find(|c| c.uuid == self.config.control_uuid && c.writable)
            .ok_or(SessionError::ProtocolMismatch(self.config.control_uuid))?;
        let notify = characteristics
            .iter()
            .find(|c| c.uuid == self.config.notify_uuid && c.notifiable)
            .ok_or(SessionError::ProtocolMismatch(self.config.notify_uuid))?;

        let mut frames = conn.subscribe(notify.uuid).await?;

        // Activate telemetry: the die stays silent until it sees this.
        conn.write(control.uuid, &protocol::TELEMETRY_HANDSHAKE).await?;
        debug!(dice = %self.name, "telemetry handshake sent");

        let mut poll = interval(self.config.connection_poll);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                frame = frames.recv() => match frame {
                    Some(frame) => self.publish(frame).await,
                    None => return Err(SessionError::ConnectionLost),
                },
                _ = poll.tick() => {
                    if !conn.is_connected().await {
                        return Err(SessionError::ConnectionLost);
                    }
                }
            }
        }
    }

    /// Decode one frame and forward its events in order. Publish failures
    /// are logged and dropped; delivery is not guaranteed here.
    async fn publish(&self, frame: RawNotification) {
        let events = protocol::decode(self.config.die_type, frame.characteristic, &frame.data);
        for event in events {
            let name = event.name();
            let payload = event.payload(&self.name);
            if let Err(e) = self.sink.emit(name, payload).await {
                warn!(dice = %self.name, event = name, error = %e, "publish failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::mock::{MockSink, MockTransport};
    use serde_json::json;
    use std::time::Duration;

    fn test_config() -> SessionConfig {
        SessionConfig {
            retry_delay: Duration::from_millis(100),
            connection_poll: Duration::from_millis(50),
            ..SessionConfig::default()
        }
    }

    fn spawn_session(
        transport: &Arc<MockTransport>,
        sink: &Arc<MockSink>,
    ) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        let session = DiceSession::new(
            "GoDice_AB12".to_string(),
            Arc::clone(transport),
            Arc::clone(sink),
            test_config(),
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(session.run(cancel.clone()));
        (cancel, task)
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failures_retry_indefinitely() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_connects();
        let sink = Arc::new(MockSink::default());
        let (cancel, task) = spawn_session(&transport, &sink);

        // Ten retry windows under paused time.
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(transport.connect_attempts() >= 10);
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn missing_characteristics_are_retried_like_connect_failures() {
        let transport = Arc::new(MockTransport::new());
        transport.omit_notify_char();
        let sink = Arc::new(MockSink::default());
        let (cancel, task) = spawn_session(&transport, &sink);

        tokio::time::sleep(Duration::from_secs(1)).await;

        // Each attempt got a connection, failed the characteristic check,
        // and released the handle before retrying.
        let connections = transport.connections();
        assert!(connections.len() >= 2);
        assert!(!connections[0].is_connected());
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_decoded_and_published_in_order() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MockSink::default());
        let (cancel, task) = spawn_session(&transport, &sink);

        let conn = transport.wait_for_connection().await;
        conn.wait_for_subscriber().await;

        // The telemetry handshake went to the control characteristic.
        assert_eq!(
            conn.written(),
            vec![(protocol::CONTROL_CHAR_UUID, vec![0x17])]
        );

        conn.push_frame(&[82, 0, 0]).await;
        conn.push_frame(&[66, 97, 116, 50]).await;
        conn.push_frame(&[83, 192, 0, 64]).await;
        sink.wait_for_events(6).await;

        let events = sink.events();
        let names: Vec<&str> = events.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "dice_data",
                "roll_start",
                "dice_data",
                "battery_level",
                "dice_data",
                "stable"
            ]
        );
        assert_eq!(events[3].1["level"], 50);
        assert_eq!(events[5].1["xyz"], json!([-64, 0, 64]));
        assert!(events.iter().all(|(_, p)| p["dice"] == "GoDice_AB12"));

        cancel.cancel();
        task.await.unwrap();
        assert!(!conn.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_link_reconnects_after_retry_delay() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MockSink::default());
        let (cancel, task) = spawn_session(&transport, &sink);

        let first = transport.wait_for_connection().await;
        first.wait_for_subscriber().await;
        first.drop_link().await;

        // A second cycle opens a fresh connection.
        while transport.connections().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!first.is_connected());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_releases_the_connection() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MockSink::default());
        let (cancel, task) = spawn_session(&transport, &sink);

        let conn = transport.wait_for_connection().await;
        conn.wait_for_subscriber().await;
        assert!(conn.is_connected());

        cancel.cancel();
        task.await.unwrap();
        assert!(!conn.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failures_do_not_end_the_session() {
        let transport = Arc::new(MockTransport::new());
        let sink = Arc::new(MockSink::default());
        sink.fail_emits();
        let (cancel, task) = spawn_session(&transport, &sink);

        let conn = transport.wait_for_connection().await;
        conn.wait_for_subscriber().await;
        conn.push_frame(&[82, 0, 0]).await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(conn.is_connected());
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap();
    }
}
