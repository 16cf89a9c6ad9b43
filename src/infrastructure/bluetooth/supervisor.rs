//! Session Supervisor
//!
//! Polls discovery and keeps one running session per advertised die. The
//! registry is owned by the supervisor task alone: sessions are spawned and
//! cancelled here and never remove themselves, so registry membership always
//! reflects the latest discovery results.

use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::session::{DiceSession, SessionConfig};
use crate::infrastructure::bluetooth::transport::{DiceTransport, TransportError};
use crate::infrastructure::publisher::EventSink;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub device_prefix: String,
    pub poll_interval: Duration,
    pub session: SessionConfig,
}

impl SupervisorConfig {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            device_prefix: settings.device_prefix.clone(),
            poll_interval: Duration::from_millis(settings.discovery_poll_ms),
            session: SessionConfig::from_settings(settings)?,
        })
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            device_prefix: protocol::DEVICE_NAME_PREFIX.to_string(),
            poll_interval: Duration::from_secs(5),
            session: SessionConfig::default(),
        }
    }
}

struct SessionHandle {
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

pub struct DiceSupervisor<T: DiceTransport, S: EventSink> {
    transport: Arc<T>,
    sink: Arc<S>,
    config: SupervisorConfig,
    registry: HashMap<String, SessionHandle>,
}

impl<T: DiceTransport, S: EventSink> DiceSupervisor<T, S> {
    pub fn new(transport: Arc<T>, sink: Arc<S>, config: SupervisorConfig) -> Self {
        Self {
            transport,
            sink,
            config,
            registry: HashMap::new(),
        }
    }

    /// Poll discovery until cancelled, then tear down every session.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            prefix = %self.config.device_prefix,
            poll = ?self.config.poll_interval,
            "supervisor started"
        );

        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "discovery poll failed");
                    }
                }
            }
        }

        info!("supervisor stopping, cancelling all sessions");
        for (name, handle) in self.registry.drain() {
            info!(dice = %name, "cancelling session");
            handle.cancel.cancel();
        }
    }

    /// One reconcile pass: spawn sessions for newly advertised dice, cancel
    /// sessions for dice that are gone.
    async fn poll_once(&mut self) -> Result<(), TransportError> {
        let discovered = self.transport.discover().await?;

        let current: HashSet<&str> = discovered
            .iter()
            .filter(|d| d.name.starts_with(&self.config.device_prefix))
            .map(|d| d.name.as_str())
            .collect();

        for die in &discovered {
            if !die.name.starts_with(&self.config.device_prefix)
                || self.registry.contains_key(&die.name)
            {
                continue;
            }

            info!(
                dice = %die.name,
                address = %die.address,
                rssi = ?die.rssi,
                "found new die"
            );

            let session = DiceSession::new(
                die.name.clone(),
                Arc::clone(&self.transport),
                Arc::clone(&self.sink),
                self.config.session.clone(),
            );
            let token = CancellationToken::new();
            let task = tokio::spawn(session.run(token.clone()));
            self.registry.insert(
                die.name.clone(),
                SessionHandle {
                    cancel: token,
                    _task: task,
                },
            );
        }

        let stale: Vec<String> = self
            .registry
            .keys()
            .filter(|name| !current.contains(name.as_str()))
            .cloned()
            .collect();
        for name in stale {
            if let Some(handle) = self.registry.remove(&name) {
                info!(dice = %name, "die no longer advertised, cancelling session");
                handle.cancel.cancel();
            }
        }

        Ok(())
    }

    #[cfg(test)]
    fn managed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.keys().cloned().collect();
        names.sort();
        names
    }

    #[cfg(test)]
    fn token(&self, name: &str) -> Option<CancellationToken> {
        self.registry.get(name).map(|h| h.cancel.clone())
    }
}
