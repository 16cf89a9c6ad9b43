//! Bluetooth Module
//!
//! BLE communication with GoDice smart dice.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     DiceSupervisor                       │
//! │   (discovery poll loop, one session per advertised die)  │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │ spawns / cancels
//!                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                      DiceSession                         │
//! │     connect → subscribe → listen → retry, per die        │
//! └───────┬─────────────────────────────┬───────────────────┘
//!         │ drives                      │ decodes via
//!         ▼                             ▼
//! ┌────────────────┐            ┌──────────────┐
//! │ DiceTransport  │            │   Protocol   │
//! │ (btleplug impl │            │ - UUIDs      │
//! │  in connection)│            │ - handshake  │
//! └────────────────┘            │ - decoder    │
//!                               └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - GoDice protocol constants and the notification decoder
//! - [`transport`] - transport traits the lifecycle layers are written against
//! - [`connection`] - btleplug-backed transport implementation
//! - [`scanner`] - standalone first-seen discovery probe
//! - [`session`] - per-die lifecycle state machine
//! - [`supervisor`] - discovery polling and the session registry

pub mod connection;
#[cfg(test)]
pub mod mock;
pub mod protocol;
pub mod scanner;
pub mod session;
pub mod supervisor;
pub mod transport;
