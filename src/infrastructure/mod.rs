//! Infrastructure Layer
//!
//! Everything that touches the outside world: the BLE stack, the downstream
//! publisher, and logging setup.

pub mod bluetooth;
pub mod logging;
pub mod publisher;
