//! Decoded Dice Events
//!
//! Typed events produced by the notification decoder, plus their mapping to
//! the event names and JSON payloads the downstream server expects.

use serde_json::{json, Value};
use uuid::Uuid;

/// One decoded notification from a die.
///
/// `RawFrame` mirrors every notification byte-for-byte and is emitted before
/// any typed interpretation; the remaining variants carry the decoded state
/// change. `value` fields are classified face values, `xyz` the signed
/// orientation vector the classification was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiceEvent {
    RawFrame { characteristic: Uuid, bytes: Vec<u8> },
    RollStart,
    Battery { level: u8 },
    Color { value: u8 },
    Stable { value: u8, xyz: [i8; 3] },
    FakeStable { value: u8, xyz: [i8; 3] },
    TiltStable { value: u8, xyz: [i8; 3] },
    MoveStable { value: u8, xyz: [i8; 3] },
}

impl DiceEvent {
    /// Event name on the downstream publish/subscribe channel.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RawFrame { .. } => "dice_data",
            Self::RollStart => "roll_start",
            Self::Battery { .. } => "battery_level",
            Self::Color { .. } => "dice_color",
            Self::Stable { .. } => "stable",
            Self::FakeStable { .. } => "fake_stable",
            Self::TiltStable { .. } => "tilt_stable",
            Self::MoveStable { .. } => "move_stable",
        }
    }

    /// JSON payload for the downstream server, tagged with the die name.
    pub fn payload(&self, dice: &str) -> Value {
        match self {
            Self::RawFrame {
                characteristic,
                bytes,
            } => json!({
                "dice": dice,
                "characteristic": characteristic.to_string(),
                "raw_data": bytes,
            }),
            Self::RollStart => json!({ "dice": dice }),
            Self::Battery { level } => json!({ "dice": dice, "level": level }),
            Self::Color { value } => json!({ "dice": dice, "color": value }),
            Self::Stable { value, xyz }
            | Self::FakeStable { value, xyz }
            | Self::TiltStable { value, xyz }
            | Self::MoveStable { value, xyz } => json!({
                "dice": dice,
                "value": value,
                "xyz": xyz,
            }),
        }
    }
}
