//! GoDice Protocol
//!
//! Protocol definitions for GoDice smart dice: the GATT characteristics the
//! dice expose, the telemetry handshake, and the notification decoder.

use crate::domain::dice::{self, DieType};
use crate::domain::events::DiceEvent;
use uuid::Uuid;

/// Write characteristic for commands sent to the die.
pub const CONTROL_CHAR_UUID: Uuid = Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e);

/// Notify characteristic the die reports state changes on.
pub const NOTIFY_CHAR_UUID: Uuid = Uuid::from_u128(0x6e400003_b5a3_f393_e0a9_e50e24dcca9e);

/// Advertised name prefix shared by all GoDice.
pub const DEVICE_NAME_PREFIX: &str = "GoDice_";

/// Command written to the control characteristic after subscribing; the die
/// starts pushing telemetry once it arrives.
pub const TELEMETRY_HANDSHAKE: [u8; 1] = [0x17];

/// Decode one raw notification into events.
///
/// Every notification yields a `dice_data` raw mirror first. Frames of at
/// least 3 bytes are then matched on their ASCII tag:
///
/// ```text
/// 'R'          roll start
/// "Bat" <lvl>  battery level
/// "Col" <col>  die color
/// 'S'  <xyz>   stable face, vector at offset 1
/// "FS" <xyz>   fake stable, vector at offset 2
/// "TS" <xyz>   tilt stable, vector at offset 2
/// "MS" <xyz>   move stable, vector at offset 2
/// ```
///
/// Vector bytes are signed 8-bit integers; stable variants carry the face
/// value classified against the die's calibration table. Frames shorter than
/// 3 bytes, unknown tags, and recognized tags with missing trailing bytes all
/// decode to the raw mirror alone.
pub fn decode(die: DieType, characteristic: Uuid, data: &[u8]) -> Vec<DiceEvent> {
    let mut events = vec![DiceEvent::RawFrame {
        characteristic,
        bytes: data.to_vec(),
    }];

    if data.len() < 3 {
        return events;
    }

    match (data[0], data[1], data[2]) {
        (b'R', _, _) => events.push(DiceEvent::RollStart),
        (b'B', b'a', b't') => {
            if let Some(&level) = data.get(3) {
                events.push(DiceEvent::Battery { level });
            }
        }
        (b'C', b'o', b'l') => {
            if let Some(&value) = data.get(3) {
                events.push(DiceEvent::Color { value });
            }
        }
        (b'S', _, _) => {
            if let Some(xyz) = read_xyz(data, 1) {
                events.push(DiceEvent::Stable {
                    value: dice::classify(die, xyz),
                    xyz,
                });
            }
        }
        (b'F', b'S', _) => {
            if let Some(xyz) = read_xyz(data, 2) {
                events.push(DiceEvent::FakeStable {
                    value: dice::classify(die, xyz),
                    xyz,
                });
            }
        }
        (b'T', b'S', _) => {
            if let Some(xyz) = read_xyz(data, 2) {
                events.push(DiceEvent::TiltStable {
                    value: dice::classify(die, xyz),
                    xyz,
                });
            }
        }
        (b'M', b'S', _) => {
            if let Some(xyz) = read_xyz(data, 2) {
                events.push(DiceEvent::MoveStable {
                    value: dice::classify(die, xyz),
                    xyz,
                });
            }
        }
        _ => {}
    }

    events
}

/// Three consecutive bytes reinterpreted as a signed orientation vector, or
/// None when the frame ends early.
fn read_xyz(data: &[u8], start: usize) -> Option<[i8; 3]> {
    let bytes = data.get(start..start + 3)?;
    Some([bytes[0] as i8, bytes[1] as i8, bytes[2] as i8])
}
