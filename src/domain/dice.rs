//! Die Face Classification
//!
//! Maps raw accelerometer vectors reported by a die to face values using
//! per-die-type calibration tables (nearest reference vector wins).

use serde::{Deserialize, Serialize};

/// Supported die geometries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DieType {
    #[default]
    D6,
    D20,
    D24,
}

impl DieType {
    /// Number of faces for this die type.
    pub fn sides(self) -> u8 {
        match self {
            Self::D6 => 6,
            Self::D20 => 20,
            Self::D24 => 24,
        }
    }

    fn calibration(self) -> &'static [[i8; 3]] {
        match self {
            Self::D6 => &D6_FACES,
            Self::D20 => &D20_FACES,
            Self::D24 => &D24_FACES,
        }
    }
}

/// Reference orientation vector per face, indexed by `face - 1`.
const D6_FACES: [[i8; 3]; 6] = [
    [-64, 0, 0],
    [0, 0, 64],
    [0, 64, 0],
    [0, -64, 0],
    [0, 0, -64],
    [64, 0, 0],
];

const D20_FACES: [[i8; 3]; 20] = [
    [-64, 0, -22],
    [42, -42, 40],
    [0, 22, -64],
    [0, 22, 64],
    [-42, -42, 42],
    [22, 64, 0],
    [-42, -42, -42],
    [64, 0, -22],
    [-22, 64, 0],
    [42, -42, -42],
    [-42, 42, 42],
    [22, -64, 0],
    [-64, 0, 22],
    [42, 42, 42],
    [-22, -64, 0],
    [42, 42, -42],
    [0, -22, -64],
    [0, -22, 64],
    [-42, 42, -42],
    [64, 0, 22],
];

/// Uncalibrated placeholder carried over from the reference firmware notes:
/// no D24 orientation data exists yet, so every vector is equidistant from
/// all faces and classification always resolves to face 1.
const D24_FACES: [[i8; 3]; 24] = [[0, 0, 0]; 24];

/// Classify a raw orientation vector as a face value in `1..=sides`.
///
/// Scans the calibration table in ascending face order and keeps the entry
/// with the smallest squared Euclidean distance, so exact ties resolve to the
/// lowest face.
pub fn classify(die: DieType, xyz: [i8; 3]) -> u8 {
    let mut best_face = 1u8;
    let mut best_dist = i32::MAX;

    for (i, face) in die.calibration().iter().enumerate() {
        let dx = i32::from(xyz[0]) - i32::from(face[0]);
        let dy = i32::from(xyz[1]) - i32::from(face[1]);
        let dz = i32::from(xyz[2]) - i32::from(face[2]);
        let dist = dx * dx + dy * dy + dz * dz;
        if dist < best_dist {
            best_dist = dist;
            best_face = (i + 1) as u8;
        }
    }

    best_face
}
