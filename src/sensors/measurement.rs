//! Fixed-point measurement value and its 8-byte wire form.
//!
//! A reading is carried as an integer part plus a fractional part in
//! micro-units, the same layout sensor drivers hand out. Peers receive it as
//! two little-endian `i32`s:
//!
//! ```text
//! offset 0..4  integer_part      (i32, LE)
//! offset 4..8  fractional_micro  (i32, LE)
//! ```
//!
//! For example: 21.5°C is `{21, 500000}` and encodes to
//! `[21, 0, 0, 0, 0x20, 0xA1, 0x07, 0]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of micro-units in one whole unit.
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Size of the encoded form in bytes.
pub const ENCODED_LEN: usize = 8;

/// One physical quantity as `integer_part + fractional_micro / 1e6`.
///
/// `fractional_micro` carries the same sign as the value, so -0.25 is
/// `{0, -250000}` and -1.5 is `{-1, -500000}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Measurement {
    pub integer_part: i32,
    pub fractional_micro: i32,
}

impl Measurement {
    pub const fn new(integer_part: i32, fractional_micro: i32) -> Self {
        Self {
            integer_part,
            fractional_micro,
        }
    }

    /// Build a measurement from a total number of micro-units.
    ///
    /// Saturates at the `i32` range of the integer part.
    pub fn from_micros(micros: i64) -> Self {
        let integer = (micros / MICROS_PER_UNIT).clamp(i32::MIN as i64, i32::MAX as i64);
        let fractional = micros % MICROS_PER_UNIT;
        Self {
            integer_part: integer as i32,
            fractional_micro: fractional as i32,
        }
    }

    /// Whether the fraction is below one unit and does not disagree in sign
    /// with the integer part.
    pub fn is_normalized(&self) -> bool {
        let fraction_in_range = (self.fractional_micro as i64).abs() < MICROS_PER_UNIT;
        let signs_agree = self.integer_part == 0
            || self.fractional_micro == 0
            || (self.integer_part < 0) == (self.fractional_micro < 0);
        fraction_in_range && signs_agree
    }

    /// Total value in micro-units.
    pub fn as_micros(&self) -> i64 {
        self.integer_part as i64 * MICROS_PER_UNIT + self.fractional_micro as i64
    }

    /// Encode as two little-endian `i32`s.
    pub fn encode(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        out[..4].copy_from_slice(&self.integer_part.to_le_bytes());
        out[4..].copy_from_slice(&self.fractional_micro.to_le_bytes());
        out
    }

    /// Decode the 8-byte wire form. Returns `None` on a short buffer.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let integer: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        let fractional: [u8; 4] = bytes.get(4..ENCODED_LEN)?.try_into().ok()?;
        Some(Self {
            integer_part: i32::from_le_bytes(integer),
            fractional_micro: i32::from_le_bytes(fractional),
        })
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -0.25 has a zero integer part, so the sign comes from the fraction
        let sign = if self.integer_part == 0 && self.fractional_micro < 0 {
            "-"
        } else {
            ""
        };
        write!(
            f,
            "{}{}.{:06}",
            sign,
            self.integer_part,
            self.fractional_micro.unsigned_abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_temperature() {
        let m = Measurement::new(21, 500_000);
        assert_eq!(m.encode(), [21, 0, 0, 0, 0x20, 0xA1, 0x07, 0]);
    }

    #[test]
    fn test_decode_inverts_encode() {
        for m in [
            Measurement::new(21, 500_000),
            Measurement::new(-12, -345_678),
            Measurement::new(0, -250_000),
            Measurement::new(i32::MAX, 999_999),
            Measurement::new(i32::MIN, -999_999),
        ] {
            assert_eq!(Measurement::decode(&m.encode()), Some(m));
        }
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(Measurement::decode(&[1, 2, 3, 4, 5, 6, 7]), None);
        assert_eq!(Measurement::decode(&[]), None);
    }

    #[test]
    fn test_from_micros_keeps_sign_on_both_parts() {
        assert_eq!(Measurement::from_micros(40_200_000), Measurement::new(40, 200_000));
        assert_eq!(Measurement::from_micros(-1_500_000), Measurement::new(-1, -500_000));
        assert_eq!(Measurement::from_micros(-250_000), Measurement::new(0, -250_000));
        assert_eq!(Measurement::from_micros(-250_000).as_micros(), -250_000);
    }

    #[test]
    fn test_is_normalized() {
        assert!(Measurement::new(21, 500_000).is_normalized());
        assert!(Measurement::new(-1, -500_000).is_normalized());
        assert!(Measurement::new(0, -250_000).is_normalized());
        assert!(Measurement::new(-3, 0).is_normalized());
        assert!(!Measurement::new(21, 1_500_000).is_normalized());
        assert!(!Measurement::new(0, -1_000_000).is_normalized());
        assert!(!Measurement::new(1, -500_000).is_normalized());
        assert!(!Measurement::new(-1, 500_000).is_normalized());
    }

    #[test]
    fn test_display() {
        assert_eq!(Measurement::new(21, 500_000).to_string(), "21.500000");
        assert_eq!(Measurement::new(40, 2_000).to_string(), "40.002000");
        assert_eq!(Measurement::new(-1, -500_000).to_string(), "-1.500000");
        assert_eq!(Measurement::new(0, -250_000).to_string(), "-0.250000");
    }
}
