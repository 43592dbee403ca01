//! Register decoding for the meter's electrical quantities block
//!
//! Pure mapping from raw holding-register values to engineering units.
//! No I/O, no side effects; the scale factors live in [`crate::constants`].
//!
//! | Offset | Quantity | Scaling |
//! |--------|----------|---------|
//! | 0 | Voltage (V) | raw / 10.0 |
//! | 1 | Current (A) | raw / 100.0 |
//! | 2 | Power (W) | raw, unscaled |

use crate::constants::{
    CURRENT_SCALE, MIN_REGISTER_COUNT, REG_CURRENT, REG_POWER, REG_VOLTAGE, VOLTAGE_SCALE,
};
use crate::error::DecodeError;

/// Decoded electrical quantities, prior to provenance tagging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectricalQuantities {
    /// Line voltage, volts
    pub voltage: f64,
    /// Line current, amps
    pub current: f64,
    /// Active power, watts
    pub power: f64,
}

/// Decode raw holding registers into engineering units.
///
/// Requires at least [`MIN_REGISTER_COUNT`] registers; registers beyond the
/// mandatory three are ignored.
///
/// # Example
///
/// ```rust
/// use voltage_pqm::decoder::decode_registers;
///
/// let quantities = decode_registers(&[2301, 512, 1180]).unwrap();
/// assert_eq!(quantities.voltage, 230.1);
/// assert_eq!(quantities.current, 5.12);
/// assert_eq!(quantities.power, 1180.0);
/// ```
pub fn decode_registers(registers: &[u16]) -> Result<ElectricalQuantities, DecodeError> {
    if registers.len() < MIN_REGISTER_COUNT {
        return Err(DecodeError::MalformedResponse {
            needed: MIN_REGISTER_COUNT,
            got: registers.len(),
        });
    }

    Ok(ElectricalQuantities {
        voltage: f64::from(registers[REG_VOLTAGE]) / VOLTAGE_SCALE,
        current: f64::from(registers[REG_CURRENT]) / CURRENT_SCALE,
        power: f64::from(registers[REG_POWER]),
    })
}
