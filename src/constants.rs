//! Protocol and meter constants
//!
//! Frame-size constants are derived from the official Modbus specification:
//! - Maximum PDU size: 253 bytes (inherited from RS485 ADU limit of 256 bytes)
//! - Register limits are calculated to fit within the PDU size constraint
//!
//! Meter-specific constants (register map, scale factors, simulation ranges)
//! describe the PQM 1000s register layout this crate polls.

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Modbus MBAP header length for TCP
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) + Unit ID(1) = 7 bytes
/// The Length field counts Unit ID + PDU, so the bytes remaining after this
/// header are `length - 1`.
pub const MBAP_HEADER_LEN: usize = 7;

/// Protocol identifier carried in the MBAP header; always zero for Modbus
pub const MODBUS_PROTOCOL_ID: u16 = 0;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
/// This is the fundamental limit inherited from RS485 implementation:
/// RS485 ADU (256 bytes) - Slave Address (1 byte) - CRC (2 bytes) = 253 bytes
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum MBAP length field value (Unit ID + PDU)
/// Used for validating the Length field in MBAP header
/// = 1 (Unit ID) + 253 (Max PDU) = 254 bytes
pub const MAX_MBAP_LENGTH: usize = 1 + MAX_PDU_SIZE;

/// Maximum number of registers for FC03 (Read Holding Registers)
///
/// Calculation for response PDU:
/// - Function Code: 1 byte
/// - Byte Count: 1 byte
/// - Register Data: N × 2 bytes
/// - Total: 1 + 1 + (N × 2) ≤ 253
/// - Therefore: N ≤ (253 - 2) / 2 = 125.5 → 125 registers
pub const MAX_READ_REGISTERS: usize = 125;

// ============================================================================
// Modbus Function and Exception Codes
// ============================================================================

/// Read Holding Registers (FC03) — the only function this crate issues
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// High bit set on the echoed function code marks an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Server Device Failure
pub const EXCEPTION_SERVER_DEVICE_FAILURE: u8 = 0x04;

/// Acknowledge
pub const EXCEPTION_ACKNOWLEDGE: u8 = 0x05;

/// Server Device Busy
pub const EXCEPTION_SERVER_DEVICE_BUSY: u8 = 0x06;

/// Gateway Path Unavailable
pub const EXCEPTION_GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;

/// Gateway Target Device Failed to Respond
pub const EXCEPTION_GATEWAY_TARGET_FAILED: u8 = 0x0B;

// ============================================================================
// Meter Register Map
// ============================================================================

/// Minimum register count a decodable response must carry
/// (voltage, current, power)
pub const MIN_REGISTER_COUNT: usize = 3;

/// Register offset of the voltage quantity
pub const REG_VOLTAGE: usize = 0;

/// Register offset of the current quantity
pub const REG_CURRENT: usize = 1;

/// Register offset of the power quantity
pub const REG_POWER: usize = 2;

/// Voltage registers hold decivolts: engineering value = raw / 10.0
pub const VOLTAGE_SCALE: f64 = 10.0;

/// Current registers hold centiamps: engineering value = raw / 100.0
pub const CURRENT_SCALE: f64 = 100.0;

// ============================================================================
// Simulation Ranges
// ============================================================================

/// Lower bound of simulated voltage, volts
pub const SIM_VOLTAGE_MIN: f64 = 210.0;

/// Upper bound of simulated voltage, volts
pub const SIM_VOLTAGE_MAX: f64 = 240.0;

/// Lower bound of simulated current, amps
pub const SIM_CURRENT_MIN: f64 = 0.0;

/// Upper bound of simulated current, amps
pub const SIM_CURRENT_MAX: f64 = 20.0;

/// Lower bound of the simulated power-factor multiplier
pub const SIM_POWER_FACTOR_MIN: f64 = 0.8;

/// Upper bound of the simulated power-factor multiplier
pub const SIM_POWER_FACTOR_MAX: f64 = 1.0;

// ============================================================================
// Defaults
// ============================================================================

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Default Modbus unit identifier
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Default base address of the meter's electrical quantities block
pub const DEFAULT_BASE_ADDRESS: u16 = 0;

/// Default number of holding registers polled per cycle
pub const DEFAULT_REGISTER_COUNT: u16 = 6;

/// Default connect timeout (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Default response timeout (5 seconds)
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5000;

/// Default poll interval between acquisition cycles
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MBAP_HEADER_LEN, 7);
        assert_eq!(MAX_PDU_SIZE, 253);
        assert_eq!(MAX_MBAP_LENGTH, 254);
    }

    #[test]
    fn test_register_limit() {
        // Verify read register limit calculation
        let read_pdu_size = 1 + 1 + (MAX_READ_REGISTERS * 2);
        assert!(read_pdu_size <= MAX_PDU_SIZE);
        assert_eq!(MAX_READ_REGISTERS, 125);
    }

    #[test]
    fn test_register_map_fits_default_poll() {
        // The mandatory quantities must fit inside the default poll window
        assert!(MIN_REGISTER_COUNT <= DEFAULT_REGISTER_COUNT as usize);
        assert!(REG_POWER < MIN_REGISTER_COUNT);
    }
}
