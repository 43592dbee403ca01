//! Modbus TCP framing for the single transaction this crate performs
//!
//! The meter is polled with one Read Holding Registers request (FC03) per
//! acquisition cycle, so the codec covers exactly that: MBAP header plus a
//! five-byte request PDU out, MBAP header plus a register payload (or an
//! exception PDU) back.
//!
//! Request frame layout:
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0-1 | Transaction ID |
//! | 2-3 | Protocol ID (always 0) |
//! | 4-5 | Length (Unit ID + PDU) |
//! | 6 | Unit ID |
//! | 7 | Function code (0x03) |
//! | 8-9 | Starting address |
//! | 10-11 | Register quantity |

use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use crate::constants::{
    EXCEPTION_ACKNOWLEDGE, EXCEPTION_FLAG, EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
    EXCEPTION_GATEWAY_TARGET_FAILED, EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_DATA_VALUE,
    EXCEPTION_ILLEGAL_FUNCTION, EXCEPTION_SERVER_DEVICE_BUSY, EXCEPTION_SERVER_DEVICE_FAILURE,
    FC_READ_HOLDING_REGISTERS, MAX_MBAP_LENGTH, MBAP_HEADER_LEN, MODBUS_PROTOCOL_ID,
};
use crate::error::{LinkError, LinkResult};

/// One holding-register read request (FC03).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// Transaction identifier echoed by the device
    pub transaction_id: u16,
    /// Modbus unit/slave identifier
    pub unit_id: u8,
    /// Starting register address
    pub address: u16,
    /// Number of registers to read
    pub quantity: u16,
}

impl ReadRequest {
    /// Encode the full MBAP frame for this request.
    pub fn encode(&self) -> BytesMut {
        // Length field: unit id + function code + address + quantity
        let mut frame = BytesMut::with_capacity(MBAP_HEADER_LEN + 5);
        frame.put_u16(self.transaction_id);
        frame.put_u16(MODBUS_PROTOCOL_ID);
        frame.put_u16(6);
        frame.put_u8(self.unit_id);
        frame.put_u8(FC_READ_HOLDING_REGISTERS);
        frame.put_u16(self.address);
        frame.put_u16(self.quantity);

        debug!(
            transaction_id = self.transaction_id,
            address = self.address,
            quantity = self.quantity,
            "FC03 request encoded"
        );
        frame
    }
}

/// Parsed MBAP header of a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    /// Echoed transaction identifier
    pub transaction_id: u16,
    /// Responding unit identifier
    pub unit_id: u8,
    /// Bytes of PDU following the header (length field minus the unit id)
    pub pdu_len: usize,
}

/// Parse and validate a response MBAP header.
pub fn parse_mbap_header(raw: &[u8; MBAP_HEADER_LEN]) -> LinkResult<MbapHeader> {
    let mut buf = &raw[..];
    let transaction_id = buf.get_u16();
    let protocol_id = buf.get_u16();
    let length = buf.get_u16() as usize;
    let unit_id = buf.get_u8();

    if protocol_id != MODBUS_PROTOCOL_ID {
        return Err(LinkError::read_failed(format!(
            "unexpected protocol id {protocol_id:#06x}"
        )));
    }
    if length == 0 || length > MAX_MBAP_LENGTH {
        return Err(LinkError::read_failed(format!(
            "invalid MBAP length {length} (max {MAX_MBAP_LENGTH})"
        )));
    }

    Ok(MbapHeader {
        transaction_id,
        unit_id,
        pdu_len: length - 1,
    })
}

/// Parse the response PDU for a request, returning the register values.
///
/// Rejects transaction-id and unit-id mismatches, maps device exception
/// responses to [`LinkError::ReadFailed`], and validates the byte count
/// against the requested quantity.
pub fn parse_read_response(
    request: &ReadRequest,
    header: &MbapHeader,
    pdu: &[u8],
) -> LinkResult<Vec<u16>> {
    if header.transaction_id != request.transaction_id {
        return Err(LinkError::read_failed(format!(
            "transaction id mismatch: sent {}, got {}",
            request.transaction_id, header.transaction_id
        )));
    }
    if header.unit_id != request.unit_id {
        return Err(LinkError::read_failed(format!(
            "unit id mismatch: sent {}, got {}",
            request.unit_id, header.unit_id
        )));
    }
    if pdu.is_empty() {
        return Err(LinkError::read_failed("empty response PDU"));
    }

    let function = pdu[0];
    if function == FC_READ_HOLDING_REGISTERS | EXCEPTION_FLAG {
        let code = pdu.get(1).copied().unwrap_or(0);
        return Err(LinkError::read_failed(format!(
            "device exception {code:#04x}: {}",
            exception_description(code)
        )));
    }
    if function != FC_READ_HOLDING_REGISTERS {
        return Err(LinkError::read_failed(format!(
            "unexpected function code {function:#04x}"
        )));
    }
    if pdu.len() < 2 {
        return Err(LinkError::read_failed("response PDU truncated"));
    }

    let byte_count = pdu[1] as usize;
    let expected = request.quantity as usize * 2;
    if byte_count != expected {
        return Err(LinkError::read_failed(format!(
            "byte count mismatch: expected {expected}, got {byte_count}"
        )));
    }
    if pdu.len() != 2 + byte_count {
        return Err(LinkError::read_failed(format!(
            "response PDU length mismatch: expected {}, got {}",
            2 + byte_count,
            pdu.len()
        )));
    }

    let mut data = &pdu[2..];
    let mut registers = Vec::with_capacity(request.quantity as usize);
    while data.has_remaining() {
        registers.push(data.get_u16());
    }

    debug!(
        transaction_id = header.transaction_id,
        registers = registers.len(),
        "FC03 response parsed"
    );
    Ok(registers)
}

/// Human-readable description of a Modbus exception code.
pub fn exception_description(code: u8) -> &'static str {
    match code {
        EXCEPTION_ILLEGAL_FUNCTION => "Illegal Function",
        EXCEPTION_ILLEGAL_DATA_ADDRESS => "Illegal Data Address",
        EXCEPTION_ILLEGAL_DATA_VALUE => "Illegal Data Value",
        EXCEPTION_SERVER_DEVICE_FAILURE => "Server Device Failure",
        EXCEPTION_ACKNOWLEDGE => "Acknowledge",
        EXCEPTION_SERVER_DEVICE_BUSY => "Server Device Busy",
        EXCEPTION_GATEWAY_PATH_UNAVAILABLE => "Gateway Path Unavailable",
        EXCEPTION_GATEWAY_TARGET_FAILED => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}
