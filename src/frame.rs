//! Modbus TCP ADU framing and derivation
//!
//! A [`TcpFrame`] is one Application Data Unit:
//!
//! ```text
//! offset 0: transaction id   u16   echoed into the response
//! offset 2: protocol id      u16   always 0 for Modbus
//! offset 4: length           u16   = 2 + data length
//! offset 6: unit id          u8    passed through unchanged
//! offset 7: function code    u8
//! offset 8: data             length - 2 bytes
//! ```
//!
//! All multi-byte fields are big-endian. Decoding has partial-consumption
//! semantics: [`TcpFrame::decode`] removes exactly one complete frame from
//! the front of the buffer, or nothing at all.

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::constants::{FRAME_HEADER_LEN, MAX_FRAME_LENGTH, MBAP_HEADER_LEN, MIN_FRAME_LENGTH};

/// The eight function codes this server implements.
///
/// Unknown codes have no variant on purpose: `from_u8` returns `None` and
/// the engine's dispatch answers with an ILLEGAL_FUNCTION exception, so
/// every structurally valid request gets exactly one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    /// Read Coils (FC01)
    ReadCoils = 0x01,
    /// Read Discrete Inputs (FC02)
    ReadDiscreteInputs = 0x02,
    /// Read Holding Registers (FC03)
    ReadHoldingRegisters = 0x03,
    /// Read Input Registers (FC04)
    ReadInputRegisters = 0x04,
    /// Write Single Coil (FC05)
    WriteSingleCoil = 0x05,
    /// Write Single Register (FC06)
    WriteSingleRegister = 0x06,
    /// Write Multiple Coils (FC15)
    WriteMultipleCoils = 0x0F,
    /// Write Multiple Registers (FC16)
    WriteMultipleRegisters = 0x10,
}

impl FunctionCode {
    /// Parse a wire function code; `None` for anything unsupported.
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::ReadCoils),
            0x02 => Some(Self::ReadDiscreteInputs),
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            0x05 => Some(Self::WriteSingleCoil),
            0x06 => Some(Self::WriteSingleRegister),
            0x0F => Some(Self::WriteMultipleCoils),
            0x10 => Some(Self::WriteMultipleRegisters),
            _ => None,
        }
    }

    /// Wire representation
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable name, for logs
    pub fn description(self) -> &'static str {
        match self {
            Self::ReadCoils => "Read Coils",
            Self::ReadDiscreteInputs => "Read Discrete Inputs",
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteSingleCoil => "Write Single Coil",
            Self::WriteSingleRegister => "Write Single Register",
            Self::WriteMultipleCoils => "Write Multiple Coils",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
        }
    }
}

/// Modbus standard exception codes.
///
/// The full table is defined for completeness; this server only ever
/// emits `IllegalFunction`, `DataAddress` and `DataValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExceptionCode {
    IllegalFunction = 0x01,
    DataAddress = 0x02,
    DataValue = 0x03,
    SlaveDeviceFailure = 0x04,
    Acknowledge = 0x05,
    SlaveDeviceBusy = 0x06,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetFailedToRespond = 0x0B,
}

/// One Modbus TCP Application Data Unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpFrame {
    /// Client-assigned correlation id, echoed verbatim into responses
    pub transaction_id: u16,
    /// Always 0 for Modbus
    pub protocol_id: u16,
    /// Byte count of unit id + function code + data
    pub length: u16,
    /// Multi-drop addressing field, not interpreted by this server
    pub unit_id: u8,
    /// Raw wire function code (may be unsupported)
    pub function_code: u8,
    /// PDU payload, `length - 2` bytes
    pub data: Bytes,
}

impl TcpFrame {
    /// Decode one frame from the front of `buf`.
    ///
    /// Returns `None` without consuming anything when the buffer does not
    /// yet hold a complete frame: either fewer than 8 header bytes, or
    /// fewer than the `6 + length` total bytes the header announces.
    /// On success exactly one frame's bytes are removed; any remainder is
    /// left in place for the next call.
    ///
    /// A wire `length` below 2 cannot describe a PDU; the 8 header bytes
    /// are consumed and an empty-data frame is returned, which `is_valid`
    /// then rejects.
    pub fn decode(buf: &mut BytesMut) -> Option<TcpFrame> {
        if buf.len() < FRAME_HEADER_LEN {
            return None;
        }

        let length = u16::from_be_bytes([buf[4], buf[5]]);
        let total = MBAP_HEADER_LEN + length.max(MIN_FRAME_LENGTH) as usize;
        if buf.len() < total {
            // Header stays buffered; re-decoding later sees it again.
            return None;
        }

        let mut frame = buf.split_to(total);
        let transaction_id = frame.get_u16();
        let protocol_id = frame.get_u16();
        let length = frame.get_u16();
        let unit_id = frame.get_u8();
        let function_code = frame.get_u8();
        let data = frame.freeze();

        debug!(
            "Frame decoded: txn={:#06x} unit={} fc={:#04x} data_len={}",
            transaction_id,
            unit_id,
            function_code,
            data.len()
        );

        Some(TcpFrame {
            transaction_id,
            protocol_id,
            length,
            unit_id,
            function_code,
            data,
        })
    }

    /// Encode this frame into its wire representation, byte-exact.
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(FRAME_HEADER_LEN + self.data.len());
        out.extend_from_slice(&self.transaction_id.to_be_bytes());
        out.extend_from_slice(&self.protocol_id.to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(&[self.unit_id, self.function_code]);
        out.extend_from_slice(&self.data);
        out.freeze()
    }

    /// Check structural integrity of this frame.
    pub fn is_valid(&self) -> bool {
        self.protocol_id == 0
            && (MIN_FRAME_LENGTH..=MAX_FRAME_LENGTH).contains(&self.length)
            && self.data.len() == self.length as usize - 2
    }

    /// Build an exception response to this request.
    ///
    /// Copies the correlation fields, sets the exception bit on the
    /// function code and carries the exception code as the single data
    /// byte (`length` = 3).
    pub fn exception(&self, code: ExceptionCode) -> TcpFrame {
        TcpFrame {
            transaction_id: self.transaction_id,
            protocol_id: self.protocol_id,
            length: 3,
            unit_id: self.unit_id,
            function_code: self.function_code | 0x80,
            data: Bytes::copy_from_slice(&[code as u8]),
        }
    }

    /// Build a success response to this request with the given data
    /// section; `length` is recomputed.
    pub fn response(&self, data: impl Into<Bytes>) -> TcpFrame {
        let data = data.into();
        TcpFrame {
            transaction_id: self.transaction_id,
            protocol_id: self.protocol_id,
            length: 2 + data.len() as u16,
            unit_id: self.unit_id,
            function_code: self.function_code,
            data,
        }
    }

    /// Build a success response that echoes the request's own data
    /// section, as the single-write confirmations do.
    pub fn echo_response(&self) -> TcpFrame {
        self.response(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_request_bytes() -> Vec<u8> {
        // txn=0x0102, proto=0, len=6, unit=0x11, FC03, addr=0x006B, qty=3
        vec![
            0x01, 0x02, 0x00, 0x00, 0x00, 0x06, 0x11, 0x03, 0x00, 0x6B, 0x00, 0x03,
        ]
    }

    #[test]
    fn test_decode_complete_frame() {
        let mut buf = BytesMut::from(&read_request_bytes()[..]);
        let frame = TcpFrame::decode(&mut buf).unwrap();

        assert_eq!(frame.transaction_id, 0x0102);
        assert_eq!(frame.protocol_id, 0);
        assert_eq!(frame.length, 6);
        assert_eq!(frame.unit_id, 0x11);
        assert_eq!(frame.function_code, 0x03);
        assert_eq!(frame.data.as_ref(), &[0x00, 0x6B, 0x00, 0x03]);
        assert!(frame.is_valid());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete_consumes_nothing() {
        let bytes = read_request_bytes();
        // Every strict prefix must decode to None and leave the buffer alone
        for cut in 0..bytes.len() {
            let mut buf = BytesMut::from(&bytes[..cut]);
            assert!(TcpFrame::decode(&mut buf).is_none(), "cut at {cut}");
            assert_eq!(buf.len(), cut);
        }
    }

    #[test]
    fn test_decode_leaves_remainder() {
        let mut bytes = read_request_bytes();
        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
        let mut buf = BytesMut::from(&bytes[..]);

        let frame = TcpFrame::decode(&mut buf).unwrap();
        assert_eq!(frame.function_code, 0x03);
        assert_eq!(buf.as_ref(), &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_encode_roundtrip() {
        let mut buf = BytesMut::from(&read_request_bytes()[..]);
        let frame = TcpFrame::decode(&mut buf).unwrap();
        assert_eq!(frame.encode().as_ref(), &read_request_bytes()[..]);
    }

    #[test]
    fn test_is_valid_rejects_bad_frames() {
        let mut buf = BytesMut::from(&read_request_bytes()[..]);
        let frame = TcpFrame::decode(&mut buf).unwrap();

        let mut bad = frame.clone();
        bad.protocol_id = 1;
        assert!(!bad.is_valid());

        let mut bad = frame.clone();
        bad.length = 7; // no longer matches data length
        assert!(!bad.is_valid());

        let mut bad = frame;
        bad.length = 300;
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_decode_undersized_length_field() {
        // length=0 cannot hold unit id + function code
        let mut buf = BytesMut::from(
            &[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x11, 0x03, 0xFF, 0xFF][..],
        );
        let frame = TcpFrame::decode(&mut buf).unwrap();
        assert!(!frame.is_valid());
        assert!(frame.data.is_empty());
        // Trailing bytes stay for resynchronization
        assert_eq!(buf.as_ref(), &[0xFF, 0xFF]);
    }

    #[test]
    fn test_exception_frame() {
        let mut buf = BytesMut::from(&read_request_bytes()[..]);
        let request = TcpFrame::decode(&mut buf).unwrap();
        let exc = request.exception(ExceptionCode::DataAddress);

        assert_eq!(exc.transaction_id, request.transaction_id);
        assert_eq!(exc.unit_id, request.unit_id);
        assert_eq!(exc.function_code, 0x83);
        assert_eq!(exc.length, 3);
        assert_eq!(exc.data.as_ref(), &[0x02]);
        assert!(exc.is_valid());
    }

    #[test]
    fn test_response_recomputes_length() {
        let mut buf = BytesMut::from(&read_request_bytes()[..]);
        let request = TcpFrame::decode(&mut buf).unwrap();

        let resp = request.response(vec![0x06, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(resp.length, 9);
        assert_eq!(resp.function_code, 0x03);
        assert!(resp.is_valid());

        let echo = request.echo_response();
        assert_eq!(echo.data, request.data);
        assert_eq!(echo.length, request.length);
    }

    #[test]
    fn test_function_code_mapping() {
        for (code, fc) in [
            (0x01, FunctionCode::ReadCoils),
            (0x02, FunctionCode::ReadDiscreteInputs),
            (0x03, FunctionCode::ReadHoldingRegisters),
            (0x04, FunctionCode::ReadInputRegisters),
            (0x05, FunctionCode::WriteSingleCoil),
            (0x06, FunctionCode::WriteSingleRegister),
            (0x0F, FunctionCode::WriteMultipleCoils),
            (0x10, FunctionCode::WriteMultipleRegisters),
        ] {
            assert_eq!(FunctionCode::from_u8(code), Some(fc));
            assert_eq!(fc.to_u8(), code);
        }
        assert_eq!(FunctionCode::from_u8(0x99), None);
        assert_eq!(FunctionCode::from_u8(0x17), None);
    }
}
