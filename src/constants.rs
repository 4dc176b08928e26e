//! Modbus protocol constants based on official specification
//!
//! These constants are derived from the official Modbus specification:
//! - Maximum PDU size: 253 bytes (inherited from RS485 ADU limit of 256 bytes)
//! - Quantity limits are calculated to fit within the PDU size constraint

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Modbus MBAP header length for TCP
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) = 6 bytes
/// The Length field counts everything after itself (Unit ID + PDU), so a
/// complete frame occupies `MBAP_HEADER_LEN + length` bytes on the wire.
pub const MBAP_HEADER_LEN: usize = 6;

/// Bytes needed before a frame's total size is known:
/// MBAP header (6) + Unit ID (1) + Function Code (1)
pub const FRAME_HEADER_LEN: usize = 8;

/// Minimum value of the MBAP Length field (Unit ID + Function Code)
pub const MIN_FRAME_LENGTH: u16 = 2;

/// Maximum value of the MBAP Length field accepted by the server.
/// 260 is the absolute ADU ceiling; anything above is rejected outright.
pub const MAX_FRAME_LENGTH: u16 = 260;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
/// This is the fundamental limit inherited from RS485 implementation:
/// RS485 ADU (256 bytes) - Slave Address (1 byte) - CRC (2 bytes) = 253 bytes
pub const MAX_PDU_SIZE: usize = 253;

/// Per-connection socket read chunk size. A full frame never exceeds
/// 266 bytes, so one chunk holds many pipelined requests.
pub const RECV_CHUNK_SIZE: usize = 8192;

// ============================================================================
// Quantity Limits (server-side request validation)
// ============================================================================

/// Maximum quantity for FC01/FC02 (Read Coils / Read Discrete Inputs)
///
/// Response PDU: function code (1) + byte count (1) + ceil(N / 8) bytes,
/// which fits the PDU for N up to 2008; the specification rounds this
/// down to 2000 (0x07D0).
pub const MAX_READ_COILS: u16 = 0x07D0;

/// Maximum quantity for FC03/FC04 (Read Holding/Input Registers)
///
/// Response PDU: function code (1) + byte count (1) + N × 2 bytes
/// ≤ 253, hence N ≤ 125 (0x007D).
pub const MAX_READ_REGISTERS: u16 = 0x007D;

/// Maximum quantity for FC15 (Write Multiple Coils)
///
/// Request PDU: function code (1) + address (2) + quantity (2) +
/// byte count (1) + ceil(N / 8) bytes ≤ 253, which the specification
/// rounds down to 1968 (0x07B0).
pub const MAX_WRITE_COILS: u16 = 0x07B0;

/// Maximum quantity for FC16 (Write Multiple Registers)
///
/// Request PDU: function code (1) + address (2) + quantity (2) +
/// byte count (1) + N × 2 bytes ≤ 253, hence N ≤ 123 (0x007B).
pub const MAX_WRITE_REGISTERS: u16 = 0x007B;

/// Full 16-bit address span; default capacity of a data bank
pub const BANK_FULL_SPAN: usize = 0x10000;
