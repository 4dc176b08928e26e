//! Core error types and result handling

use thiserror::Error;

/// Result type used throughout the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors produced by the protocol engine and its collaborators.
///
/// Protocol-level faults in a request (bad quantity, bad address) never
/// surface as `ModbusError` past the engine boundary; they are translated
/// into Modbus exception frames and answered on the wire. The variants
/// here cover local faults: data bank misuse, malformed frames, I/O.
#[derive(Error, Debug)]
pub enum ModbusError {
    /// Requested cell range falls outside a data bank
    #[error("address range [{start:#06x}, {end:#06x}) exceeds bank capacity {capacity:#06x}")]
    AddressRange {
        start: usize,
        end: usize,
        capacity: usize,
    },

    /// Protocol violation (malformed frame, oversized PDU, etc.)
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Invalid or inconsistent data
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Unsupported function code
    #[error("invalid function code: {code:#04x}")]
    InvalidFunction { code: u8 },

    /// Configuration error (bad bind address, bad capacity, etc.)
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Underlying transport I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModbusError {
    /// Create a protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        ModbusError::Protocol {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        ModbusError::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        ModbusError::Configuration {
            message: message.into(),
        }
    }
}
