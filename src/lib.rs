//! # Simbus - Modbus TCP Server Engine for Simulated Devices
//!
//! A Modbus TCP protocol engine that lets an arbitrary simulated device
//! be queried and controlled by real industrial-control client software
//! over the standard Modbus wire protocol, without requiring hardware.
//!
//! ## Features
//!
//! - **Byte-exact protocol engine**: MBAP framing with partial-frame
//!   reassembly across arbitrary chunk boundaries
//! - **Four-bank memory model**: discrete inputs, coils, input registers,
//!   holding registers, shared safely across connections
//! - **Complete exception mapping**: every protocol violation answers
//!   with the standard Modbus exception frame
//! - **Transport included**: async TCP server with Tokio, one engine per
//!   connection
//! - **Memory safe**: pure Rust, zero unsafe code
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Server |
//! |------|----------|--------|
//! | 0x01 | Read Coils | ✅ |
//! | 0x02 | Read Discrete Inputs | ✅ |
//! | 0x03 | Read Holding Registers | ✅ |
//! | 0x04 | Read Input Registers | ✅ |
//! | 0x05 | Write Single Coil | ✅ |
//! | 0x06 | Write Single Register | ✅ |
//! | 0x0F | Write Multiple Coils | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ |
//!
//! Any other function code is answered with an ILLEGAL_FUNCTION
//! exception frame rather than an error, so a well-formed request never
//! goes unanswered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use simbus::{DataStore, ModbusTcpServer};
//!
//! #[tokio::main]
//! async fn main() -> simbus::ModbusResult<()> {
//!     // The device's memory, shared with every client connection
//!     let store = Arc::new(DataStore::new());
//!     store.holding_registers.set(0, &[0x1234, 0x5678])?;
//!
//!     // Serve it over Modbus TCP
//!     let server = ModbusTcpServer::bind("0.0.0.0:502", Arc::clone(&store)).await?;
//!     server.serve().await
//! }
//! ```
//!
//! The engine itself is transport-agnostic: feed it bytes with
//! [`ProtocolEngine::process`] and collect encoded responses from the
//! supplied sink, under whatever I/O model you prefer.

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Modbus TCP ADU framing and derivation
pub mod frame;

/// Bit- and word-level payload packing
pub mod codec;

/// Addressable data banks backing a simulated device
pub mod store;

/// The per-connection protocol engine and request handlers
pub mod engine;

/// Async TCP server transport
pub mod server;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use simbus::tokio) ===
pub use tokio;

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use engine::ProtocolEngine;
pub use frame::{ExceptionCode, FunctionCode, TcpFrame};
pub use store::{BitBank, DataBank, DataStore, WordBank};

// === Transport ===
pub use server::{ConnectionStats, ModbusTcpServer};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
