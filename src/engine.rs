//! Modbus TCP protocol engine
//!
//! One [`ProtocolEngine`] serves one client connection. It owns that
//! connection's reassembly buffer and a shared reference to the device's
//! [`DataStore`]; the transport feeds it raw received bytes and supplies
//! a sink for encoded responses.
//!
//! The engine makes no assumption about chunk boundaries: bytes may
//! arrive one at a time or many frames at once, and any trailing partial
//! frame stays buffered for the next [`process`](ProtocolEngine::process)
//! call. Every complete, structurally valid request produces exactly one
//! response — a success frame or a Modbus exception frame — delivered in
//! request order.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::{decode_words, encode_words, pack_bits, unpack_bits};
use crate::constants::{
    MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};
use crate::frame::{ExceptionCode, FunctionCode, TcpFrame};
use crate::store::{BitBank, DataStore, WordBank};

/// Request handlers per Modbus Application Protocol v1.1b3, Section 6.
///
/// Protocol violations never escape as errors: a bad quantity or byte
/// count answers DATA_VALUE, an out-of-bank range answers DATA_ADDRESS,
/// and an unsupported function code answers ILLEGAL_FUNCTION.
pub struct ProtocolEngine {
    buffer: BytesMut,
    store: Arc<DataStore>,
}

impl ProtocolEngine {
    /// Create an engine for one connection, referencing the shared store.
    pub fn new(store: Arc<DataStore>) -> Self {
        Self {
            buffer: BytesMut::new(),
            store,
        }
    }

    /// Process a chunk of received bytes.
    ///
    /// Appends `data` to the reassembly buffer, then drains every frame
    /// that is now complete, calling `send` once with the encoded
    /// response for each request, in request order. Incomplete trailing
    /// bytes remain buffered.
    ///
    /// Frames that decode but fail the structural check (`is_valid`) are
    /// logged and dropped without a response; the Modbus standard leaves
    /// client-originated malformed ADUs unspecified, and this server
    /// keeps the connection up rather than guessing a reply.
    pub fn process<F: FnMut(Bytes)>(&mut self, data: &[u8], mut send: F) {
        self.buffer.extend_from_slice(data);

        while let Some(request) = TcpFrame::decode(&mut self.buffer) {
            if !request.is_valid() {
                warn!(
                    "Dropping malformed frame: txn={:#06x} proto={:#06x} length={}",
                    request.transaction_id, request.protocol_id, request.length
                );
                continue;
            }
            let response = self.dispatch(&request);
            send(response.encode());
        }
    }

    /// Number of bytes currently awaiting frame completion
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn dispatch(&self, request: &TcpFrame) -> TcpFrame {
        match FunctionCode::from_u8(request.function_code) {
            Some(fc) => {
                debug!(
                    "Handling {} (FC={:02X}) txn={:#06x}",
                    fc.description(),
                    fc.to_u8(),
                    request.transaction_id
                );
                match fc {
                    FunctionCode::ReadCoils => self.read_bits(&self.store.coils, request),
                    FunctionCode::ReadDiscreteInputs => {
                        self.read_bits(&self.store.discrete_inputs, request)
                    }
                    FunctionCode::ReadHoldingRegisters => {
                        self.read_words(&self.store.holding_registers, request)
                    }
                    FunctionCode::ReadInputRegisters => {
                        self.read_words(&self.store.input_registers, request)
                    }
                    FunctionCode::WriteSingleCoil => self.write_single_coil(request),
                    FunctionCode::WriteSingleRegister => self.write_single_register(request),
                    FunctionCode::WriteMultipleCoils => self.write_multiple_coils(request),
                    FunctionCode::WriteMultipleRegisters => self.write_multiple_registers(request),
                }
            }
            None => {
                warn!(
                    "Unsupported function code {:#04x}, answering ILLEGAL_FUNCTION",
                    request.function_code
                );
                request.exception(ExceptionCode::IllegalFunction)
            }
        }
    }

    /// Shared handler for FC01 and FC02.
    fn read_bits(&self, bank: &BitBank, request: &TcpFrame) -> TcpFrame {
        let Some((addr, count)) = two_words(request) else {
            return request.exception(ExceptionCode::DataValue);
        };
        if !(1..=MAX_READ_COILS).contains(&count) {
            return request.exception(ExceptionCode::DataValue);
        }

        let bits = match bank.get(addr, count as usize) {
            Ok(bits) => bits,
            Err(_) => return request.exception(ExceptionCode::DataAddress),
        };

        let packed = pack_bits(&bits);
        let mut data = Vec::with_capacity(1 + packed.len());
        data.push(packed.len() as u8);
        data.extend_from_slice(&packed);
        request.response(data)
    }

    /// Shared handler for FC03 and FC04.
    fn read_words(&self, bank: &WordBank, request: &TcpFrame) -> TcpFrame {
        let Some((addr, count)) = two_words(request) else {
            return request.exception(ExceptionCode::DataValue);
        };
        if !(1..=MAX_READ_REGISTERS).contains(&count) {
            return request.exception(ExceptionCode::DataValue);
        }

        let words = match bank.get(addr, count as usize) {
            Ok(words) => words,
            Err(_) => return request.exception(ExceptionCode::DataAddress),
        };

        let mut data = Vec::with_capacity(1 + words.len() * 2);
        data.push((words.len() * 2) as u8);
        data.extend_from_slice(&encode_words(&words));
        request.response(data)
    }

    /// FC05: value 0xFF00 switches the coil on, 0x0000 off; anything
    /// else is a DATA_VALUE violation.
    fn write_single_coil(&self, request: &TcpFrame) -> TcpFrame {
        let Some((addr, raw)) = two_words(request) else {
            return request.exception(ExceptionCode::DataValue);
        };
        let value = match raw {
            0x0000 => false,
            0xFF00 => true,
            _ => return request.exception(ExceptionCode::DataValue),
        };

        match self.store.coils.set(addr, &[value]) {
            Ok(()) => request.echo_response(),
            Err(_) => request.exception(ExceptionCode::DataAddress),
        }
    }

    /// FC06: no value validation beyond decoding; any u16 is writable.
    fn write_single_register(&self, request: &TcpFrame) -> TcpFrame {
        let Some((addr, value)) = two_words(request) else {
            return request.exception(ExceptionCode::DataValue);
        };

        match self.store.holding_registers.set(addr, &[value]) {
            Ok(()) => request.echo_response(),
            Err(_) => request.exception(ExceptionCode::DataAddress),
        }
    }

    /// FC15: packed bit payload; the request's declared byte count must
    /// match both the quantity and the bytes actually present.
    fn write_multiple_coils(&self, request: &TcpFrame) -> TcpFrame {
        let Some((addr, count, payload)) = multi_write_fields(request) else {
            return request.exception(ExceptionCode::DataValue);
        };
        if !(1..=MAX_WRITE_COILS).contains(&count)
            || payload.len() != (count as usize).div_ceil(8)
        {
            return request.exception(ExceptionCode::DataValue);
        }

        let bits = unpack_bits(payload, count as usize);
        match self.store.coils.set(addr, &bits) {
            Ok(()) => request.response(request.data.slice(0..4)),
            Err(_) => request.exception(ExceptionCode::DataAddress),
        }
    }

    /// FC16: word payload; declared byte count must equal quantity × 2.
    fn write_multiple_registers(&self, request: &TcpFrame) -> TcpFrame {
        let Some((addr, count, payload)) = multi_write_fields(request) else {
            return request.exception(ExceptionCode::DataValue);
        };
        if !(1..=MAX_WRITE_REGISTERS).contains(&count) || payload.len() != count as usize * 2 {
            return request.exception(ExceptionCode::DataValue);
        }

        let words = decode_words(payload);
        match self.store.holding_registers.set(addr, &words) {
            Ok(()) => request.response(request.data.slice(0..4)),
            Err(_) => request.exception(ExceptionCode::DataAddress),
        }
    }
}

/// Parse a four-byte request payload as two big-endian words
/// (address + quantity, or address + value).
fn two_words(request: &TcpFrame) -> Option<(u16, u16)> {
    let data = request.data.as_ref();
    if data.len() != 4 {
        return None;
    }
    Some((
        u16::from_be_bytes([data[0], data[1]]),
        u16::from_be_bytes([data[2], data[3]]),
    ))
}

/// Parse a multiple-write payload: address, quantity, then the value
/// bytes, whose length must match the declared byte count.
fn multi_write_fields(request: &TcpFrame) -> Option<(u16, u16, &[u8])> {
    let data = request.data.as_ref();
    if data.len() < 5 {
        return None;
    }
    let addr = u16::from_be_bytes([data[0], data[1]]);
    let count = u16::from_be_bytes([data[2], data[3]]);
    let byte_count = data[4] as usize;
    let payload = &data[5..];
    if payload.len() != byte_count {
        return None;
    }
    Some((addr, count, payload))
}
