//! Modbus TCP server transport
//!
//! Thin transport layer in front of [`ProtocolEngine`]: an accept loop
//! that spawns one task per client connection. Each task owns its own
//! engine (and therefore its own reassembly buffer); the only state
//! shared between connections is the [`DataStore`].
//!
//! Closing a connection discards any buffered partial frame with no
//! effect on other connections or on committed bank values.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::constants::RECV_CHUNK_SIZE;
use crate::engine::ProtocolEngine;
use crate::error::{ModbusError, ModbusResult};
use crate::store::DataStore;

/// Byte and request counters for one connection, reported on disconnect.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectionStats {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub requests_handled: u64,
}

/// Modbus TCP server serving one shared [`DataStore`].
pub struct ModbusTcpServer {
    listener: TcpListener,
    store: Arc<DataStore>,
}

impl ModbusTcpServer {
    /// Bind to `addr` and prepare to serve `store`.
    pub async fn bind(addr: &str, store: Arc<DataStore>) -> ModbusResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| ModbusError::configuration(format!("Invalid bind address: {}", e)))?;
        let listener = TcpListener::bind(addr).await?;
        info!("Modbus TCP server listening on {}", listener.local_addr()?);
        Ok(Self { listener, store })
    }

    /// Actual bound address (useful when binding port 0)
    pub fn local_addr(&self) -> ModbusResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, spawning one handler task each.
    ///
    /// Returns only if `accept` itself fails; per-connection I/O errors
    /// are logged and close that connection alone.
    pub async fn serve(&self) -> ModbusResult<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            info!("Client connected: {}", peer);

            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                match handle_connection(stream, store).await {
                    Ok(stats) => info!(
                        "Client {} disconnected: {} requests, {} bytes in, {} bytes out",
                        peer, stats.requests_handled, stats.bytes_received, stats.bytes_sent
                    ),
                    Err(e) => warn!("Client {} connection error: {}", peer, e),
                }
            });
        }
    }
}

/// Per-connection loop: read chunks, run them through the engine, write
/// the responses back in request order.
async fn handle_connection(
    mut stream: TcpStream,
    store: Arc<DataStore>,
) -> ModbusResult<ConnectionStats> {
    let mut engine = ProtocolEngine::new(store);
    let mut stats = ConnectionStats::default();
    let mut chunk = vec![0u8; RECV_CHUNK_SIZE];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            // Peer closed; buffered partial frame is simply dropped.
            if engine.buffered() > 0 {
                debug!(
                    "Connection closed with {} unconsumed bytes buffered",
                    engine.buffered()
                );
            }
            return Ok(stats);
        }
        stats.bytes_received += n as u64;

        // The engine is synchronous, so responses are collected here and
        // written back afterwards, preserving request order.
        let mut responses: Vec<Bytes> = Vec::new();
        engine.process(&chunk[..n], |resp| responses.push(resp));

        for response in responses {
            stats.requests_handled += 1;
            stats.bytes_sent += response.len() as u64;
            stream.write_all(&response).await?;
        }
    }
}
