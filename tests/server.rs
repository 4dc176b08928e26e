//! End-to-end tests over a real TCP socket: raw client frames in,
//! byte-exact responses out.

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use simbus::{DataStore, ModbusTcpServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::Level;

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

async fn spawn_server(store: Arc<DataStore>) -> SocketAddr {
    let server = ModbusTcpServer::bind("127.0.0.1:0", store).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.serve().await;
    });
    addr
}

async fn read_response(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 8];
    stream.read_exact(&mut header).await.unwrap();
    let length = u16::from_be_bytes([header[4], header[5]]) as usize;
    let mut rest = vec![0u8; length - 2];
    stream.read_exact(&mut rest).await.unwrap();
    let mut response = header.to_vec();
    response.extend_from_slice(&rest);
    response
}

#[tokio::test]
async fn read_holding_registers_over_tcp() {
    init_tracing();
    let store = Arc::new(DataStore::new());
    store.holding_registers.set(0, &[0x1234, 0xABCD]).unwrap();
    let addr = spawn_server(store).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(&[
            0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02,
        ])
        .await
        .unwrap();

    let response = read_response(&mut stream).await;
    assert_eq!(
        response,
        vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0x12, 0x34, 0xAB, 0xCD]
    );
}

#[tokio::test]
async fn split_frame_across_tcp_writes() {
    init_tracing();
    let store = Arc::new(DataStore::new());
    store.input_registers.set(5, &[0x0BB8]).unwrap();
    let addr = spawn_server(store).await;

    let request = [
        0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x01, 0x04, 0x00, 0x05, 0x00, 0x01,
    ];

    let mut stream = TcpStream::connect(addr).await.unwrap();
    // Header fragment first, the rest after a delay: the server must
    // buffer and answer once the frame completes.
    stream.write_all(&request[..5]).await.unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    stream.write_all(&request[5..]).await.unwrap();

    let response = read_response(&mut stream).await;
    assert_eq!(
        response,
        vec![0x00, 0x07, 0x00, 0x00, 0x00, 0x05, 0x01, 0x04, 0x02, 0x0B, 0xB8]
    );
}

#[tokio::test]
async fn writes_visible_across_connections() {
    init_tracing();
    let store = Arc::new(DataStore::new());
    let addr = spawn_server(Arc::clone(&store)).await;

    // First client writes a register
    let write = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x00, 0x64, 0xBE, 0xEF,
    ];
    let mut writer = TcpStream::connect(addr).await.unwrap();
    writer.write_all(&write).await.unwrap();
    // Confirmation echoes the request
    assert_eq!(read_response(&mut writer).await, write.to_vec());

    // Second client reads it back through its own engine
    let mut reader = TcpStream::connect(addr).await.unwrap();
    reader
        .write_all(&[
            0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x64, 0x00, 0x01,
        ])
        .await
        .unwrap();
    assert_eq!(
        read_response(&mut reader).await,
        vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0xBE, 0xEF]
    );

    // The shared store saw the committed value too
    assert_eq!(store.holding_registers.get(0x64, 1).unwrap(), vec![0xBEEF]);
}

#[tokio::test]
async fn pipelined_requests_one_write() {
    init_tracing();
    let store = Arc::new(DataStore::new());
    let addr = spawn_server(store).await;

    // Two requests in a single TCP segment
    let mut bytes = vec![
        0x00, 0x0A, 0x00, 0x00, 0x00, 0x06, 0x01, 0x05, 0x00, 0x00, 0xFF, 0x00,
    ];
    bytes.extend_from_slice(&[
        0x00, 0x0B, 0x00, 0x00, 0x00, 0x06, 0x01, 0x01, 0x00, 0x00, 0x00, 0x01,
    ]);

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&bytes).await.unwrap();

    let first = read_response(&mut stream).await;
    let second = read_response(&mut stream).await;
    assert_eq!(&first[..2], &[0x00, 0x0A]);
    assert_eq!(first[7], 0x05);
    assert_eq!(&second[..2], &[0x00, 0x0B]);
    // The coil just written reads back on
    assert_eq!(&second[7..], &[0x01, 0x01, 0x01]);
}
