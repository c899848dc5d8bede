// Integration tests for the framed server
//
// These tests start a real FramedServer on a random port in a background
// thread, then drive it with clients using the same framing.

use framewire_common::transport::{exchange, tcp, FramedServer, ServerConfig};
use framewire_common::{checksum, FramewireError, RetryPolicy, CHUNK_SIZE};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

/// Start an echo server in a background thread and return its address
fn start_echo_server(config: ServerConfig) -> String {
    let server = FramedServer::bind(config).expect("Failed to bind server");
    let addr = server.local_addr().expect("Failed to get local address").to_string();

    thread::spawn(move || {
        let _ = server.run_with_handler(|payload: &[u8]| payload.to_vec());
    });

    addr
}

fn connect(addr: &str) -> TcpStream {
    tcp::connect(addr, Some(Duration::from_secs(1))).expect("Failed to connect")
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

// ============================================================================
// Exchange Tests
// ============================================================================

#[test]
fn test_echo_many_sizes_on_one_connection() {
    let addr = start_echo_server(ServerConfig::default());
    let mut stream = connect(&addr);

    for len in [1, 5, 100, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 2 * CHUNK_SIZE, 3000] {
        let payload = pattern(len, len as u8);
        let reply = exchange::send_receive_with_timeout(&mut stream, &payload, Duration::from_secs(5), None)
            .unwrap_or_else(|e| panic!("exchange of {len} bytes failed: {e}"));
        assert_eq!(reply.len(), len);
        assert_eq!(checksum(&reply), checksum(&payload));
        assert_eq!(reply, payload);
    }
}

#[test]
fn test_echo_empty_payload() {
    let addr = start_echo_server(ServerConfig::default());
    let mut stream = connect(&addr);

    let reply = exchange::send_receive_with_timeout(&mut stream, &[], Duration::from_secs(5), None).unwrap();
    assert!(reply.is_empty());

    // The connection is still usable afterwards.
    let reply = exchange::send_receive_with_timeout(&mut stream, b"after", Duration::from_secs(5), None).unwrap();
    assert_eq!(reply, b"after");
}

#[test]
fn test_exact_chunk_send_receive_with_retry_policy() {
    let addr = start_echo_server(ServerConfig::default().with_retry(Some(RetryPolicy::from_millis(2, 10))));
    let mut stream = connect(&addr);

    let payload = pattern(CHUNK_SIZE, 7);
    let reply = exchange::send_receive(&mut stream, &payload, Some(RetryPolicy::from_millis(2, 10))).unwrap();
    assert_eq!(reply, payload);
}

#[test]
fn test_concurrent_clients() {
    let addr = start_echo_server(ServerConfig::default());

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let addr = addr.clone();
            thread::spawn(move || {
                let mut stream = connect(&addr);
                for round in 0..5usize {
                    let payload = pattern(100 + round * 300, i);
                    let reply =
                        exchange::send_receive_with_timeout(&mut stream, &payload, Duration::from_secs(5), None)
                            .unwrap();
                    assert_eq!(reply, payload);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("client thread panicked");
    }
}

#[test]
fn test_idle_connection_is_closed_by_server() {
    let addr = start_echo_server(ServerConfig::default().with_read_timeout(Some(Duration::from_millis(100))));
    let mut stream = connect(&addr);

    // Outlast the server's idle timeout, then look for the close.
    thread::sleep(Duration::from_millis(300));
    let received = exchange::receive_with_timeout(&mut stream, Duration::from_secs(2), None).unwrap();
    assert!(received.is_empty());
}

#[test]
fn test_reply_timeout_against_silent_server() {
    // A server whose handler never answers in time.
    let server = FramedServer::bind(ServerConfig::default()).unwrap();
    let addr = server.local_addr().unwrap().to_string();
    thread::spawn(move || {
        let _ = server.run_with_handler(|payload: &[u8]| {
            thread::sleep(Duration::from_millis(500));
            payload.to_vec()
        });
    });

    let mut stream = connect(&addr);
    let err = exchange::send_receive_with_timeout(&mut stream, b"slow", Duration::from_millis(100), None).unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
    assert!(matches!(err, FramewireError::Read { retries: 0, .. }));
}

#[test]
fn test_connect_timeout_to_closed_port_fails() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = tcp::connect(&format!("127.0.0.1:{port}"), Some(Duration::from_millis(200))).unwrap_err();
    assert!(
        matches!(err, FramewireError::Connect { .. } | FramewireError::ConnectTimeout { .. }),
        "got {err:?}"
    );
}
