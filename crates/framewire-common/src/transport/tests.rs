//! Loopback tests for the transport layer
//!
//! These tests run the framed exchange over real TCP socket pairs on
//! 127.0.0.1, one peer per thread.

#[cfg(test)]
mod tests {
    use crate::protocol::framing::{HeuristicChunkFraming, CHUNK_SIZE};
    use crate::protocol::FramewireError;
    use crate::transport::exchange::{self, FrameEnd, FramedExchange};
    use crate::transport::tcp;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Returns a connected (client, server) pair.
    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let client = tcp::connect(&addr, Some(Duration::from_secs(1))).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_round_trip_unaligned_payload() {
        let (mut client, mut server) = socket_pair();
        let payload = pattern(1500);

        let sender = {
            let payload = payload.clone();
            thread::spawn(move || exchange::send(&mut client, &payload, None).unwrap())
        };

        let received = exchange::receive(&mut server, None).unwrap();
        sender.join().unwrap();
        assert_eq!(received, payload);
    }

    #[test]
    fn test_round_trip_aligned_payload_strips_terminator() {
        let (mut client, mut server) = socket_pair();
        let payload = pattern(CHUNK_SIZE);

        exchange::send(&mut client, &payload, None).unwrap();

        let frame = FramedExchange::new().receive_frame(&mut server, None).unwrap();
        assert_eq!(frame.end, FrameEnd::Terminator);
        assert_eq!(frame.payload, payload);
    }

    #[test]
    fn test_receive_on_closed_connection_is_empty() {
        let (client, mut server) = socket_pair();
        drop(client);

        let received = exchange::receive(&mut server, None).unwrap();
        assert!(received.is_empty());
    }

    #[test]
    fn test_receive_with_timeout_expires_and_clears_deadline() {
        let (mut client, mut server) = socket_pair();

        let start = Instant::now();
        let err = exchange::receive_with_timeout(&mut server, Duration::from_millis(100), None).unwrap_err();
        assert!(err.is_timeout(), "got {err:?}");
        assert!(start.elapsed() >= Duration::from_millis(90));
        assert_eq!(err.partial_payload(), Some(&[][..]));

        // The deadline does not outlive the call.
        assert_eq!(server.read_timeout().unwrap(), None);

        client.write_all(b"late").unwrap();
        assert_eq!(exchange::receive(&mut server, None).unwrap(), b"late");
    }

    #[test]
    fn test_receive_deadline_bounds_retries() {
        let (mut client, mut server) = socket_pair();

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            client.write_all(b"eventually").unwrap();
            client
        });

        // The deadline covers the whole call, so retries alone cannot outlast it.
        let err = exchange::receive_with_timeout(
            &mut server,
            Duration::from_millis(50),
            Some(crate::RetryPolicy::from_millis(3, 10)),
        )
        .unwrap_err();
        assert!(matches!(err, FramewireError::Read { retries: 3, .. }), "got {err:?}");

        let _client = writer.join().unwrap();
        assert_eq!(exchange::receive(&mut server, None).unwrap(), b"eventually");
    }

    #[test]
    fn test_send_receive_exact_chunk_between_two_engines() {
        let (mut client, mut server) = socket_pair();

        let responder = thread::spawn(move || {
            let exchange = FramedExchange::new();
            let request = exchange.receive(&mut server, None).unwrap();
            let mut reply = request.clone();
            reply.reverse();
            exchange.send(&mut server, &reply, None).unwrap();
            request
        });

        let payload = pattern(CHUNK_SIZE);
        let reply = exchange::send_receive_with_timeout(&mut client, &payload, Duration::from_secs(5), None).unwrap();

        let request = responder.join().unwrap();
        assert_eq!(request, payload);
        let mut expected = payload.clone();
        expected.reverse();
        assert_eq!(reply, expected);
    }

    #[test]
    fn test_send_to_closed_peer_eventually_reports_end_of_stream() {
        let (mut client, server) = socket_pair();
        drop(server);
        thread::sleep(Duration::from_millis(50));

        // The first writes may still land in the socket buffer; keep going
        // until the reset from the peer surfaces.
        let payload = pattern(64 * 1024);
        let err = (0..100)
            .find_map(|_| exchange::send(&mut client, &payload, Some(crate::RetryPolicy::from_millis(5, 1))).err())
            .expect("send to a closed peer never failed");
        assert!(matches!(err, FramewireError::EndOfStream { .. }), "got {err:?}");
    }

    #[test]
    fn test_send_with_timeout_clears_write_deadline() {
        let (mut client, mut server) = socket_pair();

        exchange::send_with_timeout(&mut client, b"bounded", Duration::from_secs(1), None).unwrap();
        assert_eq!(client.write_timeout().unwrap(), None);

        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"bounded");
    }

    #[test]
    fn test_receive_with_timeout_keeps_caller_timeout() {
        let (mut client, mut server) = socket_pair();
        server.set_read_timeout(Some(Duration::from_secs(7))).unwrap();

        let err = exchange::receive_with_timeout(&mut server, Duration::from_millis(20), None).unwrap_err();
        assert!(err.is_timeout(), "got {err:?}");
        assert_eq!(server.read_timeout().unwrap(), Some(Duration::from_secs(7)));

        client.write_all(b"after").unwrap();
        assert_eq!(exchange::receive(&mut server, None).unwrap(), b"after");
    }

    #[test]
    fn test_unbounded_timeout_does_not_overflow() {
        let (mut client, mut server) = socket_pair();

        exchange::send_with_timeout(&mut client, b"forever", Duration::MAX, None).unwrap();
        let received = exchange::receive_with_timeout(&mut server, Duration::MAX, None).unwrap();
        assert_eq!(received, b"forever");
        assert_eq!(server.read_timeout().unwrap(), None);
    }

    #[test]
    fn test_small_chunk_size_round_trip_over_loopback() {
        let (mut client, mut server) = socket_pair();
        let exchange = FramedExchange::with_framing(HeuristicChunkFraming::with_chunk_size(4));

        exchange.send(&mut client, b"abcd", None).unwrap();
        assert_eq!(exchange.receive(&mut server, None).unwrap(), b"abcd");
    }
}
