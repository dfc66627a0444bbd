//! Drives a connection against a scripted server on the other end of an
//! in-memory duplex pipe.

use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::time::timeout;
use vnc::{
    ConnectionInfo, ConnectionState, EventSender, EventStream, PixelFormat, VncConnection,
    VncConnector, VncError, VncEvent, VncKey,
};

const WIDTH: u16 = 800;
const HEIGHT: u16 = 600;

struct FakeServer {
    stream: DuplexStream,
}

impl FakeServer {
    async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    async fn expect(&mut self, expected: &[u8]) {
        let mut buf = vec![0_u8; expected.len()];
        timeout(Duration::from_secs(1), self.stream.read_exact(&mut buf))
            .await
            .expect("client wrote too little")
            .unwrap();
        assert_eq!(buf, expected);
    }

    async fn expect_len(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0_u8; len];
        timeout(Duration::from_secs(1), self.stream.read_exact(&mut buf))
            .await
            .expect("client wrote too little")
            .unwrap();
        buf
    }

    async fn expect_nothing(&mut self) {
        let mut buf = [0_u8; 1];
        let read = timeout(Duration::from_millis(100), self.stream.read(&mut buf)).await;
        assert!(read.is_err(), "unexpected byte {:?}", buf);
    }
}

fn server_init(format: PixelFormat, name: &str) -> Vec<u8> {
    let mut init = Vec::new();
    init.extend_from_slice(&WIDTH.to_be_bytes());
    init.extend_from_slice(&HEIGHT.to_be_bytes());
    init.extend_from_slice(&<[u8; 16]>::from(format));
    init.extend_from_slice(&(name.len() as u32).to_be_bytes());
    init.extend_from_slice(name.as_bytes());
    init
}

fn update_request(incremental: bool) -> Vec<u8> {
    let mut msg = vec![3, incremental as u8, 0, 0, 0, 0];
    msg.extend_from_slice(&WIDTH.to_be_bytes());
    msg.extend_from_slice(&HEIGHT.to_be_bytes());
    msg
}

fn rect_header(x: u16, y: u16, width: u16, height: u16, encoding: u32) -> Vec<u8> {
    let mut header = Vec::new();
    for field in [x, y, width, height] {
        header.extend_from_slice(&field.to_be_bytes());
    }
    header.extend_from_slice(&encoding.to_be_bytes());
    header
}

fn pair(connector: impl FnOnce(VncConnector) -> VncConnector) -> (VncConnection, FakeServer, EventStream) {
    pair_with_buffer(64 * 1024, connector)
}

fn pair_with_buffer(
    buffer: usize,
    connector: impl FnOnce(VncConnector) -> VncConnector,
) -> (VncConnection, FakeServer, EventStream) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
    let (client, server) = tokio::io::duplex(buffer);
    let (sender, events) = EventSender::new();
    let vnc = connector(VncConnector::new(client).set_event_handler(sender)).build();
    (vnc, FakeServer { stream: server }, events)
}

async fn next_event(events: &mut EventStream) -> VncEvent {
    timeout(Duration::from_secs(1), events.next())
        .await
        .expect("no event")
        .expect("event stream ended")
}

/// Walks the no-auth path up to a started connection and eats its state events
async fn started(format: PixelFormat) -> (VncConnection, FakeServer, EventStream) {
    started_with_buffer(64 * 1024, format).await
}

async fn started_with_buffer(
    buffer: usize,
    format: PixelFormat,
) -> (VncConnection, FakeServer, EventStream) {
    let (vnc, mut server, mut events) = pair_with_buffer(buffer, |c| c);
    server.send(b"RFB 003.008\n").await;
    server.send(&[1, 1]).await;
    assert!(!vnc.handshake().await.unwrap());
    server.expect(b"RFB 003.008\n").await;
    server.expect(&[1]).await;

    server.send(&server_init(format, "test desktop")).await;
    assert_eq!(vnc.initialize(true).await.unwrap(), "test desktop");
    server.expect(&[1]).await;
    vnc.start().await.unwrap();

    for state in [
        ConnectionState::Handshaking,
        ConnectionState::Initializing,
        ConnectionState::Connected,
    ] {
        assert_eq!(next_event(&mut events).await, VncEvent::StateChange(state));
    }
    (vnc, server, events)
}

#[tokio::test]
async fn connects_without_password() {
    let (vnc, _server, _events) = started(PixelFormat::default()).await;
    assert_eq!(vnc.state(), ConnectionState::Connected);
    assert_eq!(
        vnc.connection_info(),
        Some(ConnectionInfo {
            name: "test desktop".to_string(),
            width: WIDTH,
            height: HEIGHT,
        })
    );
    assert_eq!(vnc.pixel_format(), Some(PixelFormat::default()));
}

#[tokio::test]
async fn connects_with_password() -> anyhow::Result<()> {
    let (vnc, mut server, mut events) = pair(|c| c);
    server.send(b"RFB 003.008\n").await;
    // the server lists None first, the client still prefers VncAuth
    server.send(&[3, 1, 16, 2]).await;
    assert!(vnc.handshake().await?);
    server.expect(b"RFB 003.008\n").await;
    server.expect(&[2]).await;

    let nonce = *b"0123456789abcdef";
    server.send(&nonce).await;
    server.send(&[0, 0, 0, 0]).await;
    vnc.send_password("secret").await?;
    let response = server.expect_len(16).await;
    assert_ne!(response, nonce);

    server.send(&server_init(PixelFormat::default(), "locked")).await;
    assert_eq!(vnc.initialize(false).await?, "locked");
    server.expect(&[0]).await;

    for state in [
        ConnectionState::Handshaking,
        ConnectionState::SendingPassword,
        ConnectionState::Initializing,
        ConnectionState::Connected,
    ] {
        assert_eq!(next_event(&mut events).await, VncEvent::StateChange(state));
    }
    Ok(())
}

#[tokio::test]
async fn same_password_same_response() {
    let mut responses = Vec::new();
    for _ in 0..2 {
        let (vnc, mut server, _events) = pair(|c| c);
        server.send(b"RFB 003.008\n").await;
        server.send(&[1, 2]).await;
        assert!(vnc.handshake().await.unwrap());
        server.expect_len(13).await;
        server.send(b"fixed-challenge!").await;
        server.send(&[0, 0, 0, 0]).await;
        vnc.send_password("hunter2").await.unwrap();
        responses.push(server.expect_len(16).await);
    }
    assert_eq!(responses[0], responses[1]);
}

#[tokio::test]
async fn wrong_password_disconnects() {
    let (vnc, mut server, mut events) = pair(|c| c);
    server.send(b"RFB 003.008\n").await;
    server.send(&[1, 2]).await;
    assert!(vnc.handshake().await.unwrap());

    server.send(&[7; 16]).await;
    server.send(&[0, 0, 0, 1]).await;
    server.send(&[0, 0, 0, 14]).await;
    server.send(b"wrong password").await;
    let err = vnc.send_password("guess").await.unwrap_err();
    match err {
        VncError::Authentication(reason) => assert_eq!(reason, "wrong password"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(vnc.state(), ConnectionState::Disconnected);

    assert_eq!(
        next_event(&mut events).await,
        VncEvent::StateChange(ConnectionState::Handshaking)
    );
    assert_eq!(
        next_event(&mut events).await,
        VncEvent::StateChange(ConnectionState::SendingPassword)
    );
    assert_eq!(
        next_event(&mut events).await,
        VncEvent::StateChange(ConnectionState::Disconnected)
    );
    assert!(matches!(next_event(&mut events).await, VncEvent::Error(_)));

    assert!(matches!(
        vnc.initialize(true).await,
        Err(VncError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn accepts_newer_servers() {
    for version in [b"RFB 003.008\n", b"RFB 003.009\n", b"RFB 004.001\n"] {
        let (vnc, mut server, _events) = pair(|c| c);
        server.send(version).await;
        server.send(&[1, 1]).await;
        assert!(!vnc.handshake().await.unwrap());
        // always answers with 3.8
        server.expect(b"RFB 003.008\n").await;
    }
}

#[tokio::test]
async fn rejects_old_servers() {
    for version in [b"RFB 003.003\n", b"RFB 003.007\n", b"RFB 002.010\n", b"VNC 003.008\n"] {
        let (vnc, mut server, mut events) = pair(|c| c);
        server.send(version).await;
        let err = vnc.handshake().await.unwrap_err();
        assert!(err.is_protocol_error(), "{err}");
        assert_eq!(vnc.state(), ConnectionState::Disconnected);
        server.expect_nothing().await;

        assert_eq!(
            next_event(&mut events).await,
            VncEvent::StateChange(ConnectionState::Handshaking)
        );
        assert_eq!(
            next_event(&mut events).await,
            VncEvent::StateChange(ConnectionState::Disconnected)
        );
        assert!(matches!(next_event(&mut events).await, VncEvent::Error(_)));

        // a failed connection is never reused
        assert!(matches!(
            vnc.handshake().await,
            Err(VncError::InvalidOperation(_))
        ));
    }
}

#[tokio::test]
async fn security_negotiation_failures() {
    let (vnc, mut server, _events) = pair(|c| c);
    server.send(b"RFB 003.008\n").await;
    server.send(&[2, 16, 19]).await;
    let err = vnc.handshake().await.unwrap_err();
    assert!(err.is_protocol_error(), "{err}");
    server.expect(b"RFB 003.008\n").await;
    server.expect_nothing().await;

    let (vnc, mut server, _events) = pair(|c| c);
    server.send(b"RFB 003.008\n").await;
    server.send(&[0, 0, 0, 0, 11]).await;
    server.send(b"too many!!!").await;
    let err = vnc.handshake().await.unwrap_err();
    assert!(err.to_string().contains("too many!!!"), "{err}");
    assert_eq!(vnc.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn operations_out_of_order() {
    let (vnc, mut server, _events) = pair(|c| c);
    assert!(matches!(
        vnc.send_password("x").await,
        Err(VncError::InvalidOperation(_))
    ));
    assert!(matches!(
        vnc.initialize(true).await,
        Err(VncError::InvalidOperation(_))
    ));
    assert!(matches!(vnc.start().await, Err(VncError::InvalidOperation(_))));
    assert!(matches!(vnc.update(true).await, Err(VncError::NotConnected)));
    assert!(matches!(
        vnc.send_key(true, 0x61, false).await,
        Err(VncError::NotConnected)
    ));
    assert_eq!(vnc.connection_info(), None);
    server.expect_nothing().await;

    server.send(b"RFB 003.008\n").await;
    server.send(&[1, 1]).await;
    assert!(!vnc.handshake().await.unwrap());
    server.expect_len(13).await;

    // no password was asked for
    assert!(matches!(
        vnc.send_password("x").await,
        Err(VncError::InvalidOperation(_))
    ));
    assert!(matches!(vnc.start().await, Err(VncError::InvalidOperation(_))));
    assert!(matches!(
        vnc.handshake().await,
        Err(VncError::InvalidOperation(_))
    ));
    // none of that was fatal
    assert_eq!(vnc.state(), ConnectionState::Handshaking);
    server.expect_nothing().await;
}

#[tokio::test]
async fn empty_password_is_rejected_before_io() {
    let (vnc, mut server, _events) = pair(|c| c);
    server.send(b"RFB 003.008\n").await;
    server.send(&[1, 2]).await;
    assert!(vnc.handshake().await.unwrap());
    server.expect_len(13).await;

    assert!(matches!(
        vnc.send_password("").await,
        Err(VncError::InvalidArgument(_))
    ));
    assert_eq!(vnc.state(), ConnectionState::Handshaking);
    assert!(matches!(
        vnc.initialize(true).await,
        Err(VncError::InvalidOperation(_))
    ));

    server.send(&[9; 16]).await;
    server.send(&[0, 0, 0, 0]).await;
    vnc.send_password("now").await.unwrap();
}

#[tokio::test]
async fn start_only_once() {
    let (vnc, _server, _events) = started(PixelFormat::default()).await;
    assert!(matches!(vnc.start().await, Err(VncError::InvalidOperation(_))));
    assert_eq!(vnc.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn incremental_updates_are_throttled() {
    let (vnc, mut server, mut events) = started(PixelFormat::default()).await;

    vnc.update(false).await.unwrap();
    vnc.update(false).await.unwrap();
    server.expect(&update_request(true)).await;
    server.expect_nothing().await;

    // a refresh always goes out
    vnc.update(true).await.unwrap();
    server.expect(&update_request(false)).await;

    // answer both, the bell tells us the loop got past them
    server.send(&[0, 0, 0, 0]).await;
    server.send(&[0, 0, 0, 0]).await;
    server.send(&[2]).await;
    assert_eq!(next_event(&mut events).await, VncEvent::Bell);

    vnc.update(false).await.unwrap();
    server.expect(&update_request(true)).await;
    server.expect_nothing().await;
}

#[tokio::test]
async fn unsolicited_updates_do_not_unlock_extra_requests() {
    let (vnc, mut server, mut events) = started(PixelFormat::default()).await;

    server.send(&[0, 0, 0, 0]).await;
    server.send(&[0, 0, 0, 0]).await;
    server.send(&[2]).await;
    assert_eq!(next_event(&mut events).await, VncEvent::Bell);

    vnc.update(false).await.unwrap();
    vnc.update(false).await.unwrap();
    server.expect(&update_request(true)).await;
    server.expect_nothing().await;
}

#[tokio::test]
async fn raw_rectangles_reach_the_handler() {
    let (_vnc, mut server, mut events) = started(PixelFormat::default()).await;

    let mut update = vec![0, 0, 0, 2];
    update.extend(rect_header(10, 20, 2, 3, 0));
    update.extend([0xaa; 2 * 3 * 4]);
    update.extend(rect_header(0, 0, 4, 1, 0));
    update.extend([0x55; 4 * 4]);
    server.send(&update).await;

    assert_eq!(
        next_event(&mut events).await,
        VncEvent::Rectangle(vnc::Rectangle {
            left: 10,
            top: 20,
            width: 2,
            height: 3,
            pixels: vec![0xaa; 24],
        })
    );
    match next_event(&mut events).await {
        VncEvent::Rectangle(rect) => {
            assert_eq!((rect.left, rect.top, rect.width, rect.height), (0, 0, 4, 1));
            assert_eq!(rect.pixels.len(), 16);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn rectangle_size_follows_pixel_format() {
    let format = PixelFormat {
        bits_per_pixel: 16,
        depth: 16,
        red_max: 31,
        green_max: 63,
        blue_max: 31,
        red_shift: 11,
        green_shift: 5,
        blue_shift: 0,
        ..Default::default()
    };
    let (_vnc, mut server, mut events) = started(format).await;

    let mut update = vec![0, 0, 0, 1];
    update.extend(rect_header(1, 1, 5, 5, 0));
    update.extend([1; 5 * 5 * 2]);
    server.send(&update).await;

    match next_event(&mut events).await {
        VncEvent::Rectangle(rect) => assert_eq!(rect.pixels.len(), 50),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_encoding_disconnects() {
    let (vnc, mut server, mut events) = started(PixelFormat::default()).await;

    let mut update = vec![0, 0, 0, 2];
    update.extend(rect_header(0, 0, 1, 1, 16));
    update.extend([0; 4]);
    update.extend(rect_header(0, 0, 1, 1, 0));
    update.extend([0; 4]);
    server.send(&update).await;

    assert_eq!(
        next_event(&mut events).await,
        VncEvent::StateChange(ConnectionState::Disconnected)
    );
    match next_event(&mut events).await {
        VncEvent::Error(message) => assert!(message.contains("16"), "{message}"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(events.poll_event().is_none());

    assert_eq!(vnc.state(), ConnectionState::Disconnected);
    assert!(matches!(vnc.update(true).await, Err(VncError::NotConnected)));
    server.expect_nothing().await;
}

#[tokio::test]
async fn unsupported_server_messages_disconnect() {
    for message in [&[1_u8, 0, 0, 0, 0, 0][..], &[3, 0, 0, 0, 0, 0, 0, 0][..], &[9][..]] {
        let (vnc, mut server, mut events) = started(PixelFormat::default()).await;
        server.send(message).await;
        assert_eq!(
            next_event(&mut events).await,
            VncEvent::StateChange(ConnectionState::Disconnected)
        );
        assert!(matches!(next_event(&mut events).await, VncEvent::Error(_)));
        assert_eq!(vnc.state(), ConnectionState::Disconnected);
    }
}

#[tokio::test]
async fn server_closing_disconnects() {
    let (vnc, server, mut events) = started(PixelFormat::default()).await;
    drop(server);
    assert_eq!(
        next_event(&mut events).await,
        VncEvent::StateChange(ConnectionState::Disconnected)
    );
    assert!(matches!(next_event(&mut events).await, VncEvent::Error(_)));
    assert_eq!(vnc.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn pointer_events_are_coalesced() {
    let (vnc, mut server, _events) = started(PixelFormat::default()).await;

    vnc.set_pointer(1, 10, 20, false).await.unwrap();
    server.expect(&[5, 1, 0, 10, 0, 20]).await;
    // every accepted pointer event asks for an update
    server.expect(&update_request(true)).await;

    vnc.set_pointer(0, 11, 21, false).await.unwrap();
    server.expect_nothing().await;

    tokio::time::sleep(Duration::from_millis(60)).await;
    vnc.set_pointer(0, 0x0102, 0x0304, false).await.unwrap();
    server.expect(&[5, 0, 1, 2, 3, 4]).await;
    // the first update is still unanswered
    server.expect_nothing().await;
}

#[tokio::test]
async fn pointer_events_queued_on_the_lock_are_coalesced() {
    let (vnc, mut server, _events) = started_with_buffer(64, PixelFormat::default()).await;

    // 60 of 64 bytes in flight, the next request blocks while holding the lock
    for _ in 0..6 {
        vnc.update(true).await.unwrap();
    }
    let drain = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        server.expect_len(7 * 10 + 6).await
    };
    let (blocked, first, second, wire) = tokio::join!(
        vnc.update(true),
        vnc.set_pointer(1, 1, 1, false),
        vnc.set_pointer(0, 2, 2, false),
        drain
    );
    blocked.unwrap();
    first.unwrap();
    second.unwrap();

    assert_eq!(&wire[..10], &update_request(false)[..]);
    assert_eq!(&wire[70..], &[5, 1, 0, 1, 0, 1]);
    // the second event came within the interval, and updates are still pending
    server.expect_nothing().await;
}

#[tokio::test]
async fn high_priority_pointer_events_always_go_out() {
    let (vnc, mut server, _events) = started(PixelFormat::default()).await;

    vnc.set_pointer(1, 1, 1, true).await.unwrap();
    vnc.set_pointer(0, 1, 1, true).await.unwrap();
    server.expect(&[5, 1, 0, 1, 0, 1]).await;
    server.expect(&update_request(true)).await;
    server.expect(&[5, 0, 0, 1, 0, 1]).await;
    server.expect_nothing().await;
}

#[tokio::test]
async fn key_events() {
    let (vnc, mut server, _events) = started(PixelFormat::default()).await;

    vnc.send_key(true, VncKey::Return.into(), false).await.unwrap();
    server.expect(&[4, 1, 0, 0, 0, 0, 0xff, 0x0d]).await;
    server.expect_nothing().await;

    vnc.send_key(false, VncKey::Return.into(), true).await.unwrap();
    server.expect(&[4, 0, 0, 0, 0, 0, 0xff, 0x0d]).await;
    server.expect(&update_request(true)).await;

    vnc.send_key_press(0x61).await.unwrap();
    server.expect(&[4, 1, 0, 0, 0, 0, 0, 0x61]).await;
    server.expect(&[4, 0, 0, 0, 0, 0, 0, 0x61]).await;
    server.expect_nothing().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_never_interleave() {
    let (vnc, mut server, _events) = started(PixelFormat::default()).await;

    let mut tasks = Vec::new();
    for i in 0..10_u16 {
        let vnc_ptr = vnc.clone();
        tasks.push(tokio::spawn(async move {
            vnc_ptr.set_pointer(1, i, i, true).await.unwrap();
        }));
        let vnc_key = vnc.clone();
        tasks.push(tokio::spawn(async move {
            vnc_key.send_key(i % 2 == 0, 0x61 + i as u32, false).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // 10 pointer events, 10 key events and the single update the first pointer event asked for
    let wire = server.expect_len(10 * 6 + 10 * 8 + 10).await;
    server.expect_nothing().await;

    let (mut pointers, mut keys, mut updates) = (0, 0, 0);
    let mut rest = &wire[..];
    while !rest.is_empty() {
        let len = match rest[0] {
            3 => {
                assert_eq!(&rest[..10], &update_request(true)[..]);
                updates += 1;
                10
            }
            4 => {
                assert_eq!(&rest[2..4], &[0, 0]);
                keys += 1;
                8
            }
            5 => {
                assert_eq!(rest[1], 1);
                assert_eq!(rest[2..4], rest[4..6]);
                pointers += 1;
                6
            }
            other => panic!("garbled wire at message type {other}"),
        };
        rest = &rest[len..];
    }
    assert_eq!((pointers, keys, updates), (10, 10, 1));
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let (vnc, mut server, mut events) = started(PixelFormat::default()).await;

    vnc.shutdown().await;
    vnc.shutdown().await;
    assert_eq!(vnc.state(), ConnectionState::Disconnected);

    assert_eq!(
        next_event(&mut events).await,
        VncEvent::StateChange(ConnectionState::Disconnected)
    );
    // the stream ends once the connection and its loop are gone
    drop(vnc);
    assert_eq!(timeout(Duration::from_secs(1), events.next()).await.unwrap(), None);

    // the write half was closed
    let mut buf = [0_u8; 1];
    assert_eq!(server.stream.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn shutdown_before_handshake() {
    let (vnc, _server, mut events) = pair(|c| c);
    vnc.shutdown().await;
    assert_eq!(vnc.state(), ConnectionState::Disconnected);
    assert!(events.poll_event().is_none());
    assert!(matches!(
        vnc.handshake().await,
        Err(VncError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn reads_time_out() {
    let (vnc, _server, mut events) = pair(|c| c.set_io_timeout(Duration::from_millis(50)));
    assert!(matches!(
        vnc.handshake().await,
        Err(VncError::Timeout(_))
    ));
    assert_eq!(vnc.state(), ConnectionState::Disconnected);
    assert_eq!(
        next_event(&mut events).await,
        VncEvent::StateChange(ConnectionState::Handshaking)
    );
    assert_eq!(
        next_event(&mut events).await,
        VncEvent::StateChange(ConnectionState::Disconnected)
    );
    assert!(matches!(next_event(&mut events).await, VncEvent::Error(_)));
}

#[tokio::test]
async fn update_ticker_requests_updates() {
    let (vnc, mut server, _events) = pair(|c| c.set_update_interval(Duration::from_millis(20)));
    server.send(b"RFB 003.008\n").await;
    server.send(&[1, 1]).await;
    vnc.handshake().await.unwrap();
    server.send(&server_init(PixelFormat::default(), "tick")).await;
    vnc.initialize(true).await.unwrap();
    server.expect_len(14).await;
    vnc.start().await.unwrap();

    server.expect(&update_request(true)).await;
    // unanswered, so the next ticks stay quiet
    server.expect_nothing().await;

    server.send(&[0, 0, 0, 0]).await;
    server.expect(&update_request(true)).await;

    vnc.shutdown().await;
}

#[tokio::test]
async fn separate_read_and_write_halves() {
    let (client_read, mut server_write) = tokio::io::duplex(1024);
    let (mut server_read, client_write) = tokio::io::duplex(1024);
    let vnc = VncConnector::from_halves(client_read, client_write).build();

    server_write.write_all(b"RFB 003.008\n\x01\x01").await.unwrap();
    assert!(!vnc.handshake().await.unwrap());

    let mut reply = [0_u8; 13];
    server_read.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"RFB 003.008\n\x01");
}
