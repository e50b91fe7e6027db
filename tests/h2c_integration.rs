//! End-to-end tests of the h2c client against a scripted server
//!
//! These tests cover:
//! - The upgrade request and its HTTP2-Settings payload
//! - Refused upgrades and reconnecting afterwards
//! - GET and PING over the upgraded connection
//! - Live settings updates
//! - GOAWAY handling and close

mod common;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use common::{listen, read_upgrade_request, Peer};
use h2c_client::h2c::{Connection, Error, H2Engine, H2cClient, Phase, TuningSettings};
use h2c_client::http::h2::frames::FrameType;
use h2c_client::repl::{StatusBanner, Terminal};
use std::io::{Cursor, Write};
use std::sync::mpsc;
use std::thread;

fn args(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

fn client() -> H2cClient {
    H2cClient::new(Connection::new(H2Engine::new()))
}

#[test]
fn test_upgrade_request_carries_settings() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (mut peer, request) = Peer::accept(&listener);
        peer.expect_close();
        (request, peer.client_settings)
    });

    let mut client = client();
    let output = client.connect_cmd(&args(&[&addr])).unwrap();
    assert_eq!(output.message, "create a connection to server");
    assert_eq!(client.status(), format!("connected to {}", addr));
    client.close_cmd(&[]).unwrap();

    let (request, preface_settings) = handle.join().unwrap();
    assert_eq!(request.uri(), "/");
    assert_eq!(request.headers().get("Host"), Some(addr.as_str()));
    assert_eq!(request.headers().get("Upgrade"), Some("h2c"));
    assert!(request.headers().has_token("Connection", "Upgrade"));
    assert!(request.headers().has_token("Connection", "HTTP2-Settings"));

    let encoded = request.headers().get("HTTP2-Settings").unwrap();
    let payload = URL_SAFE_NO_PAD.decode(encoded).unwrap();
    assert_eq!(payload.len(), 24);
    assert_eq!(payload, TuningSettings::new().serialize());
    // Preface SETTINGS repeats the header payload
    assert_eq!(preface_settings, payload);
}

#[test]
fn test_refused_upgrade_then_reconnect() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        {
            let (mut stream, _) = listener.accept().unwrap();
            read_upgrade_request(&mut stream);
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nno")
                .unwrap();
        }

        let (mut peer, _) = Peer::accept(&listener);
        peer.expect_close();
    });

    let mut client = client();
    let result = client.connect_cmd(&args(&[&addr]));
    assert!(matches!(result, Err(Error::HandshakeFailed(_))));
    assert_eq!(client.connection().phase(), Phase::Idle);
    assert_eq!(client.status(), "");

    client.connect_cmd(&args(&[&addr])).unwrap();
    assert_eq!(client.connection().phase(), Phase::Established);
    client.close_cmd(&[]).unwrap();

    handle.join().unwrap();
}

#[test]
fn test_get_returns_body_verbatim() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (mut peer, _) = Peer::accept(&listener);

        // Answer to the upgrade request itself
        peer.respond(1, "200", b"upgraded");

        let (stream_id, fields) = peer.read_request();
        assert_eq!(stream_id, 3);
        assert!(fields.contains(&(":method".to_string(), "GET".to_string())));
        assert!(fields.contains(&(":path".to_string(), "/x".to_string())));
        assert!(fields.contains(&(":scheme".to_string(), "http".to_string())));
        peer.respond(stream_id, "200", b"hello from h2c");

        peer.expect_close();
    });

    let mut client = client();
    client.connect_cmd(&args(&[&addr])).unwrap();

    let output = client.send_cmd(&args(&["GET", "/x"])).unwrap();
    assert_eq!(output.message, "send request success");
    assert_eq!(
        output.info,
        vec!["status code: 200", "data: hello from h2c"]
    );

    client.close_cmd(&[]).unwrap();
    handle.join().unwrap();
}

#[test]
fn test_ping() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (mut peer, _) = Peer::accept(&listener);
        peer.answer_ping();
        peer.expect_close();
    });

    let mut client = client();
    assert!(matches!(
        client.send_cmd(&args(&["PING"])),
        Err(Error::NotConnected)
    ));

    client.connect_cmd(&args(&[&addr])).unwrap();
    client.send_cmd(&args(&["PING"])).unwrap();
    client.close_cmd(&[]).unwrap();

    handle.join().unwrap();
}

#[test]
fn test_live_settings_update() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (mut peer, _) = Peer::accept(&listener);
        let frame = peer.next_frame();
        assert_eq!(frame.frame_type(), Some(FrameType::Settings));
        assert!(!frame.flags.is_ack());
        peer.expect_close();
        frame.payload
    });

    let mut client = client();
    client.connect_cmd(&args(&[&addr])).unwrap();

    let output = client
        .settings_cmd(&args(&["maxStream=10", "windowSize=0"]))
        .unwrap();
    assert_eq!(output.info, vec!["setting maxStream was updated to 10"]);
    assert_eq!(
        output.message,
        "Enable Push: false | Max Concurrent Streams: 10 | Init Window Size: 65535 | Max Frame Size: 16384"
    );
    client.close_cmd(&[]).unwrap();

    let payload = handle.join().unwrap();
    assert_eq!(payload, client.settings().serialize());
}

#[test]
fn test_goaway_closes_connection() {
    let (listener, addr) = listen();
    let (sent_tx, sent_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let (mut peer, _) = Peer::accept(&listener);
        peer.send_goaway(1);
        sent_tx.send(()).unwrap();
        peer.expect_close();
    });

    let mut client = client();
    client.connect_cmd(&args(&[&addr])).unwrap();
    sent_rx.recv().unwrap();

    assert!(matches!(
        client.send_cmd(&args(&["GET", "/"])),
        Err(Error::ConnectionClosed)
    ));
    assert_eq!(client.status(), "");
    assert_eq!(client.connection().phase(), Phase::Closed);
    assert!(matches!(client.close_cmd(&[]), Err(Error::NotConnected)));

    handle.join().unwrap();
}

#[test]
fn test_terminal_session() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (mut peer, _) = Peer::accept(&listener);
        let (stream_id, _) = peer.read_request();
        peer.respond(stream_id, "404", b"missing");
        peer.expect_close();
    });

    let script = format!("connect {}\nsend GET /nope\nclose\nclose\n", addr);
    let mut terminal = Terminal::new(client(), "h2c", Cursor::new(script.into_bytes()), Vec::new());
    H2cClient::register(&mut terminal);
    terminal.run().unwrap();
    handle.join().unwrap();

    let (_, output) = terminal.into_parts();
    let output = String::from_utf8(output).unwrap();
    let connected = format!("h2c connected to {}> ", addr);
    assert_eq!(
        output,
        format!(
            "h2c> create a connection to server\n\
             {connected}status code: 404\ndata: missing\nsend request success\n\
             {connected}connection closed\n\
             h2c> error: no connection\n\
             h2c> \n"
        )
    );
}
