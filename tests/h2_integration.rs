//! HTTP/2 engine integration tests
//!
//! These tests drive `H2Client` directly against a scripted server and
//! verify:
//! - Flow control on large response bodies
//! - Request bodies
//! - Refused server push
//! - Stream 1 handling after an upgrade
//! - Connection errors

mod common;

use bytes::Bytes;
use common::{listen, Peer};
use h2c_client::h2c::TuningSettings;
use h2c_client::http::h2::codec::FrameCodec;
use h2c_client::http::h2::error::{Error, ErrorCode};
use h2c_client::http::h2::frames::*;
use h2c_client::http::h2::{H2Client, H2Request};
use h2c_client::http::session::FdSessionOps;
use h2c_client::http::{HttpSession, Method};
use std::net::TcpStream;
use std::thread;

fn connect(addr: &str) -> H2Client<FdSessionOps> {
    let stream = TcpStream::connect(addr).unwrap();
    let session = HttpSession::new(FdSessionOps::new(stream));
    H2Client::handshake(session, &TuningSettings::new().serialize()).unwrap()
}

#[test]
fn test_large_body_respects_flow_control() {
    const BODY_LEN: usize = 200_000;

    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut peer = Peer::handshake(stream);
        let (stream_id, _) = peer.read_request();

        let block = peer.encode(&[(":status", "200")]);
        peer.write(&FrameCodec::encode_headers_frame(&HeadersFrame::new(
            stream_id,
            Bytes::from(block),
            false,
            true,
        )));

        let body: Vec<u8> = (0..BODY_LEN).map(|i| (i % 251) as u8).collect();
        let mut conn_window: i64 = 65535;
        let mut stream_window: i64 = 65535;
        let mut offset = 0;

        while offset < body.len() {
            let n = (body.len() - offset)
                .min(16384)
                .min(conn_window.min(stream_window).max(0) as usize);
            if n == 0 {
                let frame = peer.read_frame();
                let update = WindowUpdateFrame::decode(&frame).unwrap();
                if update.stream_id == 0 {
                    conn_window += update.size_increment as i64;
                } else {
                    assert_eq!(update.stream_id, stream_id);
                    stream_window += update.size_increment as i64;
                }
                continue;
            }

            let end = offset + n == body.len();
            let data = DataFrame::new(
                stream_id,
                Bytes::copy_from_slice(&body[offset..offset + n]),
                end,
            );
            peer.write(&FrameCodec::encode_data_frame(&data));
            conn_window -= n as i64;
            stream_window -= n as i64;
            offset += n;
        }

        peer.expect_close();
        body
    });

    let mut client = connect(&addr);
    let response = client.round_trip(&H2Request::get(&addr, "/big")).unwrap();
    client.close().unwrap();

    let body = handle.join().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.body().len(), BODY_LEN);
    assert_eq!(response.body(), &body[..]);
}

#[test]
fn test_request_body() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut peer = Peer::handshake(stream);

        let (stream_id, fields) = peer.read_request();
        assert!(fields.contains(&(":method".to_string(), "POST".to_string())));
        assert!(fields.contains(&("content-length".to_string(), "5".to_string())));

        let data = peer.next_frame();
        let (data, _) = DataFrame::decode(&data).unwrap();
        assert_eq!(&data.data[..], b"hello");
        assert!(data.end_stream);

        peer.respond(stream_id, "201", b"");
        peer.expect_close();
    });

    let mut client = connect(&addr);
    let request = H2Request::new(Method::Post, &addr, "/upload").body(Bytes::from_static(b"hello"));
    let response = client.round_trip(&request).unwrap();
    client.close().unwrap();
    handle.join().unwrap();

    assert_eq!(response.status(), 201);
    assert!(response.body().is_empty());
}

#[test]
fn test_push_promise_is_refused() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut peer = Peer::handshake(stream);
        let (stream_id, _) = peer.read_request();

        let block = peer.encode(&[(":method", "GET"), (":path", "/pushed")]);
        let mut payload = 2u32.to_be_bytes().to_vec();
        payload.extend_from_slice(&block);
        let mut wire = FrameCodec::encode_header(
            FrameType::PushPromise,
            FrameFlags::from_u8(FrameFlags::END_HEADERS),
            stream_id,
            payload.len(),
        )
        .to_vec();
        wire.extend_from_slice(&payload);
        peer.write(&wire);

        peer.respond(stream_id, "200", b"main");

        let rst = peer.next_frame();
        let rst = RstStreamFrame::decode(&rst).unwrap();
        assert_eq!(rst.stream_id, 2);
        assert_eq!(rst.error_code, ErrorCode::Cancel);

        peer.expect_close();
    });

    let mut client = connect(&addr);
    let response = client.round_trip(&H2Request::get(&addr, "/")).unwrap();
    assert_eq!(response.body(), b"main");
    client.close().unwrap();
    handle.join().unwrap();
}

#[test]
fn test_requests_use_odd_streams_after_upgrade() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut peer = Peer::handshake(stream);

        for expected in [3, 5, 7] {
            let (stream_id, _) = peer.read_request();
            assert_eq!(stream_id, expected);
            peer.respond(stream_id, "200", format!("stream {}", stream_id).as_bytes());
        }
        peer.expect_close();
    });

    let mut client = connect(&addr);
    for expected in [3, 5, 7] {
        let response = client.round_trip(&H2Request::get(&addr, "/")).unwrap();
        assert_eq!(response.stream_id, expected);
        assert_eq!(response.body(), format!("stream {}", expected).as_bytes());
        assert!(client.can_accept_new_request());
    }
    client.close().unwrap();
    handle.join().unwrap();
}

#[test]
fn test_oversized_frame_is_a_connection_error() {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut peer = Peer::handshake(stream);
        let (stream_id, _) = peer.read_request();

        // Above the 16384 byte limit the client advertised
        let data = DataFrame::new(stream_id, Bytes::from(vec![0u8; 20_000]), true);
        peer.write(&FrameCodec::encode_data_frame(&data));

        let frame = peer.next_frame();
        let goaway = GoawayFrame::decode(&frame).unwrap();
        assert_eq!(goaway.error_code, ErrorCode::FrameSizeError);
    });

    let mut client = connect(&addr);
    let result = client.round_trip(&H2Request::get(&addr, "/"));
    assert!(matches!(result, Err(Error::FrameSize(_))));
    assert!(!client.can_accept_new_request());
    handle.join().unwrap();
}
