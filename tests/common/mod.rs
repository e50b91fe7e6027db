//! Scripted h2c server used by the integration tests
//!
//! Each test binds a listener on 127.0.0.1:0 and drives a [`Peer`] from a
//! background thread, one frame at a time.

#![allow(dead_code)]

use bytes::Bytes;
use h2c_client::http::h2::codec::FrameCodec;
use h2c_client::http::h2::frames::*;
use h2c_client::http::h2::{ErrorCode, Settings, CONNECTION_PREFACE};
use h2c_client::http::{HttpRequest, RequestParser};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

pub const SWITCHING_PROTOCOLS: &[u8] =
    b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: h2c\r\n\r\n";

/// Bind a listener and return it with its `host:port`
pub fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

/// Read one HTTP/1.1 request head
pub fn read_upgrade_request(stream: &mut TcpStream) -> HttpRequest {
    let mut parser = RequestParser::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).unwrap();
        assert!(n > 0, "client hung up before the upgrade request");
        if let Some(request) = parser.parse(&buf[..n]).unwrap() {
            return request;
        }
    }
}

/// Server side of an upgraded connection
pub struct Peer {
    pub stream: TcpStream,
    /// Payload of the client's preface SETTINGS frame
    pub client_settings: Bytes,
    encoder: hpack::Encoder<'static>,
    decoder: hpack::Decoder<'static>,
}

impl Peer {
    /// Accept a connection, answer the upgrade with 101 and exchange SETTINGS
    pub fn accept(listener: &TcpListener) -> (Peer, HttpRequest) {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_upgrade_request(&mut stream);
        stream.write_all(SWITCHING_PROTOCOLS).unwrap();
        (Peer::handshake(stream), request)
    }

    /// Read the client preface, send SETTINGS and wait for the ack
    pub fn handshake(mut stream: TcpStream) -> Peer {
        let mut preface = [0u8; 24];
        stream.read_exact(&mut preface).unwrap();
        assert_eq!(&preface, CONNECTION_PREFACE);

        let settings = FrameCodec::read_frame(&mut stream).unwrap();
        assert_eq!(settings.frame_type(), Some(FrameType::Settings));
        assert!(!settings.flags.is_ack());

        let server = Settings {
            max_concurrent_streams: Some(100),
            ..Settings::default()
        };
        let mut wire = FrameCodec::encode_settings_frame(&SettingsFrame::new(server)).to_vec();
        wire.extend_from_slice(&FrameCodec::encode_settings_frame(&SettingsFrame::ack()));
        stream.write_all(&wire).unwrap();

        let mut peer = Peer {
            stream,
            client_settings: settings.payload,
            encoder: hpack::Encoder::new(),
            decoder: hpack::Decoder::new(),
        };

        let ack = peer.read_frame();
        assert_eq!(ack.frame_type(), Some(FrameType::Settings));
        assert!(ack.flags.is_ack());

        peer
    }

    pub fn read_frame(&mut self) -> Frame {
        FrameCodec::read_frame(&mut self.stream).unwrap()
    }

    /// Next frame that is not a SETTINGS ack or WINDOW_UPDATE
    pub fn next_frame(&mut self) -> Frame {
        loop {
            let frame = self.read_frame();
            match frame.frame_type() {
                Some(FrameType::Settings) if frame.flags.is_ack() => continue,
                Some(FrameType::WindowUpdate) => continue,
                _ => return frame,
            }
        }
    }

    /// Read a request's HEADERS frame and decode it
    pub fn read_request(&mut self) -> (u32, Vec<(String, String)>) {
        let frame = self.next_frame();
        assert_eq!(frame.frame_type(), Some(FrameType::Headers));
        assert!(frame.flags.is_end_headers());

        let fields = self
            .decoder
            .decode(&frame.payload)
            .unwrap()
            .into_iter()
            .map(|(n, v)| {
                (
                    String::from_utf8(n).unwrap(),
                    String::from_utf8(v).unwrap(),
                )
            })
            .collect();
        (frame.stream_id, fields)
    }

    /// Send a complete response on `stream_id`
    pub fn respond(&mut self, stream_id: u32, status: &str, body: &[u8]) {
        let block = self.encoder.encode(vec![
            (&b":status"[..], status.as_bytes()),
            (&b"content-type"[..], &b"text/plain"[..]),
        ]);
        let headers = HeadersFrame::new(stream_id, Bytes::from(block), body.is_empty(), true);
        let mut wire = FrameCodec::encode_headers_frame(&headers).to_vec();
        if !body.is_empty() {
            let data = DataFrame::new(stream_id, Bytes::copy_from_slice(body), true);
            wire.extend_from_slice(&FrameCodec::encode_data_frame(&data));
        }
        self.stream.write_all(&wire).unwrap();
    }

    /// Send raw bytes
    pub fn write(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    /// Encode a header block with the peer's HPACK state
    pub fn encode(&mut self, fields: &[(&str, &str)]) -> Vec<u8> {
        self.encoder
            .encode(fields.iter().map(|(n, v)| (n.as_bytes(), v.as_bytes())))
    }

    pub fn send_goaway(&mut self, last_stream_id: u32) {
        let goaway = GoawayFrame::new(last_stream_id, ErrorCode::NoError, Bytes::new());
        self.stream
            .write_all(&FrameCodec::encode_goaway_frame(&goaway))
            .unwrap();
    }

    /// Answer one PING
    pub fn answer_ping(&mut self) {
        let frame = self.next_frame();
        let ping = PingFrame::decode(&frame).unwrap();
        assert!(!ping.ack);
        self.stream
            .write_all(&FrameCodec::encode_ping_frame(&PingFrame::ack(ping.data)))
            .unwrap();
    }

    /// Read until the client sends GOAWAY or hangs up
    pub fn expect_close(&mut self) {
        loop {
            match FrameCodec::read_frame(&mut self.stream) {
                Ok(frame) if frame.frame_type() == Some(FrameType::Goaway) => {
                    let goaway = GoawayFrame::decode(&frame).unwrap();
                    assert_eq!(goaway.error_code, ErrorCode::NoError);
                    return;
                }
                Ok(_) => continue,
                Err(_) => return,
            }
        }
    }
}
