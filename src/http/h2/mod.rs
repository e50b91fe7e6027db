//! HTTP/2 protocol implementation
//!
//! A blocking, single-connection HTTP/2 client for cleartext (h2c)
//! connections that were upgraded from HTTP/1.1.
//!
//! ## Features
//!
//! - **Frame handling**: All HTTP/2 frame types (DATA, HEADERS, PRIORITY,
//!   RST_STREAM, SETTINGS, PUSH_PROMISE, PING, GOAWAY, WINDOW_UPDATE, CONTINUATION)
//! - **HPACK**: Header compression through the `hpack` crate
//! - **Flow control**: Connection and stream-level window management
//! - **Settings exchange**: Preface SETTINGS and live updates from a raw payload
//!
//! Server push is refused: promised streams are reset with CANCEL.
//!
//! # Example
//!
//! ```no_run
//! use h2c_client::http::h2::{H2Client, H2Request};
//! use h2c_client::http::{FdSessionOps, HttpSession};
//! use std::net::TcpStream;
//!
//! # fn example(payload: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! // The 101 Switching Protocols exchange already happened on this socket
//! let stream = TcpStream::connect("127.0.0.1:8080")?;
//! let session = HttpSession::new(FdSessionOps::new(stream));
//!
//! let mut client = H2Client::handshake(session, payload)?;
//! let response = client.round_trip(&H2Request::get("127.0.0.1:8080", "/"))?;
//! println!("Status: {}", response.status());
//! client.close()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod flow_control;
pub mod frames;
pub mod settings;
pub mod stream;

pub use client::{H2Client, H2Request, H2Response};
pub use codec::FrameCodec;
pub use error::{Error, ErrorCode, Result};
pub use frames::{Frame, FrameFlags, FrameType};
pub use settings::Settings;
pub use stream::StreamId;

/// HTTP/2 connection preface that must be sent by clients
///
/// From RFC 7540 Section 3.5:
/// "PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n"
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Default initial window size (65535 bytes)
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;

/// Default maximum frame size (16384 bytes)
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16384;

/// Default header table size (4096 bytes)
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;

/// Maximum stream ID value (2^31 - 1)
pub const MAX_STREAM_ID: u32 = 0x7FFFFFFF;

/// Stream ID 0 (connection-level)
pub const CONNECTION_STREAM_ID: u32 = 0;
