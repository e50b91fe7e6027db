//! HTTP/1.1 plumbing for the h2c upgrade
//!
//! This module provides the pieces needed to run the cleartext upgrade
//! exchange over a raw byte stream and then hand that stream to the
//! HTTP/2 engine in [`h2`].
//!
//! # Architecture
//!
//! All I/O goes through a session operations abstraction:
//!
//! - `SessionOps` trait defines operations (poll, read, write, close)
//! - `FdSessionOps` implements them for a plain TCP stream
//! - `PrefixedSession` replays bytes that were read ahead of time before
//!   falling through to the wrapped session
//! - `HttpSession` adds the optional poll timeout
//!
//! # Examples
//!
//! ```no_run
//! use h2c_client::http::{HttpClient, HttpRequest, Method};
//! use h2c_client::http::session::FdSessionOps;
//! use std::net::TcpStream;
//!
//! let stream = TcpStream::connect("127.0.0.1:8080").unwrap();
//! let mut client = HttpClient::new(FdSessionOps::new(stream));
//!
//! let request = HttpRequest::builder()
//!     .method(Method::Get)
//!     .uri("/")
//!     .header("Host", "127.0.0.1:8080")
//!     .header("Upgrade", "h2c")
//!     .build();
//! client.send_request(&request).unwrap();
//!
//! let response = client.receive_response().unwrap();
//! println!("{}", response.status());
//! ```

pub mod client;
pub mod h2;
pub mod headers;
pub mod message;
pub mod parser;
pub mod session;

pub use client::HttpClient;
pub use headers::Headers;
pub use message::{HttpRequest, HttpResponse, Method, Status, Version};
pub use parser::{RequestParser, ResponseParser};
pub use session::{FdSessionOps, HttpSession, PrefixedSession, SessionOps};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] crate::net::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid HTTP status: {0}")]
    InvalidStatus(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Message head too large ({0} bytes)")]
    HeadTooLarge(usize),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Maximum number of headers per message
pub const MAX_HEADERS: usize = 64;

/// Maximum size of a request or response head
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// CRLF line ending
pub const CRLF: &str = "\r\n";
