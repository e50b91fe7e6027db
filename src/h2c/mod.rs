//! h2c upgrade client core
//!
//! Ties together the tuning settings, the HTTP/1.1 upgrade handshake, the
//! connection lifecycle and the operator commands. The HTTP/2 connection
//! itself is reached only through the [`Engine`] and
//! [`MultiplexedConnection`] traits.

pub mod commands;
pub mod engine;
pub mod lifecycle;
pub mod settings;
pub mod upgrade;

pub use commands::H2cClient;
pub use engine::{Engine, H2Engine, MultiplexedConnection, UpgradedStream};
pub use lifecycle::{Connection, Phase, Target};
pub use settings::{Setting, SettingName, TuningSettings};

use crate::http::h2;

/// Result type for client commands
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported to the operator
///
/// Every command failure ends up here; none of them ends the session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dial to server [{addr}] failed: {source}")]
    DialFailed {
        addr: String,
        #[source]
        source: crate::net::Error,
    },

    #[error("the server does not support h2c: {0}")]
    HandshakeFailed(String),

    #[error("no connection")]
    NotConnected,

    #[error("connection has been closed")]
    ConnectionClosed,

    #[error("PING failed: {0}")]
    PingFailed(#[source] h2::Error),

    #[error("send GET request failed: {0}")]
    RequestFailed(#[source] h2::Error),

    #[error("GET method must have a PATH")]
    MissingPath,

    #[error("invalid method {0}")]
    InvalidMethod(String),

    #[error("the cmd {0} is in invalid format (setting=value)")]
    InvalidSettingFormat(String),

    #[error("invalid value {0}")]
    InvalidSettingValue(String),

    #[error("invalid setting option {0}")]
    UnknownSetting(String),

    #[error("missing host")]
    MissingHost,

    #[error("too many arguments, expected {expected}")]
    TooManyArguments { expected: usize },

    #[error("no methods")]
    MissingMethod,
}
