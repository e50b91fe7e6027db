//! Multiplexed connection engine seam
//!
//! The lifecycle only needs five operations from an HTTP/2 connection plus a
//! way to start one over an upgraded byte stream. Both traits are object
//! safe so tests can substitute scripted connections.

use super::settings::TuningSettings;
use crate::http::h2::{self, H2Client, H2Request, H2Response};
use crate::http::session::FdSessionOps;
use crate::http::{HttpSession, PrefixedSession, SessionOps};
use std::time::Duration;

/// Byte stream handed over after a successful upgrade
pub type UpgradedStream = PrefixedSession<FdSessionOps>;

/// A live HTTP/2 connection
pub trait MultiplexedConnection {
    /// Send one request and read the full response
    fn round_trip(&mut self, request: &H2Request) -> h2::Result<H2Response>;

    /// Liveness probe
    fn ping(&mut self) -> h2::Result<()>;

    /// Whether a new request may be issued right now
    fn can_accept_new_request(&mut self) -> bool;

    /// Write a SETTINGS frame carrying `payload` unchanged
    fn write_settings(&mut self, payload: &[u8]) -> h2::Result<()>;

    /// Shut the connection down
    fn close(&mut self) -> h2::Result<()>;
}

/// Starts HTTP/2 connections on upgraded streams
pub trait Engine {
    fn dial(
        &self,
        stream: UpgradedStream,
        settings: &TuningSettings,
    ) -> h2::Result<Box<dyn MultiplexedConnection>>;
}

/// Engine backed by the bundled [`H2Client`]
#[derive(Debug, Clone, Default)]
pub struct H2Engine {
    io_timeout: Option<Duration>,
}

impl H2Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a poll timeout to every frame read and write
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout
    }
}

impl Engine for H2Engine {
    fn dial(
        &self,
        stream: UpgradedStream,
        settings: &TuningSettings,
    ) -> h2::Result<Box<dyn MultiplexedConnection>> {
        let mut session = HttpSession::new(stream);
        session.set_timeout(self.io_timeout);

        let client = H2Client::handshake(session, &settings.serialize())?;
        Ok(Box::new(client))
    }
}

impl<S: SessionOps> MultiplexedConnection for H2Client<S> {
    fn round_trip(&mut self, request: &H2Request) -> h2::Result<H2Response> {
        H2Client::round_trip(self, request)
    }

    fn ping(&mut self) -> h2::Result<()> {
        H2Client::ping(self)
    }

    fn can_accept_new_request(&mut self) -> bool {
        H2Client::can_accept_new_request(self)
    }

    fn write_settings(&mut self, payload: &[u8]) -> h2::Result<()> {
        H2Client::write_settings(self, payload)
    }

    fn close(&mut self) -> h2::Result<()> {
        H2Client::close(self)
    }
}
