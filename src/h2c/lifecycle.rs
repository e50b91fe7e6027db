//! Connection lifecycle
//!
//! Owns the single HTTP/2 connection and walks it through
//! Idle → Connecting → Established → Closed.

use super::engine::{Engine, MultiplexedConnection};
use super::settings::TuningSettings;
use super::{upgrade, Error, Result};
use crate::http::session::FdSessionOps;
use crate::net;
use std::fmt;
use std::net::TcpStream;
use std::time::Duration;

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing open
    Idle,
    /// Socket open, upgrade in flight
    Connecting,
    /// Upgrade done, connection usable
    Established,
    /// Closed by the operator or found unusable
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::Established => "established",
            Phase::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Server the connection was made to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    authority: String,
}

impl Target {
    /// URL scheme; only cleartext is supported
    pub const SCHEME: &'static str = "http";

    fn new(authority: String) -> Self {
        Target { authority }
    }

    /// `host:port`
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// `http://host:port`
    pub fn base_url(&self) -> String {
        format!("{}://{}", Self::SCHEME, self.authority)
    }
}

/// Connection state owned by the client
pub struct Connection<E: Engine> {
    engine: E,
    phase: Phase,
    target: Option<Target>,
    conn: Option<Box<dyn MultiplexedConnection>>,
    status: String,
    io_timeout: Option<Duration>,
}

impl<E: Engine> Connection<E> {
    pub fn new(engine: E) -> Self {
        Connection {
            engine,
            phase: Phase::Idle,
            target: None,
            conn: None,
            status: String::new(),
            io_timeout: None,
        }
    }

    /// Poll timeout for the upgrade exchange
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Status banner text, empty unless established
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Target of the last successful connect
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Whether an HTTP/2 connection is held
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Dial `target` and run the h2c upgrade
    ///
    /// A previous connection that still accepts requests is closed first.
    /// On failure the lifecycle is back at [`Phase::Idle`].
    pub fn connect(&mut self, target: &str, settings: &TuningSettings) -> Result<()> {
        let addr = net::normalize_target(target).map_err(|source| Error::DialFailed {
            addr: target.to_string(),
            source,
        })?;

        if let Some(mut previous) = self.conn.take() {
            if previous.can_accept_new_request() {
                log::info!("closing previous connection before dialing {}", addr);
                if let Err(e) = previous.close() {
                    log::debug!("closing previous connection failed: {}", e);
                }
            }
            self.status.clear();
            self.set_phase(Phase::Closed);
        }

        let stream = match net::dial(&addr) {
            Ok(stream) => stream,
            Err(source) => {
                self.set_phase(Phase::Idle);
                return Err(Error::DialFailed { addr, source });
            }
        };
        self.set_phase(Phase::Connecting);

        match self.handshake(stream, &addr, settings) {
            Ok(conn) => {
                self.conn = Some(conn);
                self.status = format!("connected to {}", addr);
                self.target = Some(Target::new(addr));
                self.set_phase(Phase::Established);
                Ok(())
            }
            Err(e) => {
                log::warn!("h2c upgrade with {} failed: {}", addr, e);
                self.set_phase(Phase::Idle);
                Err(e)
            }
        }
    }

    fn handshake(
        &self,
        stream: TcpStream,
        addr: &str,
        settings: &TuningSettings,
    ) -> Result<Box<dyn MultiplexedConnection>> {
        let upgraded =
            upgrade::perform(FdSessionOps::new(stream), addr, settings, self.io_timeout)?;

        self.engine.dial(upgraded, settings).map_err(|e| {
            Error::HandshakeFailed(format!("init HTTP/2 connection failed: {}", e))
        })
    }

    /// Close the held connection
    pub fn close(&mut self) -> Result<()> {
        let mut conn = self.conn.take().ok_or(Error::NotConnected)?;
        if let Err(e) = conn.close() {
            log::debug!("close reported: {}", e);
        }
        self.status.clear();
        self.set_phase(Phase::Closed);
        Ok(())
    }

    /// The held connection, if it still accepts requests
    ///
    /// A connection that no longer does is dropped and the status cleared.
    pub fn ensure_usable(&mut self) -> Result<&mut dyn MultiplexedConnection> {
        let usable = match self.conn.as_mut() {
            Some(conn) => conn.can_accept_new_request(),
            None => return Err(Error::NotConnected),
        };

        if !usable {
            log::info!("connection can no longer accept requests");
            if let Some(mut conn) = self.conn.take() {
                let _ = conn.close();
            }
            self.status.clear();
            self.set_phase(Phase::Closed);
            return Err(Error::ConnectionClosed);
        }

        match self.conn {
            Some(ref mut conn) => Ok(conn.as_mut()),
            None => Err(Error::NotConnected),
        }
    }

    /// The held connection if it is usable, with no side effects otherwise
    pub fn live(&mut self) -> Option<&mut dyn MultiplexedConnection> {
        let usable = self
            .conn
            .as_mut()
            .is_some_and(|conn| conn.can_accept_new_request());
        if !usable {
            return None;
        }

        match self.conn {
            Some(ref mut conn) => Some(conn.as_mut()),
            None => None,
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            log::debug!("connection {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::h2c::engine::UpgradedStream;
    use crate::http::h2::{self, H2Request, H2Response};
    use bytes::Bytes;
    use std::cell::RefCell;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::rc::Rc;
    use std::thread;

    /// What a scripted connection saw
    #[derive(Debug, Default)]
    pub(crate) struct Log {
        pub requests: Vec<String>,
        pub pings: usize,
        pub settings: Vec<Vec<u8>>,
        pub closes: usize,
    }

    /// Scripted connection: usable until `usable` is cleared
    pub(crate) struct FakeConnection {
        pub log: Rc<RefCell<Log>>,
        pub usable: Rc<RefCell<bool>>,
        _stream: UpgradedStream,
    }

    impl MultiplexedConnection for FakeConnection {
        fn round_trip(&mut self, request: &H2Request) -> h2::Result<H2Response> {
            self.log.borrow_mut().requests.push(request.path().to_string());
            if request.path() == "/fail" {
                return Err(h2::Error::ConnectionClosed);
            }
            Ok(H2Response {
                stream_id: 3,
                status: 200,
                headers: Default::default(),
                body: Bytes::from(format!("body of {}", request.path())),
            })
        }

        fn ping(&mut self) -> h2::Result<()> {
            self.log.borrow_mut().pings += 1;
            Ok(())
        }

        fn can_accept_new_request(&mut self) -> bool {
            *self.usable.borrow()
        }

        fn write_settings(&mut self, payload: &[u8]) -> h2::Result<()> {
            self.log.borrow_mut().settings.push(payload.to_vec());
            Ok(())
        }

        fn close(&mut self) -> h2::Result<()> {
            self.log.borrow_mut().closes += 1;
            *self.usable.borrow_mut() = false;
            Ok(())
        }
    }

    /// Engine handing out [`FakeConnection`]s that share one log
    #[derive(Default)]
    pub(crate) struct FakeEngine {
        pub log: Rc<RefCell<Log>>,
        pub usable: Rc<RefCell<bool>>,
    }

    impl Engine for FakeEngine {
        fn dial(
            &self,
            stream: UpgradedStream,
            _settings: &TuningSettings,
        ) -> h2::Result<Box<dyn MultiplexedConnection>> {
            *self.usable.borrow_mut() = true;
            Ok(Box::new(FakeConnection {
                log: self.log.clone(),
                usable: self.usable.clone(),
                _stream: stream,
            }))
        }
    }

    /// Peer answering every upgrade request with `reply`
    pub(crate) fn upgrade_peer(
        reply: &'static [u8],
        accepts: usize,
    ) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = thread::spawn(move || {
            for _ in 0..accepts {
                let (mut stream, _) = listener.accept().unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                stream.write_all(reply).unwrap();
            }
        });

        (addr, handle)
    }

    pub(crate) const SWITCHING: &[u8] =
        b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: h2c\r\n\r\n";

    #[test]
    fn test_connect_and_close() {
        let (addr, handle) = upgrade_peer(SWITCHING, 1);
        let mut connection = Connection::new(FakeEngine::default());
        assert_eq!(connection.phase(), Phase::Idle);

        connection.connect(&addr, &TuningSettings::new()).unwrap();
        handle.join().unwrap();

        assert_eq!(connection.phase(), Phase::Established);
        assert_eq!(connection.status(), format!("connected to {}", addr));
        assert_eq!(connection.target().unwrap().base_url(), format!("http://{}", addr));
        assert!(connection.ensure_usable().is_ok());

        connection.close().unwrap();
        assert_eq!(connection.phase(), Phase::Closed);
        assert_eq!(connection.status(), "");
        assert!(matches!(connection.close(), Err(Error::NotConnected)));
    }

    #[test]
    fn test_refused_upgrade_returns_to_idle() {
        let (addr, handle) = upgrade_peer(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n", 1);
        let mut connection = Connection::new(FakeEngine::default());

        let result = connection.connect(&addr, &TuningSettings::new());
        handle.join().unwrap();

        assert!(matches!(result, Err(Error::HandshakeFailed(_))));
        assert_eq!(connection.phase(), Phase::Idle);
        assert!(!connection.is_connected());
        assert_eq!(connection.status(), "");
    }

    #[test]
    fn test_dial_failure() {
        // Grab a free port and release it again
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let mut connection = Connection::new(FakeEngine::default());

        let result = connection.connect(&addr, &TuningSettings::new());
        assert!(matches!(result, Err(Error::DialFailed { .. })));
        assert_eq!(connection.phase(), Phase::Idle);
    }

    #[test]
    fn test_reconnect_closes_previous() {
        let (addr, handle) = upgrade_peer(SWITCHING, 2);
        let engine = FakeEngine::default();
        let log = engine.log.clone();
        let mut connection = Connection::new(engine);

        connection.connect(&addr, &TuningSettings::new()).unwrap();
        connection.connect(&addr, &TuningSettings::new()).unwrap();
        handle.join().unwrap();

        assert_eq!(log.borrow().closes, 1);
        assert_eq!(connection.phase(), Phase::Established);
    }

    #[test]
    fn test_unusable_connection_is_dropped() {
        let (addr, handle) = upgrade_peer(SWITCHING, 1);
        let engine = FakeEngine::default();
        let usable = engine.usable.clone();
        let mut connection = Connection::new(engine);

        connection.connect(&addr, &TuningSettings::new()).unwrap();
        handle.join().unwrap();

        *usable.borrow_mut() = false;
        assert!(connection.live().is_none());
        assert!(connection.is_connected());

        assert!(matches!(
            connection.ensure_usable(),
            Err(Error::ConnectionClosed)
        ));
        assert_eq!(connection.status(), "");
        assert_eq!(connection.phase(), Phase::Closed);
        assert!(matches!(connection.close(), Err(Error::NotConnected)));
    }
}
