//! TCP dialing and target normalization
//!
//! Resolves `host:port` targets and opens plain TCP streams for the
//! upgrade handshake.

use crate::http::DEFAULT_HTTP_PORT;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

/// Result type for network operations
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("no addresses found for {0}")]
    NoAddress(String),

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

/// Append the default HTTP port when `target` carries none.
///
/// Bracketed IPv6 literals (`[::1]`, `[::1]:8080`) are understood; a bare
/// IPv6 literal is bracketed before the port is added.
pub fn normalize_target(target: &str) -> Result<String> {
    let target = target.trim();
    if target.is_empty() {
        return Err(Error::InvalidTarget("empty host".to_string()));
    }

    if let Some(rest) = target.strip_prefix('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| Error::InvalidTarget(target.to_string()))?;
        let after = &rest[close + 1..];
        return match after {
            "" => Ok(format!("{}:{}", target, DEFAULT_HTTP_PORT)),
            _ if after.starts_with(':') && is_port(&after[1..]) => Ok(target.to_string()),
            _ => Err(Error::InvalidTarget(target.to_string())),
        };
    }

    match target.matches(':').count() {
        0 => Ok(format!("{}:{}", target, DEFAULT_HTTP_PORT)),
        1 => {
            let (host, port) = target.split_once(':').unwrap_or((target, ""));
            if host.is_empty() || !is_port(port) {
                return Err(Error::InvalidTarget(target.to_string()));
            }
            Ok(target.to_string())
        }
        // Bare IPv6 literal
        _ => Ok(format!("[{}]:{}", target, DEFAULT_HTTP_PORT)),
    }
}

fn is_port(s: &str) -> bool {
    !s.is_empty() && s.parse::<u16>().is_ok()
}

/// Dial `addr` (already normalized to `host:port`).
///
/// Every resolved address is tried in order; the last connect error is
/// reported if none succeeds.
pub fn dial(addr: &str) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|source| Error::Resolve {
            addr: addr.to_string(),
            source,
        })?
        .collect();

    let mut last_err = None;
    for sock_addr in addrs {
        log::debug!("dialing {} ({})", addr, sock_addr);
        match connect_one(sock_addr) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                log::debug!("connect to {} failed: {}", sock_addr, e);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(source) => Err(Error::Connect {
            addr: addr.to_string(),
            source,
        }),
        None => Err(Error::NoAddress(addr.to_string())),
    }
}

fn connect_one(addr: SocketAddr) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nodelay(true)?;
    socket.connect(&SockAddr::from(addr))?;
    Ok(socket.into())
}
