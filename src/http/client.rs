//! HTTP/1.1 client side of the upgrade exchange
//!
//! Sends one request, reads one response, and then gives the transport back
//! together with whatever the peer already sent past the end of the response.

use super::{
    Error, HttpRequest, HttpResponse, HttpSession, PrefixedSession, ResponseParser, Result,
    SessionOps,
};
use std::time::Duration;

const READ_CHUNK: usize = 4096;

/// HTTP/1.1 client
pub struct HttpClient<S: SessionOps> {
    session: HttpSession<S>,
    parser: ResponseParser,
}

impl<S: SessionOps> HttpClient<S> {
    /// Create a new HTTP client with a session
    pub fn new(session: S) -> Self {
        HttpClient {
            session: HttpSession::new(session),
            parser: ResponseParser::new(),
        }
    }

    /// Set the timeout for operations
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.session.set_timeout(timeout);
    }

    /// Send an HTTP request
    pub fn send_request(&mut self, request: &HttpRequest) -> Result<()> {
        log::trace!("sending {} {}", request.method(), request.uri());
        self.session.write_all(&request.to_wire())
    }

    /// Receive one HTTP response
    ///
    /// Bytes the peer sent after the response stay buffered; see
    /// [`HttpClient::into_upgraded`].
    pub fn receive_response(&mut self) -> Result<HttpResponse> {
        let mut temp = [0u8; READ_CHUNK];

        loop {
            let n = self.session.read(&mut temp)?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }

            if let Some(response) = self.parser.parse(&temp[..n])? {
                log::trace!("received {}", response.status());
                return Ok(response);
            }
        }
    }

    /// Receive a response head without waiting for its body
    ///
    /// Any body bytes already read stay buffered.
    pub fn receive_response_head(&mut self) -> Result<HttpResponse> {
        let mut temp = [0u8; READ_CHUNK];
        let mut data: &[u8] = &[];

        loop {
            if let Some(response) = self.parser.parse_head(data)? {
                log::trace!("received head {}", response.status());
                return Ok(response);
            }

            let n = self.session.read(&mut temp)?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            data = &temp[..n];
        }
    }

    /// Hand the transport over to another protocol
    ///
    /// The returned session replays any bytes read past the last response
    /// before reading from the socket again.
    pub fn into_upgraded(mut self) -> PrefixedSession<S> {
        let remaining = self.parser.take_remaining();
        if !remaining.is_empty() {
            log::debug!("{} bytes read ahead of the protocol switch", remaining.len());
        }
        PrefixedSession::new(remaining, self.session.into_inner())
    }

    /// Close the connection
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    /// Get a reference to the underlying session
    pub fn session(&self) -> &HttpSession<S> {
        &self.session
    }
}
