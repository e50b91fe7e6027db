//! Blocking HTTP/2 client connection
//!
//! Drives one HTTP/2 connection from the caller's thread: every frame is
//! read and written synchronously while a request, a ping or a drain of
//! pending frames is in progress. The connection is assumed to come out of
//! an h2c upgrade, so stream 1 already belongs to the upgrade request.

use super::codec::FrameCodec;
use super::error::{Error, ErrorCode, Result};
use super::flow_control::FlowControl;
use super::frames::*;
use super::settings::Settings;
use super::stream::{H2Stream, StreamId, StreamManager, UPGRADE_STREAM_ID};
use super::{CONNECTION_PREFACE, CONNECTION_STREAM_ID, DEFAULT_MAX_FRAME_SIZE};
use crate::http::session::PollEvents;
use crate::http::{Headers, HttpSession, Method, SessionOps};
use bytes::Bytes;
use hpack::{Decoder as HpackDecoder, Encoder as HpackEncoder};
use std::time::Duration;

/// Headers that must not appear in an HTTP/2 request (RFC 7540 Section 8.1.2.2)
const CONNECTION_SPECIFIC_HEADERS: &[&str] = &[
    "connection",
    "host",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "http2-settings",
];

/// HTTP/2 request
#[derive(Debug, Clone)]
pub struct H2Request {
    method: Method,
    scheme: String,
    authority: String,
    path: String,
    headers: Headers,
    body: Bytes,
}

impl H2Request {
    /// Create a request for `path` on `authority` over cleartext
    pub fn new(method: Method, authority: impl Into<String>, path: impl Into<String>) -> Self {
        H2Request {
            method,
            scheme: "http".to_string(),
            authority: authority.into(),
            path: path.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Create a GET request
    pub fn get(authority: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Method::Get, authority, path)
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Get the method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the `:authority`
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Get the `:path`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the request body
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Header list as sent: pseudo-headers first, regular names lowercased
    pub fn header_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            (":method".to_string(), self.method.to_string()),
            (":scheme".to_string(), self.scheme.clone()),
            (":authority".to_string(), self.authority.clone()),
            (":path".to_string(), self.path.clone()),
        ];

        for (name, value) in self.headers.iter() {
            let name = name.to_ascii_lowercase();
            if CONNECTION_SPECIFIC_HEADERS.contains(&name.as_str()) {
                log::debug!("dropping connection-specific header {}", name);
                continue;
            }
            fields.push((name, value.to_string()));
        }

        if !self.body.is_empty() && !self.headers.contains("content-length") {
            fields.push(("content-length".to_string(), self.body.len().to_string()));
        }

        fields
    }
}

/// HTTP/2 response
#[derive(Debug, Clone)]
pub struct H2Response {
    /// Stream ID
    pub stream_id: StreamId,
    /// Status code
    pub status: u16,
    /// Regular header fields
    pub headers: Headers,
    /// Body
    pub body: Bytes,
}

impl H2Response {
    fn from_stream(stream: &mut H2Stream) -> Result<Self> {
        let status = stream
            .status()
            .ok_or_else(|| Error::Protocol(format!("no :status on stream {}", stream.id())))?;
        let status = status
            .parse::<u16>()
            .map_err(|_| Error::InvalidHeader(format!(":status {}", status)))?;

        let headers = stream
            .take_headers()
            .into_iter()
            .filter(|(name, _)| !name.starts_with(':'))
            .collect();

        Ok(H2Response {
            stream_id: stream.id(),
            status,
            headers,
            body: Bytes::from(stream.take_body()),
        })
    }

    /// Get status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Get body as bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Header block spread over HEADERS/PUSH_PROMISE and CONTINUATION frames
enum PendingBlock {
    /// Belongs to a stream we track
    Stream(StreamId),
    /// Decoded only to keep HPACK state in sync
    Discard {
        stream_id: StreamId,
        block: Vec<u8>,
        promised: Option<StreamId>,
    },
}

/// What a processed frame means to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Nothing,
    StreamEnded(StreamId),
    StreamReset(StreamId, ErrorCode),
    PingAck([u8; 8]),
    GoAway(u32),
}

/// HTTP/2 client connection
pub struct H2Client<S: SessionOps> {
    session: HttpSession<S>,
    streams: StreamManager,
    /// Connection-level windows
    flow_control: FlowControl,
    hpack_encoder: HpackEncoder<'static>,
    hpack_decoder: HpackDecoder<'static>,
    local_settings: Settings,
    remote_settings: Settings,
    pending_block: Option<PendingBlock>,
    /// Last stream ID from the peer's GOAWAY
    goaway: Option<u32>,
    /// Transport failed or a connection error was raised
    broken: bool,
    closed: bool,
    ping_counter: u64,
}

impl<S: SessionOps> H2Client<S> {
    /// Start HTTP/2 on a session that just completed the h2c upgrade
    ///
    /// Sends the client preface followed by a SETTINGS frame carrying
    /// `settings_payload` as is, then requires the server's first frame to
    /// be its SETTINGS, which is applied and acknowledged.
    pub fn handshake(session: HttpSession<S>, settings_payload: &[u8]) -> Result<Self> {
        let local_settings = Settings::decode(settings_payload)?;
        let streams = StreamManager::upgraded(local_settings.get_initial_window_size());

        let mut client = H2Client {
            session,
            streams,
            flow_control: FlowControl::default(),
            hpack_encoder: HpackEncoder::new(),
            hpack_decoder: HpackDecoder::new(),
            local_settings,
            remote_settings: Settings::new(),
            pending_block: None,
            goaway: None,
            broken: false,
            closed: false,
            ping_counter: 0,
        };

        let mut preface = CONNECTION_PREFACE.to_vec();
        preface.extend_from_slice(&FrameCodec::encode_settings_payload(settings_payload));
        client.write(&preface)?;
        log::debug!(
            "sent connection preface with {} settings",
            client.local_settings.len()
        );

        let frame = client.read_frame()?;
        if frame.frame_type() != Some(FrameType::Settings) || frame.flags.is_ack() {
            log::warn!(
                "server opened with frame type 0x{:x} instead of SETTINGS",
                frame.kind
            );
            return Err(client.fail(Error::MissingPreface));
        }
        let result = client.handle_frame(frame);
        client.guard(result)?;

        Ok(client)
    }

    /// Send one request and read its complete response
    pub fn round_trip(&mut self, request: &H2Request) -> Result<H2Response> {
        self.ensure_open()?;

        let stream_id = self.streams.create_stream()?;
        let block = self.encode_header_block(request)?;
        let end_stream = request.body_bytes().is_empty();

        if let Some(stream) = self.streams.get_stream_mut(stream_id) {
            stream.send_headers(end_stream)?;
        }
        self.send_header_block(stream_id, &block, end_stream)?;
        log::debug!(
            "{} {} sent on stream {}",
            request.method(),
            request.path(),
            stream_id
        );

        if !end_stream {
            self.send_body(stream_id, request.body_bytes().clone())?;
        }

        self.await_response(stream_id)
    }

    /// Send a PING and wait for its acknowledgement
    pub fn ping(&mut self) -> Result<()> {
        self.ensure_open()?;

        self.ping_counter = self.ping_counter.wrapping_add(1);
        let data = self.ping_counter.to_be_bytes();
        self.write(&FrameCodec::encode_ping_frame(&PingFrame::new(data)))?;

        loop {
            match self.process_next(None)? {
                Event::PingAck(ack) if ack == data => return Ok(()),
                Event::PingAck(ack) => log::trace!("ignoring PING ack {:?}", ack),
                Event::GoAway(_) => return Err(Error::ConnectionClosed),
                _ => {}
            }
        }
    }

    /// Check whether a new request may be issued
    ///
    /// Frames that already arrived (GOAWAY, SETTINGS, PING) are processed
    /// first without blocking.
    pub fn can_accept_new_request(&mut self) -> bool {
        if self.ensure_open().is_err() {
            return false;
        }
        if let Err(e) = self.drain_pending() {
            log::debug!("connection no longer usable: {}", e);
            return false;
        }
        self.ensure_open().is_ok() && self.streams.can_create_stream().is_ok()
    }

    /// Send a SETTINGS frame with an already serialized payload
    pub fn write_settings(&mut self, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;

        let settings = Settings::decode(payload)?;
        self.write(&FrameCodec::encode_settings_payload(payload))?;

        if let Some(size) = settings.initial_window_size {
            self.streams.set_initial_recv_window(size);
        }
        self.local_settings.merge(&settings);
        log::debug!("sent SETTINGS update with {} parameters", settings.len());

        Ok(())
    }

    /// Send GOAWAY(NO_ERROR) and shut the transport down
    ///
    /// Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if !self.broken {
            let goaway = GoawayFrame::new(0, ErrorCode::NoError, Bytes::new());
            if let Err(e) = self
                .session
                .write_all(&FrameCodec::encode_goaway_frame(&goaway))
            {
                log::debug!("GOAWAY not delivered: {}", e);
            }
        }

        self.session.close().map_err(Error::from)
    }

    /// Check whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get local settings
    pub fn local_settings(&self) -> &Settings {
        &self.local_settings
    }

    /// Get remote settings
    pub fn remote_settings(&self) -> &Settings {
        &self.remote_settings
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed || self.broken || self.goaway.is_some() {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }

    /// Record a failure; connection errors are reported with GOAWAY
    fn fail(&mut self, err: Error) -> Error {
        match &err {
            Error::Cancel(..)
            | Error::StreamClosed(_)
            | Error::TooManyStreams
            | Error::StreamIdsExhausted
            | Error::ConnectionClosed => {}
            Error::Io(_) | Error::Http(_) => self.broken = true,
            _ => {
                if !self.broken {
                    log::warn!("connection error: {}", err);
                    let goaway = GoawayFrame::new(0, err.code(), Bytes::new());
                    let _ = self
                        .session
                        .write_all(&FrameCodec::encode_goaway_frame(&goaway));
                }
                self.broken = true;
            }
        }
        err
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let result = self.session.write_all(bytes).map_err(Error::from);
        self.guard(result)
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let max = self
            .local_settings
            .get_max_frame_size()
            .max(DEFAULT_MAX_FRAME_SIZE) as usize;
        let result = FrameCodec::read_frame_from_session(&mut self.session, max);
        self.guard(result)
    }

    /// Read and handle one frame
    ///
    /// Streams other than `awaited` that end or get reset are dropped here.
    fn process_next(&mut self, awaited: Option<StreamId>) -> Result<Event> {
        let frame = self.read_frame()?;
        let result = self.handle_frame(frame);
        match self.guard(result)? {
            Event::StreamEnded(id) if Some(id) != awaited => {
                self.discard_stream(id);
                Ok(Event::Nothing)
            }
            Event::StreamReset(id, _) if Some(id) != awaited => {
                self.streams.remove_stream(id);
                Ok(Event::Nothing)
            }
            event => Ok(event),
        }
    }

    fn drain_pending(&mut self) -> Result<()> {
        loop {
            let ready = self
                .session
                .get_ref()
                .poll(PollEvents::Read, Some(Duration::ZERO))
                .map_err(Error::from);
            if !self.guard(ready)? {
                return Ok(());
            }
            self.process_next(None)?;
        }
    }

    fn discard_stream(&mut self, stream_id: StreamId) {
        if let Some(stream) = self.streams.remove_stream(stream_id) {
            if stream_id == UPGRADE_STREAM_ID {
                log::debug!(
                    "upgrade request answered on stream 1 with status {}",
                    stream.status().unwrap_or("-")
                );
            } else {
                log::debug!("dropping finished stream {}", stream_id);
            }
        }
    }

    fn await_response(&mut self, stream_id: StreamId) -> Result<H2Response> {
        loop {
            match self.streams.get_stream(stream_id) {
                Some(stream) if stream.is_remote_closed() => break,
                Some(_) => {}
                None => return Err(Error::StreamClosed(stream_id)),
            }

            match self.process_next(Some(stream_id))? {
                Event::StreamReset(id, code) if id == stream_id => {
                    self.streams.remove_stream(stream_id);
                    return Err(Error::Cancel(stream_id, code));
                }
                Event::GoAway(last) if stream_id > last => {
                    self.streams.remove_stream(stream_id);
                    return Err(Error::ConnectionClosed);
                }
                _ => {}
            }
        }

        let mut stream = self
            .streams
            .remove_stream(stream_id)
            .ok_or(Error::StreamClosed(stream_id))?;
        let response = H2Response::from_stream(&mut stream)?;
        log::debug!(
            "stream {} answered with status {} ({} bytes)",
            stream_id,
            response.status,
            response.body.len()
        );
        Ok(response)
    }

    fn encode_header_block(&mut self, request: &H2Request) -> Result<Vec<u8>> {
        let fields = request.header_fields();
        let mut block = Vec::new();
        self.hpack_encoder
            .encode_into(
                fields.iter().map(|(n, v)| (n.as_bytes(), v.as_bytes())),
                &mut block,
            )
            .map_err(|e| Error::Internal(format!("HPACK encode error: {}", e)))?;
        Ok(block)
    }

    /// Write a header block as HEADERS plus CONTINUATION frames
    fn send_header_block(
        &mut self,
        stream_id: StreamId,
        block: &[u8],
        end_stream: bool,
    ) -> Result<()> {
        let max = self.remote_settings.get_max_frame_size() as usize;
        let mut fragments = block.chunks(max);
        let first = fragments.next().unwrap_or(&[]);
        let rest: Vec<&[u8]> = fragments.collect();

        let headers = HeadersFrame::new(
            stream_id,
            Bytes::copy_from_slice(first),
            end_stream,
            rest.is_empty(),
        );
        let mut wire = FrameCodec::encode_headers_frame(&headers).to_vec();
        for (i, fragment) in rest.iter().enumerate() {
            wire.extend_from_slice(&FrameCodec::encode_continuation_frame(
                stream_id,
                fragment,
                i + 1 == rest.len(),
            ));
        }

        self.write(&wire)
    }

    /// Send a request body within the peer's flow control windows
    fn send_body(&mut self, stream_id: StreamId, mut body: Bytes) -> Result<()> {
        while !body.is_empty() {
            let max = self.remote_settings.get_max_frame_size() as usize;
            let stream_window = match self.streams.get_stream(stream_id) {
                Some(stream) => stream.flow_control().send_window().available(max),
                None => return Err(Error::StreamClosed(stream_id)),
            };
            let n = self.flow_control.send_window().available(stream_window);

            if n == 0 {
                log::trace!("stream {} waiting for WINDOW_UPDATE", stream_id);
                match self.process_next(Some(stream_id))? {
                    Event::StreamReset(id, code) if id == stream_id => {
                        self.streams.remove_stream(stream_id);
                        return Err(Error::Cancel(stream_id, code));
                    }
                    Event::GoAway(last) if stream_id > last => return Err(Error::ConnectionClosed),
                    // Answered before the body was complete
                    Event::StreamEnded(id) if id == stream_id => return Ok(()),
                    _ => {}
                }
                continue;
            }

            let chunk = body.split_to(n);
            let end_stream = body.is_empty();
            self.flow_control.consume_send_window(n);
            if let Some(stream) = self.streams.get_stream_mut(stream_id) {
                stream.send_data(n, end_stream)?;
            }
            self.write(&FrameCodec::encode_data_frame(&DataFrame::new(
                stream_id, chunk, end_stream,
            )))?;
        }
        Ok(())
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<Event> {
        if let Some(pending) = self.pending_block.take() {
            return self.on_continuation(pending, &frame);
        }

        let Some(frame_type) = frame.frame_type() else {
            log::trace!("ignoring frame of unknown type 0x{:x}", frame.kind);
            return Ok(Event::Nothing);
        };
        log::trace!(
            "recv {} stream={} flags=0x{:x} len={}",
            frame_type,
            frame.stream_id,
            frame.flags.as_u8(),
            frame.payload_len()
        );

        match frame_type {
            FrameType::Data => self.on_data(&frame),
            FrameType::Headers => self.on_headers(&frame),
            FrameType::Priority => Ok(Event::Nothing),
            FrameType::RstStream => {
                let rst = RstStreamFrame::decode(&frame)?;
                log::debug!("stream {} reset by peer: {}", rst.stream_id, rst.error_code);
                if let Some(stream) = self.streams.get_stream_mut(rst.stream_id) {
                    stream.close();
                }
                Ok(Event::StreamReset(rst.stream_id, rst.error_code))
            }
            FrameType::Settings => self.on_settings(&frame),
            FrameType::PushPromise => {
                let promise = PushPromiseFrame::decode(&frame)?;
                let block = promise.header_block.to_vec();
                let promised = Some(promise.promised_stream_id);
                if promise.end_headers {
                    self.discard_header_block(&block, promised)
                } else {
                    self.pending_block = Some(PendingBlock::Discard {
                        stream_id: promise.stream_id,
                        block,
                        promised,
                    });
                    Ok(Event::Nothing)
                }
            }
            FrameType::Ping => {
                let ping = PingFrame::decode(&frame)?;
                if ping.ack {
                    return Ok(Event::PingAck(ping.data));
                }
                self.write(&FrameCodec::encode_ping_frame(&PingFrame::ack(ping.data)))?;
                Ok(Event::Nothing)
            }
            FrameType::Goaway => {
                let goaway = GoawayFrame::decode(&frame)?;
                log::info!(
                    "peer sent GOAWAY: last stream {}, {} {}",
                    goaway.last_stream_id,
                    goaway.error_code,
                    String::from_utf8_lossy(&goaway.debug_data)
                );
                self.goaway = Some(goaway.last_stream_id);
                Ok(Event::GoAway(goaway.last_stream_id))
            }
            FrameType::WindowUpdate => {
                let update = WindowUpdateFrame::decode(&frame)?;
                if update.stream_id == CONNECTION_STREAM_ID {
                    self.flow_control.increase_send_window(update.size_increment)?;
                } else if let Some(stream) = self.streams.get_stream_mut(update.stream_id) {
                    stream
                        .flow_control_mut()
                        .increase_send_window(update.size_increment)?;
                }
                Ok(Event::Nothing)
            }
            FrameType::Continuation => Err(Error::Protocol(
                "CONTINUATION without an open header block".to_string(),
            )),
        }
    }

    fn on_continuation(&mut self, pending: PendingBlock, frame: &Frame) -> Result<Event> {
        let expected = match &pending {
            PendingBlock::Stream(id) => *id,
            PendingBlock::Discard { stream_id, .. } => *stream_id,
        };
        if frame.frame_type() != Some(FrameType::Continuation) || frame.stream_id != expected {
            return Err(Error::Protocol(format!(
                "expected CONTINUATION on stream {}",
                expected
            )));
        }
        let end_headers = frame.flags.is_end_headers();

        match pending {
            PendingBlock::Stream(id) => {
                let stream = self
                    .streams
                    .get_stream_mut(id)
                    .ok_or_else(|| Error::Internal(format!("stream {} vanished", id)))?;
                match stream.receive_continuation(&frame.payload, end_headers) {
                    Some(block) => self.on_header_block(id, &block),
                    None => {
                        self.pending_block = Some(PendingBlock::Stream(id));
                        Ok(Event::Nothing)
                    }
                }
            }
            PendingBlock::Discard {
                stream_id,
                mut block,
                promised,
            } => {
                block.extend_from_slice(&frame.payload);
                if end_headers {
                    self.discard_header_block(&block, promised)
                } else {
                    self.pending_block = Some(PendingBlock::Discard {
                        stream_id,
                        block,
                        promised,
                    });
                    Ok(Event::Nothing)
                }
            }
        }
    }

    fn on_headers(&mut self, frame: &Frame) -> Result<Event> {
        let headers = HeadersFrame::decode(frame)?;
        let id = headers.stream_id;

        let stream = match self.streams.get_stream_mut(id) {
            Some(stream) if stream.state().can_receive() => stream,
            _ => {
                log::debug!("HEADERS on inactive stream {}", id);
                let block = headers.header_block.to_vec();
                if headers.end_headers {
                    return self.discard_header_block(&block, None);
                }
                self.pending_block = Some(PendingBlock::Discard {
                    stream_id: id,
                    block,
                    promised: None,
                });
                return Ok(Event::Nothing);
            }
        };

        match stream.receive_headers(&headers)? {
            Some(block) => self.on_header_block(id, &block),
            None => {
                self.pending_block = Some(PendingBlock::Stream(id));
                Ok(Event::Nothing)
            }
        }
    }

    fn on_header_block(&mut self, stream_id: StreamId, block: &[u8]) -> Result<Event> {
        let fields = self.decode_header_block(block)?;

        let Some(stream) = self.streams.get_stream_mut(stream_id) else {
            return Ok(Event::Nothing);
        };
        if stream.header_blocks() == 1 {
            stream.set_headers(fields);
        } else {
            log::trace!("ignoring {} trailer fields on stream {}", fields.len(), stream_id);
        }

        if stream.is_remote_closed() {
            Ok(Event::StreamEnded(stream_id))
        } else {
            Ok(Event::Nothing)
        }
    }

    fn decode_header_block(&mut self, block: &[u8]) -> Result<Vec<(String, String)>> {
        let fields = self
            .hpack_decoder
            .decode(block)
            .map_err(|e| Error::Compression(format!("HPACK decode error: {:?}", e)))?;

        Ok(fields
            .into_iter()
            .map(|(name, value)| {
                (
                    String::from_utf8_lossy(&name).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                )
            })
            .collect())
    }

    fn discard_header_block(&mut self, block: &[u8], promised: Option<StreamId>) -> Result<Event> {
        self.decode_header_block(block)?;

        if let Some(promised) = promised {
            log::debug!("refusing pushed stream {}", promised);
            let rst = RstStreamFrame {
                stream_id: promised,
                error_code: ErrorCode::Cancel,
            };
            self.write(&FrameCodec::encode_rst_stream_frame(&rst))?;
        }

        Ok(Event::Nothing)
    }

    fn on_data(&mut self, frame: &Frame) -> Result<Event> {
        let (data, flow_len) = DataFrame::decode(frame)?;
        let id = data.stream_id;

        self.flow_control.consume_recv_window(flow_len)?;
        if let Some(increment) = self.flow_control.should_send_window_update() {
            self.flow_control.send_window_update(increment)?;
            self.write(&FrameCodec::encode_window_update_frame(
                &WindowUpdateFrame::new(CONNECTION_STREAM_ID, increment),
            ))?;
        }

        let Some(stream) = self.streams.get_stream_mut(id) else {
            log::debug!("DATA on unknown stream {}", id);
            return Ok(Event::Nothing);
        };
        stream.flow_control_mut().consume_recv_window(flow_len)?;
        stream.receive_data(&data)?;

        if stream.is_remote_closed() {
            return Ok(Event::StreamEnded(id));
        }

        if let Some(increment) = stream.flow_control().should_send_window_update() {
            stream.flow_control_mut().send_window_update(increment)?;
            self.write(&FrameCodec::encode_window_update_frame(
                &WindowUpdateFrame::new(id, increment),
            ))?;
        }

        Ok(Event::Nothing)
    }

    fn on_settings(&mut self, frame: &Frame) -> Result<Event> {
        let settings = SettingsFrame::decode(frame)?;
        if settings.ack {
            log::trace!("SETTINGS acknowledged by peer");
            return Ok(Event::Nothing);
        }

        let update = settings.settings;
        update.validate()?;

        if let Some(size) = update.initial_window_size {
            self.streams.set_initial_send_window(size)?;
        }
        if update.max_concurrent_streams.is_some() {
            self.streams
                .set_max_concurrent_streams(update.max_concurrent_streams);
        }
        self.remote_settings.merge(&update);
        log::debug!("applied peer settings {:?}", update);

        self.write(&FrameCodec::encode_settings_frame(&SettingsFrame::ack()))?;
        Ok(Event::Nothing)
    }
}
