//! HTTP/2 stream management
//!
//! This module implements the client side of the stream state machine
//! from RFC 7540 Section 5.1.

use super::error::{Error, Result};
use super::flow_control::FlowControl;
use super::frames::{DataFrame, HeadersFrame};
use super::{DEFAULT_INITIAL_WINDOW_SIZE, MAX_STREAM_ID};
use std::collections::HashMap;

/// Stream ID type
pub type StreamId = u32;

/// Stream created by the h2c upgrade request
pub const UPGRADE_STREAM_ID: StreamId = 1;

/// Stream state as defined in RFC 7540 Section 5.1
///
/// Push is never accepted, so the reserved states do not occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Idle: No frames have been sent/received
    Idle,
    /// Open: Both sides can send frames
    Open,
    /// Half-closed (local): We can't send, they can
    HalfClosedLocal,
    /// Half-closed (remote): They can't send, we can
    HalfClosedRemote,
    /// Closed: Stream is closed
    Closed,
}

impl StreamState {
    /// Check if stream can send data
    pub fn can_send(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedRemote)
    }

    /// Check if stream can receive data
    pub fn can_receive(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal)
    }

    /// Check if stream is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamState::Closed)
    }

    fn close_remote(self) -> Self {
        match self {
            StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        }
    }

    fn close_local(self) -> Self {
        match self {
            StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote => StreamState::Closed,
            other => other,
        }
    }
}

/// HTTP/2 stream
#[derive(Debug)]
pub struct H2Stream {
    id: StreamId,
    state: StreamState,
    flow_control: FlowControl,
    /// Header block fragments awaiting END_HEADERS
    header_block: Vec<u8>,
    /// END_STREAM seen on a HEADERS frame whose block is still open
    pending_end_stream: bool,
    /// Number of complete header blocks received (1 = response, 2 = trailers)
    header_blocks: usize,
    /// Decoded fields of the first header block
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl H2Stream {
    /// Create a new stream with specified window sizes
    pub fn with_window_sizes(id: StreamId, send_size: u32, recv_size: u32) -> Self {
        H2Stream {
            id,
            state: StreamState::Idle,
            flow_control: FlowControl::with_initial_sizes(send_size, recv_size),
            header_block: Vec::new(),
            pending_end_stream: false,
            header_blocks: 0,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Get stream ID
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Get stream state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Get flow control
    pub fn flow_control(&self) -> &FlowControl {
        &self.flow_control
    }

    /// Get mutable flow control
    pub fn flow_control_mut(&mut self) -> &mut FlowControl {
        &mut self.flow_control
    }

    /// Check if the peer finished the stream
    pub fn is_remote_closed(&self) -> bool {
        matches!(
            self.state,
            StreamState::HalfClosedRemote | StreamState::Closed
        )
    }

    /// Number of complete header blocks received so far
    pub fn header_blocks(&self) -> usize {
        self.header_blocks
    }

    /// Store the decoded response header fields
    pub fn set_headers(&mut self, fields: Vec<(String, String)>) {
        self.headers = fields;
    }

    /// Decoded response header fields, pseudo-headers included
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Value of the `:status` pseudo-header, if received
    pub fn status(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name == ":status")
            .map(|(_, value)| value.as_str())
    }

    /// Take the decoded header fields
    pub fn take_headers(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.headers)
    }

    /// Get accumulated body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Take body (consumes the body data)
    pub fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }

    /// Process incoming HEADERS frame
    ///
    /// Returns the complete header block once END_HEADERS has been seen.
    pub fn receive_headers(&mut self, frame: &HeadersFrame) -> Result<Option<Vec<u8>>> {
        if !self.state.can_receive() {
            return Err(Error::StreamClosed(self.id));
        }

        self.header_block.extend_from_slice(&frame.header_block);
        self.pending_end_stream = frame.end_stream;

        if frame.end_headers {
            Ok(Some(self.finish_header_block()))
        } else {
            Ok(None)
        }
    }

    /// Process a CONTINUATION fragment
    pub fn receive_continuation(&mut self, fragment: &[u8], end_headers: bool) -> Option<Vec<u8>> {
        self.header_block.extend_from_slice(fragment);
        if end_headers {
            Some(self.finish_header_block())
        } else {
            None
        }
    }

    fn finish_header_block(&mut self) -> Vec<u8> {
        self.header_blocks += 1;
        if std::mem::take(&mut self.pending_end_stream) {
            self.state = self.state.close_remote();
        }
        std::mem::take(&mut self.header_block)
    }

    /// Process incoming DATA frame
    pub fn receive_data(&mut self, frame: &DataFrame) -> Result<()> {
        if !self.state.can_receive() {
            return Err(Error::StreamClosed(self.id));
        }
        if self.header_blocks == 0 {
            return Err(Error::Protocol(format!(
                "DATA before HEADERS on stream {}",
                self.id
            )));
        }

        self.body.extend_from_slice(&frame.data);

        if frame.end_stream {
            self.state = self.state.close_remote();
        }

        Ok(())
    }

    /// Prepare to send HEADERS
    pub fn send_headers(&mut self, end_stream: bool) -> Result<()> {
        match self.state {
            StreamState::Idle => {
                self.state = if end_stream {
                    StreamState::HalfClosedLocal
                } else {
                    StreamState::Open
                };
                Ok(())
            }
            state => Err(Error::Protocol(format!(
                "Cannot send HEADERS in state {:?}",
                state
            ))),
        }
    }

    /// Account for outbound DATA
    pub fn send_data(&mut self, data_len: usize, end_stream: bool) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::StreamClosed(self.id));
        }

        self.flow_control.consume_send_window(data_len);

        if end_stream {
            self.state = self.state.close_local();
        }

        Ok(())
    }

    /// Close the stream
    pub fn close(&mut self) {
        self.state = StreamState::Closed;
    }
}

/// Stream manager
///
/// Tracks the client streams of one connection.
#[derive(Debug)]
pub struct StreamManager {
    streams: HashMap<StreamId, H2Stream>,
    next_stream_id: StreamId,
    /// Peer's SETTINGS_MAX_CONCURRENT_STREAMS
    max_concurrent_streams: Option<u32>,
    /// Peer's SETTINGS_INITIAL_WINDOW_SIZE
    initial_send_window: u32,
    /// Our SETTINGS_INITIAL_WINDOW_SIZE
    initial_recv_window: u32,
}

impl StreamManager {
    /// Create a stream manager for a fresh client connection
    pub fn new() -> Self {
        StreamManager {
            streams: HashMap::new(),
            next_stream_id: 1,
            max_concurrent_streams: None,
            initial_send_window: DEFAULT_INITIAL_WINDOW_SIZE,
            initial_recv_window: DEFAULT_INITIAL_WINDOW_SIZE,
        }
    }

    /// Create a stream manager for a connection reached through h2c upgrade
    ///
    /// Stream 1 carries the response to the upgrade request and is already
    /// half-closed on our side (RFC 7540 Section 3.2).
    pub fn upgraded(initial_recv_window: u32) -> Self {
        let mut manager = Self::new();
        manager.initial_recv_window = initial_recv_window;
        let mut stream = H2Stream::with_window_sizes(
            UPGRADE_STREAM_ID,
            manager.initial_send_window,
            manager.initial_recv_window,
        );
        stream.state = StreamState::HalfClosedLocal;
        manager.streams.insert(UPGRADE_STREAM_ID, stream);
        manager.next_stream_id = UPGRADE_STREAM_ID + 2;
        manager
    }

    /// Set maximum concurrent streams
    pub fn set_max_concurrent_streams(&mut self, max: Option<u32>) {
        self.max_concurrent_streams = max;
    }

    /// Peer changed SETTINGS_INITIAL_WINDOW_SIZE
    pub fn set_initial_send_window(&mut self, size: u32) -> Result<()> {
        self.initial_send_window = size;
        for stream in self.streams.values_mut() {
            stream
                .flow_control_mut()
                .send_window_mut()
                .update_initial_size(size)?;
        }
        Ok(())
    }

    /// We announced a new SETTINGS_INITIAL_WINDOW_SIZE; applies to new streams
    pub fn set_initial_recv_window(&mut self, size: u32) {
        self.initial_recv_window = size;
    }

    /// Check whether a new stream could be opened now
    pub fn can_create_stream(&self) -> Result<()> {
        if self.next_stream_id > MAX_STREAM_ID {
            return Err(Error::StreamIdsExhausted);
        }
        if let Some(max) = self.max_concurrent_streams {
            if self.active_stream_count() >= max as usize {
                return Err(Error::TooManyStreams);
            }
        }
        Ok(())
    }

    /// Allocate next stream ID and create stream
    pub fn create_stream(&mut self) -> Result<StreamId> {
        self.can_create_stream()?;

        let stream_id = self.next_stream_id;
        self.next_stream_id += 2;

        let stream = H2Stream::with_window_sizes(
            stream_id,
            self.initial_send_window,
            self.initial_recv_window,
        );
        self.streams.insert(stream_id, stream);

        Ok(stream_id)
    }

    /// Get a stream by ID
    pub fn get_stream(&self, stream_id: StreamId) -> Option<&H2Stream> {
        self.streams.get(&stream_id)
    }

    /// Get a mutable stream by ID
    pub fn get_stream_mut(&mut self, stream_id: StreamId) -> Option<&mut H2Stream> {
        self.streams.get_mut(&stream_id)
    }

    /// Remove a stream
    pub fn remove_stream(&mut self, stream_id: StreamId) -> Option<H2Stream> {
        self.streams.remove(&stream_id)
    }

    /// Get number of active streams
    pub fn active_stream_count(&self) -> usize {
        self.streams
            .values()
            .filter(|s| !s.state().is_closed())
            .count()
    }
}

impl Default for StreamManager {
    fn default() -> Self {
        Self::new()
    }
}
