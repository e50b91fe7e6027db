//! HTTP/2 frame encoding and decoding
//!
//! Frames are built byte-for-byte here so callers keep full control over
//! what goes on the wire, including raw SETTINGS payloads.

use super::error::{Error, Result};
use super::frames::*;
use crate::http::{HttpSession, SessionOps};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::{self, Read};

/// HTTP/2 frame header size (9 bytes)
pub const FRAME_HEADER_SIZE: usize = 9;

/// Maximum frame payload size (16MB - 1)
pub const MAX_FRAME_SIZE: usize = 0x00FFFFFF;

/// Decoded 9-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: usize,
    pub kind: u8,
    pub flags: FrameFlags,
    pub stream_id: u32,
}

/// Frame codec for encoding/decoding HTTP/2 frames
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a frame header
    pub fn encode_header(
        frame_type: FrameType,
        flags: FrameFlags,
        stream_id: u32,
        length: usize,
    ) -> [u8; FRAME_HEADER_SIZE] {
        let mut header = [0u8; FRAME_HEADER_SIZE];

        // Length (24 bits, big-endian)
        header[0] = ((length >> 16) & 0xFF) as u8;
        header[1] = ((length >> 8) & 0xFF) as u8;
        header[2] = (length & 0xFF) as u8;

        header[3] = frame_type.as_u8();
        header[4] = flags.as_u8();

        // Stream ID (31 bits, reserved bit is 0)
        header[5..].copy_from_slice(&(stream_id & 0x7FFFFFFF).to_be_bytes());

        header
    }

    /// Decode a frame header
    pub fn decode_header(bytes: &[u8; FRAME_HEADER_SIZE]) -> FrameHeader {
        let length =
            ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize);

        // Ignore the reserved bit
        let stream_id = u32::from_be_bytes([bytes[5] & 0x7F, bytes[6], bytes[7], bytes[8]]);

        FrameHeader {
            length,
            kind: bytes[3],
            flags: FrameFlags::from_u8(bytes[4]),
            stream_id,
        }
    }

    fn frame(frame_type: FrameType, flags: FrameFlags, stream_id: u32, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
        buf.put_slice(&Self::encode_header(frame_type, flags, stream_id, payload.len()));
        buf.put_slice(payload);
        buf.freeze()
    }

    fn flag_if(cond: bool, flag: u8) -> u8 {
        if cond {
            flag
        } else {
            0
        }
    }

    /// Encode a DATA frame
    pub fn encode_data_frame(frame: &DataFrame) -> Bytes {
        let flags = FrameFlags::from_u8(Self::flag_if(frame.end_stream, FrameFlags::END_STREAM));
        Self::frame(FrameType::Data, flags, frame.stream_id, &frame.data)
    }

    /// Encode a HEADERS frame
    pub fn encode_headers_frame(frame: &HeadersFrame) -> Bytes {
        let mut flags = FrameFlags::from_u8(
            Self::flag_if(frame.end_stream, FrameFlags::END_STREAM)
                | Self::flag_if(frame.end_headers, FrameFlags::END_HEADERS),
        );

        let mut payload = BytesMut::with_capacity(frame.header_block.len() + 5);
        if let Some(priority) = &frame.priority {
            flags.set(FrameFlags::PRIORITY);
            let mut dep = priority.stream_dependency & 0x7FFFFFFF;
            if priority.exclusive {
                dep |= 0x80000000;
            }
            payload.put_u32(dep);
            payload.put_u8(priority.weight);
        }
        payload.put_slice(&frame.header_block);

        Self::frame(FrameType::Headers, flags, frame.stream_id, &payload)
    }

    /// Encode a CONTINUATION frame
    pub fn encode_continuation_frame(stream_id: u32, fragment: &[u8], end_headers: bool) -> Bytes {
        let flags = FrameFlags::from_u8(Self::flag_if(end_headers, FrameFlags::END_HEADERS));
        Self::frame(FrameType::Continuation, flags, stream_id, fragment)
    }

    /// Encode a SETTINGS frame
    pub fn encode_settings_frame(frame: &SettingsFrame) -> Bytes {
        if frame.ack {
            return Self::frame(
                FrameType::Settings,
                FrameFlags::from_u8(FrameFlags::ACK),
                0,
                &[],
            );
        }

        let mut payload = BytesMut::new();
        frame.settings.encode_into(&mut payload);
        Self::frame(FrameType::Settings, FrameFlags::empty(), 0, &payload)
    }

    /// Encode a SETTINGS frame around an already serialized payload
    pub fn encode_settings_payload(payload: &[u8]) -> Bytes {
        Self::frame(FrameType::Settings, FrameFlags::empty(), 0, payload)
    }

    /// Encode a PING frame
    pub fn encode_ping_frame(frame: &PingFrame) -> Bytes {
        let flags = FrameFlags::from_u8(Self::flag_if(frame.ack, FrameFlags::ACK));
        Self::frame(FrameType::Ping, flags, 0, &frame.data)
    }

    /// Encode a GOAWAY frame
    pub fn encode_goaway_frame(frame: &GoawayFrame) -> Bytes {
        let mut payload = BytesMut::with_capacity(8 + frame.debug_data.len());
        payload.put_u32(frame.last_stream_id & 0x7FFFFFFF);
        payload.put_u32(frame.error_code.as_u32());
        payload.put_slice(&frame.debug_data);
        Self::frame(FrameType::Goaway, FrameFlags::empty(), 0, &payload)
    }

    /// Encode a WINDOW_UPDATE frame
    pub fn encode_window_update_frame(frame: &WindowUpdateFrame) -> Bytes {
        let increment = (frame.size_increment & 0x7FFFFFFF).to_be_bytes();
        Self::frame(
            FrameType::WindowUpdate,
            FrameFlags::empty(),
            frame.stream_id,
            &increment,
        )
    }

    /// Encode a RST_STREAM frame
    pub fn encode_rst_stream_frame(frame: &RstStreamFrame) -> Bytes {
        let code = frame.error_code.as_u32().to_be_bytes();
        Self::frame(FrameType::RstStream, FrameFlags::empty(), frame.stream_id, &code)
    }

    /// Read one frame from any reader
    pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let header = Self::decode_header(&header);
        if header.length > MAX_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Frame payload too large: {}", header.length),
            ));
        }

        let mut payload = vec![0u8; header.length];
        reader.read_exact(&mut payload)?;

        Ok(Frame {
            kind: header.kind,
            flags: header.flags,
            stream_id: header.stream_id,
            payload: Bytes::from(payload),
        })
    }

    /// Read one frame from a session, rejecting payloads above `max_payload`
    pub fn read_frame_from_session<S: SessionOps>(
        session: &mut HttpSession<S>,
        max_payload: usize,
    ) -> Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        session.read_exact(&mut header)?;

        let header = Self::decode_header(&header);
        if header.length > max_payload {
            return Err(Error::FrameSize(format!(
                "Frame payload {} exceeds limit {}",
                header.length, max_payload
            )));
        }

        let mut payload = vec![0u8; header.length];
        session.read_exact(&mut payload)?;

        Ok(Frame {
            kind: header.kind,
            flags: header.flags,
            stream_id: header.stream_id,
            payload: Bytes::from(payload),
        })
    }
}
