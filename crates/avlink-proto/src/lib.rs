//! Wire format shared by the receiver and anything that speaks to a streaming device.
//!
//! One TCP connection carries one media kind. After connecting, the client sends a start
//! request (`/video\r\n` or `/audio\r\n`) and the device answers with a stream of frames:
//!
//! - header: 12 bytes
//!   - pts:    u64 BE (100 ns ticks, or [`NO_PTS`] for configuration packets)
//!   - length: u32 BE (`1..=MAX_PAYLOAD_LEN`)
//! - payload: [u8; length]
//!
//! Configuration packets (codec parameter sets) carry no timestamp of their own. They are
//! held back and prepended to the next data payload, so callers only ever see
//! `(pts, config ++ data)` units.

use std::io::{self, Read, Write};

/// Size of the fixed frame header.
pub const HEADER_SIZE: usize = 12;

/// Sentinel timestamp marking a configuration packet.
pub const NO_PTS: u64 = u64::MAX;

/// Largest payload a single frame may declare.
pub const MAX_PAYLOAD_LEN: u32 = 1024 * 1024;

/// Largest configuration packet accepted.
pub const MAX_CONFIG_LEN: usize = 1024;

/// Start request for the video connection.
pub const VIDEO_REQUEST: &[u8] = b"/video\r\n";

/// Start request for the audio connection.
pub const AUDIO_REQUEST: &[u8] = b"/audio\r\n";

/// Liveness check request.
pub const PING_REQUEST: &[u8] = b"/ping\r\n";

/// Expected answer to [`PING_REQUEST`].
pub const PONG: [u8; 4] = *b"pong";

/// Protocol rule broken by the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Declared payload length outside `1..=MAX_PAYLOAD_LEN`.
    InvalidLength(u32),
    /// Two configuration packets without a data packet in between.
    DoubleConfig,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::InvalidLength(len) => write!(f, "invalid payload length {len}"),
            Violation::DoubleConfig => f.write_str("double config"),
        }
    }
}

/// Errors produced while reading frames. All of them end the connection.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("connection closed: {0}")]
    ConnectionClosed(#[source] io::Error),

    #[error("framing error: {0}")]
    Framing(Violation),

    #[error("config packet too large at {0} bytes")]
    ConfigTooLarge(u32),
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub pts: u64,
    pub len: u32,
}

impl FrameHeader {
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut pts = [0u8; 8];
        pts.copy_from_slice(&bytes[..8]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[8..]);
        Self {
            pts: u64::from_be_bytes(pts),
            len: u32::from_be_bytes(len),
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..8].copy_from_slice(&self.pts.to_be_bytes());
        out[8..].copy_from_slice(&self.len.to_be_bytes());
        out
    }

    pub fn is_config(&self) -> bool {
        self.pts == NO_PTS
    }
}

/// Metadata for a payload assembled by [`read_frame_into`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Wire timestamp of the data packet.
    pub pts: u64,
    /// Total assembled length (`config_len` + data length).
    pub len: usize,
    /// Leading bytes that came from a configuration packet.
    pub config_len: usize,
}

impl FrameInfo {
    pub fn has_config(&self) -> bool {
        self.config_len > 0
    }
}

/// Owned `(pts, payload)` unit returned by [`read_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub pts: u64,
    pub payload: Vec<u8>,
    pub config_len: usize,
}

/// Read one frame header and validate its declared length.
pub fn read_header(mut r: impl Read) -> Result<FrameHeader, FrameError> {
    let mut buf = [0u8; HEADER_SIZE];
    r.read_exact(&mut buf).map_err(FrameError::ConnectionClosed)?;
    let header = FrameHeader::decode(&buf);
    if header.len == 0 || header.len > MAX_PAYLOAD_LEN {
        return Err(FrameError::Framing(Violation::InvalidLength(header.len)));
    }
    Ok(header)
}

/// Read the next data payload into `out`, prepending a preceding configuration packet.
///
/// `out` is cleared and resized, so callers can keep one buffer across calls. Pending
/// configuration lives only for the duration of the call: on error nothing carries over.
pub fn read_frame_into(mut r: impl Read, out: &mut Vec<u8>) -> Result<FrameInfo, FrameError> {
    let mut config = [0u8; MAX_CONFIG_LEN];
    let mut config_len = 0usize;

    loop {
        let header = read_header(&mut r)?;

        if header.is_config() {
            if config_len != 0 {
                return Err(FrameError::Framing(Violation::DoubleConfig));
            }
            let len = header.len as usize;
            if len > MAX_CONFIG_LEN {
                return Err(FrameError::ConfigTooLarge(header.len));
            }
            r.read_exact(&mut config[..len])
                .map_err(FrameError::ConnectionClosed)?;
            config_len = len;
            continue;
        }

        let data_len = header.len as usize;
        out.clear();
        out.resize(config_len + data_len, 0);
        out[..config_len].copy_from_slice(&config[..config_len]);
        r.read_exact(&mut out[config_len..])
            .map_err(FrameError::ConnectionClosed)?;

        return Ok(FrameInfo {
            pts: header.pts,
            len: out.len(),
            config_len,
        });
    }
}

/// Read the next data payload into a freshly allocated buffer.
pub fn read_frame(r: impl Read) -> Result<Frame, FrameError> {
    let mut payload = Vec::new();
    let info = read_frame_into(r, &mut payload)?;
    Ok(Frame {
        pts: info.pts,
        payload,
        config_len: info.config_len,
    })
}

/// Encode a frame (header + payload) into a single buffer.
pub fn encode_frame(pts: u64, payload: &[u8]) -> io::Result<Vec<u8>> {
    let len: u32 = payload
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "payload too large"))?;
    if len == 0 || len > MAX_PAYLOAD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload length {len} out of range"),
        ));
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&FrameHeader { pts, len }.encode());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Write a data frame.
pub fn write_frame(mut w: impl Write, pts: u64, payload: &[u8]) -> io::Result<()> {
    let frame = encode_frame(pts, payload)?;
    w.write_all(&frame)
}

/// Write a configuration packet.
pub fn write_config(mut w: impl Write, config: &[u8]) -> io::Result<()> {
    if config.len() > MAX_CONFIG_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("config length {} exceeds {MAX_CONFIG_LEN}", config.len()),
        ));
    }
    let frame = encode_frame(NO_PTS, config)?;
    w.write_all(&frame)
}
