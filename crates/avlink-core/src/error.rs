//! Error types for the streaming core.

use std::io;

use avlink_proto::{FrameError, Violation};
use avlink_types::StreamEndReason;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("framing error: {0}")]
    Framing(Violation),

    #[error("config packet too large at {0} bytes")]
    ConfigTooLarge(u32),

    #[error("connection closed: {0}")]
    ConnectionClosed(#[source] io::Error),

    #[error("decoder initialization failed: {0}")]
    DecoderInitFailed(String),

    #[error("decoding failed: {0}")]
    DecodeFailed(String),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl From<FrameError> for StreamError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::ConnectionClosed(e) => StreamError::ConnectionClosed(e),
            FrameError::Framing(v) => StreamError::Framing(v),
            FrameError::ConfigTooLarge(len) => StreamError::ConfigTooLarge(len),
        }
    }
}

impl StreamError {
    /// How a stream ended when this error terminated it.
    pub fn end_reason(&self) -> StreamEndReason {
        match self {
            StreamError::Framing(_) | StreamError::ConfigTooLarge(_) => {
                StreamEndReason::ProtocolError
            }
            StreamError::DecoderInitFailed(_) | StreamError::DecodeFailed(_) => {
                StreamEndReason::DecoderError
            }
            StreamError::ConnectFailed { .. }
            | StreamError::HandshakeFailed(_)
            | StreamError::ConnectionClosed(_)
            | StreamError::Spawn { .. } => StreamEndReason::ConnectionClosed,
        }
    }

    pub fn is_decoder_error(&self) -> bool {
        matches!(
            self,
            StreamError::DecoderInitFailed(_) | StreamError::DecodeFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_onto_stream_errors() {
        let closed: StreamError =
            FrameError::ConnectionClosed(io::Error::from(io::ErrorKind::UnexpectedEof)).into();
        assert!(matches!(closed, StreamError::ConnectionClosed(_)));
        assert_eq!(closed.end_reason(), StreamEndReason::ConnectionClosed);

        let framing: StreamError = FrameError::Framing(Violation::DoubleConfig).into();
        assert!(matches!(framing, StreamError::Framing(Violation::DoubleConfig)));
        assert_eq!(framing.end_reason(), StreamEndReason::ProtocolError);

        let big: StreamError = FrameError::ConfigTooLarge(4096).into();
        assert_eq!(big.end_reason(), StreamEndReason::ProtocolError);
    }

    #[test]
    fn decoder_errors_are_flagged() {
        assert!(StreamError::DecodeFailed("x".into()).is_decoder_error());
        assert!(StreamError::DecoderInitFailed("x".into()).is_decoder_error());
        assert!(!StreamError::HandshakeFailed("x".into()).is_decoder_error());
    }
}
