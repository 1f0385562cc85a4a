use serde::{Deserialize, Serialize};

/// Logical stream carried by one TCP connection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a media pipeline.
///
/// Only the pipeline's own thread moves it between states; everyone else observes.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No active socket; idle placeholders are being emitted.
    #[default]
    Idle,
    /// A socket was taken from the queue and the start request is being sent.
    Starting,
    /// Frames are being read and decoded.
    Running,
}

impl PipelineState {
    /// Compact encoding for storing the state in an atomic.
    pub fn as_u8(self) -> u8 {
        match self {
            PipelineState::Idle => 0,
            PipelineState::Starting => 1,
            PipelineState::Running => 2,
        }
    }

    /// Inverse of [`PipelineState::as_u8`]; unknown values read as `Idle`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PipelineState::Starting,
            2 => PipelineState::Running,
            _ => PipelineState::Idle,
        }
    }
}

/// Reason the most recent stream on a pipeline ended.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamEndReason {
    /// Peer closed the connection or a read failed.
    ConnectionClosed,
    /// Peer violated the framing protocol.
    ProtocolError,
    /// Decoder could not be created or rejected a payload.
    DecoderError,
    /// Start request could not be sent.
    StartFailed,
    /// Audio gave up waiting for video to start.
    VideoNotRunning,
    /// Explicit disconnect request.
    Disconnected,
    /// Process shutdown.
    Shutdown,
}

/// Snapshot of one pipeline for status reporting.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineStatus {
    pub state: PipelineState,
    /// Sockets that reached `Running`.
    pub streams_started: u64,
    /// Data frames read from the wire.
    pub frames_read: u64,
    /// Payload bytes read (configuration bytes included).
    pub bytes_read: u64,
    /// Decoded units handed to the sink.
    pub units_emitted: u64,
    /// Sockets closed on arrival because a stream was already running.
    pub sockets_rejected: u64,
    /// Codec of the live decoder, if any (for example `h264`, `aac`).
    pub codec: Option<String>,
    /// Why the previous stream ended.
    pub last_end: Option<StreamEndReason>,
}

/// Status of both pipelines.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamStatus {
    pub video: PipelineStatus,
    pub audio: PipelineStatus,
    /// Milliseconds since the stream context started.
    pub uptime_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_state_roundtrips_through_u8() {
        for state in [
            PipelineState::Idle,
            PipelineState::Starting,
            PipelineState::Running,
        ] {
            assert_eq!(PipelineState::from_u8(state.as_u8()), state);
        }
        assert_eq!(PipelineState::from_u8(200), PipelineState::Idle);
    }

    #[test]
    fn status_serializes_snake_case() {
        let status = StreamStatus {
            video: PipelineStatus {
                state: PipelineState::Running,
                codec: Some("h264".to_string()),
                ..PipelineStatus::default()
            },
            audio: PipelineStatus {
                last_end: Some(StreamEndReason::VideoNotRunning),
                ..PipelineStatus::default()
            },
            uptime_ms: 5,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["video"]["state"], "running");
        assert_eq!(json["audio"]["state"], "idle");
        assert_eq!(json["audio"]["last_end"], "video_not_running");
    }

    #[test]
    fn media_kind_displays_lowercase() {
        assert_eq!(MediaKind::Video.to_string(), "video");
        assert_eq!(MediaKind::Audio.to_string(), "audio");
    }
}
