use avlink_proto::FrameInfo;
use avlink_types::MediaKind;

use super::{CodecKind, DecodedUnit, DecoderFactory, MediaDecoder, host_timestamp};
use crate::error::Result;

/// Lifecycle of the decoder owned by a pipeline.
pub enum DecoderState {
    Uninitialized,
    Ready(Box<dyn MediaDecoder>),
    /// Retired after a codec mismatch, reconfiguration or error; recreated on demand.
    Stale,
}

impl DecoderState {
    fn active_codec(&self) -> Option<CodecKind> {
        match self {
            DecoderState::Ready(decoder) => Some(decoder.codec()),
            DecoderState::Uninitialized | DecoderState::Stale => None,
        }
    }
}

impl std::fmt::Debug for DecoderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecoderState::Uninitialized => f.write_str("Uninitialized"),
            DecoderState::Ready(decoder) => write!(f, "Ready({})", decoder.codec()),
            DecoderState::Stale => f.write_str("Stale"),
        }
    }
}

/// Whether a live decoder must be retired before the next payload.
pub fn is_stale(active: CodecKind, required: CodecKind, reconfigured: bool) -> bool {
    active != required || reconfigured
}

/// Owns one pipeline's decoder and its reusable packet buffer.
pub struct DecoderAdapter {
    kind: MediaKind,
    required: CodecKind,
    state: DecoderState,
    factory: Box<dyn DecoderFactory>,
    packet: Vec<u8>,
}

impl DecoderAdapter {
    pub fn new(kind: MediaKind, factory: Box<dyn DecoderFactory>) -> Self {
        Self {
            kind,
            required: CodecKind::required_for(kind),
            state: DecoderState::Uninitialized,
            factory,
            packet: Vec::new(),
        }
    }

    /// Buffer the frame reader assembles payloads into.
    pub fn packet_buffer(&mut self) -> &mut Vec<u8> {
        &mut self.packet
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    pub fn active_codec(&self) -> Option<CodecKind> {
        self.state.active_codec()
    }

    /// Called before each read. Video keeps a decoder of the required codec ready; audio
    /// decoders are created lazily from configuration bytes in [`DecoderAdapter::decode`].
    pub fn prepare(&mut self) -> Result<()> {
        if self.kind != MediaKind::Video {
            return Ok(());
        }
        self.retire_if_stale(false);
        if !matches!(self.state, DecoderState::Ready(_)) {
            let decoder = self.factory.create(self.required, None)?;
            tracing::debug!(kind = %self.kind, codec = %self.required, "decoder created");
            self.state = DecoderState::Ready(decoder);
        }
        Ok(())
    }

    /// Decode the payload the frame reader left in the packet buffer.
    ///
    /// For audio, a payload that carries configuration only (re)creates the decoder from the
    /// configuration bytes and yields nothing. Payloads arriving before any configuration are
    /// skipped.
    pub fn decode(&mut self, info: &FrameInfo) -> Result<Option<DecodedUnit<'_>>> {
        if self.kind == MediaKind::Audio {
            self.retire_if_stale(info.has_config());
            if !matches!(self.state, DecoderState::Ready(_)) {
                let config_len = info.config_len.min(self.packet.len());
                if config_len == 0 {
                    tracing::debug!(
                        kind = %self.kind,
                        pts = info.pts,
                        "no decoder configuration yet; skipping payload"
                    );
                    return Ok(None);
                }
                let decoder = self
                    .factory
                    .create(self.required, Some(&self.packet[..config_len]))?;
                tracing::debug!(
                    kind = %self.kind,
                    codec = %self.required,
                    config_len,
                    "decoder created"
                );
                self.state = DecoderState::Ready(decoder);
                return Ok(None);
            }
        }

        let len = info.len.min(self.packet.len());
        match &mut self.state {
            DecoderState::Ready(decoder) => {
                decoder.decode(&self.packet[..len], host_timestamp(info.pts))
            }
            DecoderState::Uninitialized | DecoderState::Stale => Ok(None),
        }
    }

    /// Drop the live decoder; the next stream starts from a fresh instance.
    pub fn invalidate(&mut self) {
        if matches!(self.state, DecoderState::Ready(_)) {
            tracing::debug!(kind = %self.kind, "decoder invalidated");
            self.state = DecoderState::Stale;
        }
    }

    /// Release the decoder and the packet buffer.
    pub fn shutdown(&mut self) {
        self.state = DecoderState::Uninitialized;
        self.packet = Vec::new();
    }

    fn retire_if_stale(&mut self, reconfigured: bool) {
        let Some(active) = self.state.active_codec() else {
            return;
        };
        if is_stale(active, self.required, reconfigured) {
            tracing::debug!(
                kind = %self.kind,
                active = %active,
                required = %self.required,
                reconfigured,
                "retiring decoder"
            );
            self.state = DecoderState::Stale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DefaultDecoders;
    use crate::testing::ScriptedDecoders;

    fn load(adapter: &mut DecoderAdapter, config: &[u8], data: &[u8], pts: u64) -> FrameInfo {
        let buf = adapter.packet_buffer();
        buf.clear();
        buf.extend_from_slice(config);
        buf.extend_from_slice(data);
        FrameInfo {
            pts,
            len: buf.len(),
            config_len: config.len(),
        }
    }

    #[test]
    fn stale_decision_table() {
        assert!(!is_stale(CodecKind::Aac, CodecKind::Aac, false));
        assert!(is_stale(CodecKind::Aac, CodecKind::Aac, true));
        assert!(is_stale(CodecKind::H264, CodecKind::Aac, false));
        assert!(is_stale(CodecKind::Aac, CodecKind::H264, true));
    }

    #[test]
    fn video_decoder_is_created_before_first_read_and_kept() {
        let factory = ScriptedDecoders::new();
        let mut adapter = DecoderAdapter::new(MediaKind::Video, Box::new(factory.clone()));
        assert!(matches!(adapter.state(), DecoderState::Uninitialized));

        adapter.prepare().unwrap();
        assert_eq!(adapter.active_codec(), Some(CodecKind::H264));

        let info = load(&mut adapter, b"SPS", b"IDR", 7);
        match adapter.decode(&info).unwrap() {
            Some(DecodedUnit::Video(frame)) => {
                assert_eq!(frame.timestamp, 700);
                assert_eq!(frame.data, b"SPSIDR");
            }
            other => panic!("unexpected {other:?}"),
        }

        adapter.prepare().unwrap();
        let info = load(&mut adapter, b"", b"P", 8);
        assert!(adapter.decode(&info).unwrap().is_some());
        assert_eq!(factory.created(), vec![(CodecKind::H264, None)]);
    }

    #[test]
    fn audio_primes_from_config_then_decodes() {
        let factory = ScriptedDecoders::new();
        let mut adapter = DecoderAdapter::new(MediaKind::Audio, Box::new(factory.clone()));
        adapter.prepare().unwrap();
        assert!(adapter.active_codec().is_none());

        let info = load(&mut adapter, b"ASC", b"A0", 1);
        assert!(adapter.decode(&info).unwrap().is_none());
        assert_eq!(adapter.active_codec(), Some(CodecKind::Aac));

        let info = load(&mut adapter, b"", b"A1", 2);
        match adapter.decode(&info).unwrap() {
            Some(DecodedUnit::Audio(frame)) => {
                assert_eq!(frame.timestamp, 200);
                assert_eq!(frame.frames, 2);
            }
            other => panic!("unexpected {other:?}"),
        }

        // A new configuration packet recreates the decoder and swallows that payload.
        let info = load(&mut adapter, b"ASC2", b"A2", 3);
        assert!(adapter.decode(&info).unwrap().is_none());
        assert_eq!(
            factory.created(),
            vec![
                (CodecKind::Aac, Some(b"ASC".to_vec())),
                (CodecKind::Aac, Some(b"ASC2".to_vec())),
            ]
        );
    }

    #[test]
    fn audio_payload_before_config_is_skipped() {
        let mut adapter = DecoderAdapter::new(MediaKind::Audio, Box::new(DefaultDecoders));

        let info = load(&mut adapter, b"", &[0x21, 0x10, 0x04], 1);
        assert!(adapter.decode(&info).unwrap().is_none());
        assert!(matches!(adapter.state(), DecoderState::Uninitialized));

        // AudioSpecificConfig: AAC-LC, 48 kHz, stereo.
        let info = load(&mut adapter, &[0x11, 0x90], &[0x21, 0x10, 0x04], 2);
        assert!(adapter.decode(&info).unwrap().is_none());
        assert_eq!(adapter.active_codec(), Some(CodecKind::Aac));
    }

    #[test]
    fn invalidated_audio_decoder_waits_for_new_config() {
        let factory = ScriptedDecoders::new();
        let mut adapter = DecoderAdapter::new(MediaKind::Audio, Box::new(factory.clone()));
        let info = load(&mut adapter, b"ASC", b"A0", 1);
        assert!(adapter.decode(&info).unwrap().is_none());

        adapter.invalidate();
        let info = load(&mut adapter, b"", b"A1", 2);
        assert!(adapter.decode(&info).unwrap().is_none());
        assert!(matches!(adapter.state(), DecoderState::Stale));
        assert_eq!(factory.created().len(), 1);
    }

    #[test]
    fn wrong_codec_is_replaced() {
        let factory = ScriptedDecoders::new().with_video_codec(CodecKind::Aac);
        let mut adapter = DecoderAdapter::new(MediaKind::Video, Box::new(factory.clone()));
        adapter.prepare().unwrap();
        assert_eq!(adapter.active_codec(), Some(CodecKind::Aac));

        adapter.prepare().unwrap();
        assert_eq!(factory.created().len(), 2);
    }

    #[test]
    fn invalidate_forces_recreation() {
        let factory = ScriptedDecoders::new();
        let mut adapter = DecoderAdapter::new(MediaKind::Video, Box::new(factory.clone()));
        adapter.prepare().unwrap();
        adapter.invalidate();
        assert!(matches!(adapter.state(), DecoderState::Stale));
        adapter.prepare().unwrap();
        assert_eq!(factory.created().len(), 2);

        adapter.shutdown();
        assert!(matches!(adapter.state(), DecoderState::Uninitialized));
    }
}
