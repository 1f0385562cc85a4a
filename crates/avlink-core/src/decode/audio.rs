use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CODEC_TYPE_AAC, CodecParameters, Decoder, DecoderOptions};
use symphonia::core::formats::Packet;

use super::{AudioFrame, ChannelLayout, CodecKind, DecodedUnit, MediaDecoder};
use crate::error::{Result, StreamError};

/// Raw AAC decoder producing interleaved `f32` samples.
///
/// Initialized from the AudioSpecificConfig carried by a configuration packet.
pub struct AacDecoder {
    decoder: Box<dyn Decoder>,
    sample_buf: Option<(SignalSpec, SampleBuffer<f32>)>,
    frame: AudioFrame,
}

impl AacDecoder {
    pub fn new(config: Option<&[u8]>) -> Result<Self> {
        let config = config.ok_or_else(|| {
            StreamError::DecoderInitFailed("aac decoder requires a config packet".to_string())
        })?;

        let mut params = CodecParameters::new();
        params
            .for_codec(CODEC_TYPE_AAC)
            .with_extra_data(config.to_vec().into_boxed_slice());

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| StreamError::DecoderInitFailed(e.to_string()))?;

        Ok(Self {
            decoder,
            sample_buf: None,
            frame: AudioFrame::default(),
        })
    }
}

impl MediaDecoder for AacDecoder {
    fn codec(&self) -> CodecKind {
        CodecKind::Aac
    }

    fn decode(&mut self, payload: &[u8], timestamp: u64) -> Result<Option<DecodedUnit<'_>>> {
        let packet = Packet::new_from_slice(0, timestamp, 0, payload);
        let decoded = self
            .decoder
            .decode(&packet)
            .map_err(|e| StreamError::DecodeFailed(e.to_string()))?;

        let frames = decoded.frames();
        if frames == 0 {
            return Ok(None);
        }
        let spec = *decoded.spec();

        let channels = spec.channels.count();
        let reuse = self
            .sample_buf
            .as_ref()
            .is_some_and(|(last, buf)| *last == spec && buf.capacity() >= frames * channels);
        if !reuse {
            self.sample_buf = Some((spec, SampleBuffer::<f32>::new(frames as u64, spec)));
        }
        let Some((_, buf)) = self.sample_buf.as_mut() else {
            return Ok(None);
        };
        buf.copy_interleaved_ref(decoded);

        self.frame.samples.clear();
        self.frame.samples.extend_from_slice(buf.samples());
        self.frame.timestamp = timestamp;
        self.frame.frames = frames;
        self.frame.sample_rate = spec.rate;
        self.frame.layout = ChannelLayout::from_count(channels);
        Ok(Some(DecodedUnit::Audio(&self.frame)))
    }
}
