//! Decode stage: codec selection, decoded unit types and the decoder seam.
//!
//! Decoders are created and used on the owning pipeline thread only, so [`MediaDecoder`]
//! is not `Send`. What crosses threads is the [`DecoderFactory`].

mod adapter;
mod audio;
mod video;

pub use adapter::{DecoderAdapter, DecoderState, is_stale};
pub use audio::AacDecoder;
pub use video::H264Decoder;

use avlink_types::MediaKind;

use crate::error::Result;

/// Ticks per host time unit. Wire timestamps are multiplied by this factor as-is.
pub const PTS_SCALE: u64 = 100;

/// Convert a wire PTS to the host timestamp (`pts * 100`, saturating).
pub fn host_timestamp(pts: u64) -> u64 {
    pts.saturating_mul(PTS_SCALE)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecKind {
    H264,
    Aac,
}

impl CodecKind {
    /// Codec a pipeline of `kind` must decode with.
    pub fn required_for(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video => CodecKind::H264,
            MediaKind::Audio => CodecKind::Aac,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CodecKind::H264 => "h264",
            CodecKind::Aac => "aac",
        }
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, row-major, no padding.
    Rgba8,
}

/// Decoded picture.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub timestamp: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    Other(u16),
}

impl ChannelLayout {
    pub fn from_count(channels: usize) -> Self {
        match channels {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            n => ChannelLayout::Other(u16::try_from(n).unwrap_or(u16::MAX)),
        }
    }

    pub fn channels(&self) -> u16 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Other(n) => *n,
        }
    }
}

/// Decoded block of interleaved `f32` samples.
#[derive(Clone, Debug)]
pub struct AudioFrame {
    pub timestamp: u64,
    pub samples: Vec<f32>,
    /// Samples per channel.
    pub frames: usize,
    pub sample_rate: u32,
    pub layout: ChannelLayout,
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self {
            timestamp: 0,
            samples: Vec::new(),
            frames: 0,
            sample_rate: 0,
            layout: ChannelLayout::Stereo,
        }
    }
}

/// Output of one decode call, borrowed from the decoder's reusable buffers.
#[derive(Debug)]
pub enum DecodedUnit<'a> {
    Video(&'a VideoFrame),
    Audio(&'a AudioFrame),
}

/// A live decoder instance.
pub trait MediaDecoder {
    fn codec(&self) -> CodecKind;

    /// Decode one assembled payload. `Ok(None)` means the decoder needs more input.
    fn decode(&mut self, payload: &[u8], timestamp: u64) -> Result<Option<DecodedUnit<'_>>>;
}

/// Creates decoders on the pipeline thread.
pub trait DecoderFactory: Send {
    /// `config` holds codec parameters taken from a configuration packet, when one was seen.
    fn create(&mut self, codec: CodecKind, config: Option<&[u8]>)
    -> Result<Box<dyn MediaDecoder>>;
}

/// openh264 for video, symphonia for audio.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultDecoders;

impl DecoderFactory for DefaultDecoders {
    fn create(
        &mut self,
        codec: CodecKind,
        config: Option<&[u8]>,
    ) -> Result<Box<dyn MediaDecoder>> {
        match codec {
            CodecKind::H264 => Ok(Box::new(H264Decoder::new()?)),
            CodecKind::Aac => Ok(Box::new(AacDecoder::new(config)?)),
        }
    }
}
