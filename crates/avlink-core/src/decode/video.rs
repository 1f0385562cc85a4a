use openh264::decoder::Decoder;
use openh264::formats::YUVSource;

use super::{CodecKind, DecodedUnit, MediaDecoder, PixelFormat, VideoFrame};
use crate::error::{Result, StreamError};

/// H.264 Annex-B decoder producing RGBA frames.
///
/// Parameter sets arrive in-band (configuration packets are prepended to the next access
/// unit), so the decoder needs no out-of-band setup.
pub struct H264Decoder {
    decoder: Decoder,
    frame: VideoFrame,
}

impl H264Decoder {
    pub fn new() -> Result<Self> {
        let decoder = Decoder::new().map_err(|e| StreamError::DecoderInitFailed(e.to_string()))?;
        Ok(Self {
            decoder,
            frame: VideoFrame {
                timestamp: 0,
                width: 0,
                height: 0,
                format: PixelFormat::Rgba8,
                data: Vec::new(),
            },
        })
    }
}

impl MediaDecoder for H264Decoder {
    fn codec(&self) -> CodecKind {
        CodecKind::H264
    }

    fn decode(&mut self, payload: &[u8], timestamp: u64) -> Result<Option<DecodedUnit<'_>>> {
        let yuv = match self.decoder.decode(payload) {
            Ok(Some(yuv)) => yuv,
            Ok(None) => return Ok(None),
            Err(e) => return Err(StreamError::DecodeFailed(e.to_string())),
        };

        let (width, height) = yuv.dimensions();
        self.frame.data.clear();
        self.frame.data.resize(width * height * 4, 0);
        yuv.write_rgba8(&mut self.frame.data);

        self.frame.timestamp = timestamp;
        self.frame.width = width as u32;
        self.frame.height = height as u32;
        Ok(Some(DecodedUnit::Video(&self.frame)))
    }
}
