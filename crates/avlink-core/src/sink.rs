use crate::decode::{AudioFrame, DecodedUnit, VideoFrame};

/// Host-side consumer of decoded media.
///
/// Called from the pipeline threads. `None` is the explicit "no frame" placeholder emitted
/// on every idle tick.
pub trait MediaSink: Send + Sync {
    fn output_video(&self, frame: Option<&VideoFrame>);
    fn output_audio(&self, frame: Option<&AudioFrame>);
}

pub(crate) fn emit(sink: &dyn MediaSink, unit: DecodedUnit<'_>) {
    match unit {
        DecodedUnit::Video(frame) => sink.output_video(Some(frame)),
        DecodedUnit::Audio(frame) => sink.output_audio(Some(frame)),
    }
}
