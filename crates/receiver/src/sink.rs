use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use avlink_core::decode::{AudioFrame, VideoFrame};
use avlink_core::sink::MediaSink;
use serde::Serialize;

/// Sink that only counts what it receives. Stands in for a real presenter.
#[derive(Debug, Default)]
pub struct StatsSink {
    video_frames: AtomicU64,
    video_idle: AtomicU64,
    width: AtomicU32,
    height: AtomicU32,
    audio_frames: AtomicU64,
    audio_samples: AtomicU64,
    audio_idle: AtomicU64,
    sample_rate: AtomicU32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SinkStats {
    pub video_frames: u64,
    pub video_idle: u64,
    pub width: u32,
    pub height: u32,
    pub audio_frames: u64,
    pub audio_samples: u64,
    pub audio_idle: u64,
    pub sample_rate: u32,
}

impl StatsSink {
    pub fn snapshot(&self) -> SinkStats {
        SinkStats {
            video_frames: self.video_frames.load(Ordering::Relaxed),
            video_idle: self.video_idle.load(Ordering::Relaxed),
            width: self.width.load(Ordering::Relaxed),
            height: self.height.load(Ordering::Relaxed),
            audio_frames: self.audio_frames.load(Ordering::Relaxed),
            audio_samples: self.audio_samples.load(Ordering::Relaxed),
            audio_idle: self.audio_idle.load(Ordering::Relaxed),
            sample_rate: self.sample_rate.load(Ordering::Relaxed),
        }
    }
}

impl MediaSink for StatsSink {
    fn output_video(&self, frame: Option<&VideoFrame>) {
        match frame {
            Some(f) => {
                self.video_frames.fetch_add(1, Ordering::Relaxed);
                self.width.store(f.width, Ordering::Relaxed);
                self.height.store(f.height, Ordering::Relaxed);
            }
            None => {
                self.video_idle.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn output_audio(&self, frame: Option<&AudioFrame>) {
        match frame {
            Some(f) => {
                self.audio_frames.fetch_add(1, Ordering::Relaxed);
                self.audio_samples
                    .fetch_add(f.samples.len() as u64, Ordering::Relaxed);
                self.sample_rate.store(f.sample_rate, Ordering::Relaxed);
            }
            None => {
                self.audio_idle.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
