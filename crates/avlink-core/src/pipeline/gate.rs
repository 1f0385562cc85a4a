use std::time::Duration;

use crate::signal::StopSignal;
use crate::status::PipelineMonitor;

/// Holds the audio pipeline back until video is running.
#[derive(Clone, Debug)]
pub struct StartGate {
    video: PipelineMonitor,
    interval: Duration,
    attempts: u32,
}

impl StartGate {
    pub fn new(video: PipelineMonitor, interval: Duration, attempts: u32) -> Self {
        Self {
            video,
            interval,
            attempts,
        }
    }

    /// Poll the video pipeline every `interval`, at most `attempts` times.
    ///
    /// Returns `false` when video did not reach `Running` in time or `stop` was set.
    pub fn wait(&self, stop: &StopSignal) -> bool {
        let mut waited = 0u32;
        while !self.video.is_running() {
            if waited >= self.attempts {
                return false;
            }
            if stop.wait_timeout(self.interval) {
                return false;
            }
            waited += 1;
        }
        true
    }
}
