use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use avlink_types::{MediaKind, PipelineState, PipelineStatus, StreamEndReason};

/// Counters and state written by one pipeline thread.
#[derive(Debug)]
pub(crate) struct PipelineShared {
    kind: MediaKind,
    state: AtomicU8,
    disconnect: AtomicBool,
    streams_started: AtomicU64,
    frames_read: AtomicU64,
    bytes_read: AtomicU64,
    units_emitted: AtomicU64,
    sockets_rejected: AtomicU64,
    codec: Mutex<Option<&'static str>>,
    last_end: Mutex<Option<StreamEndReason>>,
}

impl PipelineShared {
    pub(crate) fn new(kind: MediaKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: AtomicU8::new(PipelineState::Idle.as_u8()),
            disconnect: AtomicBool::new(false),
            streams_started: AtomicU64::new(0),
            frames_read: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            units_emitted: AtomicU64::new(0),
            sockets_rejected: AtomicU64::new(0),
            codec: Mutex::new(None),
            last_end: Mutex::new(None),
        })
    }

    pub(crate) fn set_state(&self, state: PipelineState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Ask the pipeline thread to drop its active stream.
    pub(crate) fn request_disconnect(&self) {
        self.disconnect.store(true, Ordering::Release);
    }

    /// Consume a pending disconnect request.
    pub(crate) fn take_disconnect(&self) -> bool {
        self.disconnect.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn record_started(&self) {
        self.streams_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_frame(&self, bytes: usize) {
        self.frames_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_unit(&self) {
        self.units_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.sockets_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_codec(&self, codec: Option<&'static str>) {
        *self.codec.lock().unwrap_or_else(PoisonError::into_inner) = codec;
    }

    pub(crate) fn record_end(&self, reason: StreamEndReason) {
        *self.last_end.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason);
    }

    fn snapshot(&self) -> PipelineStatus {
        PipelineStatus {
            state: self.state(),
            streams_started: self.streams_started.load(Ordering::Relaxed),
            frames_read: self.frames_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            units_emitted: self.units_emitted.load(Ordering::Relaxed),
            sockets_rejected: self.sockets_rejected.load(Ordering::Relaxed),
            codec: (*self.codec.lock().unwrap_or_else(PoisonError::into_inner))
                .map(str::to_string),
            last_end: *self.last_end.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Read-only view of a pipeline, safe to hand to any thread.
#[derive(Clone, Debug)]
pub struct PipelineMonitor {
    shared: Arc<PipelineShared>,
}

impl PipelineMonitor {
    pub(crate) fn new(shared: Arc<PipelineShared>) -> Self {
        Self { shared }
    }

    pub fn kind(&self) -> MediaKind {
        self.shared.kind
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == PipelineState::Running
    }

    pub fn snapshot(&self) -> PipelineStatus {
        self.shared.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_reflects_writer_updates() {
        let shared = PipelineShared::new(MediaKind::Video);
        let monitor = PipelineMonitor::new(shared.clone());
        assert_eq!(monitor.state(), PipelineState::Idle);

        shared.set_state(PipelineState::Running);
        shared.record_started();
        shared.record_frame(100);
        shared.record_frame(50);
        shared.record_unit();
        shared.record_rejected();
        shared.set_codec(Some("h264"));
        shared.record_end(StreamEndReason::ProtocolError);

        assert!(monitor.is_running());
        let snap = monitor.snapshot();
        assert_eq!(snap.streams_started, 1);
        assert_eq!(snap.frames_read, 2);
        assert_eq!(snap.bytes_read, 150);
        assert_eq!(snap.units_emitted, 1);
        assert_eq!(snap.sockets_rejected, 1);
        assert_eq!(snap.codec.as_deref(), Some("h264"));
        assert_eq!(snap.last_end, Some(StreamEndReason::ProtocolError));
        assert_eq!(monitor.kind(), MediaKind::Video);
    }

    #[test]
    fn disconnect_request_is_consumed_once() {
        let shared = PipelineShared::new(MediaKind::Audio);
        assert!(!shared.take_disconnect());
        shared.request_disconnect();
        assert!(shared.take_disconnect());
        assert!(!shared.take_disconnect());
    }
}
