//! Media pipelines: one thread per media kind owning a socket, a frame reader and a decoder.
//!
//! ```text
//! Idle ──socket──▶ Starting ──request sent──▶ Running
//!  ▲                  │                          │
//!  └──gate/send fail──┘◀──read/decode error, disconnect
//! ```
//!
//! Idle ticks emit a `None` placeholder to the sink and poll the handover queue. The queue
//! is also polled after every frame so a socket arriving while a stream is running can be
//! closed straight away.

mod gate;

pub use gate::StartGate;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use avlink_proto::{AUDIO_REQUEST, VIDEO_REQUEST, read_frame_into};
use avlink_types::{MediaKind, PipelineState, StreamEndReason};

use crate::config::PipelineConfig;
use crate::connector::StreamSocket;
use crate::decode::{CodecKind, DecoderAdapter, DecoderFactory};
use crate::error::{Result, StreamError};
use crate::queue::HandoverQueue;
use crate::signal::StopSignal;
use crate::sink::{self, MediaSink};
use crate::status::PipelineShared;

/// Everything a pipeline thread takes ownership of.
pub(crate) struct PipelineParts {
    pub(crate) kind: MediaKind,
    pub(crate) config: PipelineConfig,
    pub(crate) queue: HandoverQueue<StreamSocket>,
    pub(crate) shared: Arc<PipelineShared>,
    pub(crate) factory: Box<dyn DecoderFactory>,
    pub(crate) sink: Arc<dyn MediaSink>,
    pub(crate) gate: Option<StartGate>,
    pub(crate) stop: StopSignal,
}

/// Start the pipeline thread. The decoder is created on that thread.
pub(crate) fn spawn(parts: PipelineParts) -> Result<JoinHandle<()>> {
    let name = format!("{}-pipeline", parts.kind);
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || MediaPipeline::new(parts).run())
        .map_err(|source| StreamError::Spawn { name, source })
}

/// Start request sent once a socket is accepted.
pub fn start_request(kind: MediaKind) -> &'static [u8] {
    match kind {
        MediaKind::Video => VIDEO_REQUEST,
        MediaKind::Audio => AUDIO_REQUEST,
    }
}

struct MediaPipeline {
    kind: MediaKind,
    config: PipelineConfig,
    queue: HandoverQueue<StreamSocket>,
    shared: Arc<PipelineShared>,
    adapter: DecoderAdapter,
    sink: Arc<dyn MediaSink>,
    gate: Option<StartGate>,
    stop: StopSignal,
    active: Option<StreamSocket>,
    codec: Option<CodecKind>,
}

impl MediaPipeline {
    fn new(parts: PipelineParts) -> Self {
        Self {
            kind: parts.kind,
            config: parts.config,
            queue: parts.queue,
            shared: parts.shared,
            adapter: DecoderAdapter::new(parts.kind, parts.factory),
            sink: parts.sink,
            gate: parts.gate,
            stop: parts.stop,
            active: None,
            codec: None,
        }
    }

    fn run(mut self) {
        tracing::info!(kind = %self.kind, "pipeline started");

        while !self.stop.is_set() {
            if self.shared.take_disconnect() && self.active.is_some() {
                self.end_stream(StreamEndReason::Disconnected);
            }

            if self.active.is_some() {
                if let Err(e) = self.step() {
                    self.fail(e);
                    continue;
                }
            } else {
                self.emit_idle();
                if self.stop.wait_timeout(self.config.idle_interval) {
                    break;
                }
            }

            if let Some(socket) = self.queue.try_pop() {
                self.accept(socket);
            }
        }

        self.teardown();
    }

    /// Read one frame, decode it and hand the result to the sink.
    fn step(&mut self) -> Result<()> {
        self.adapter.prepare()?;
        self.sync_codec();

        let Some(socket) = self.active.as_mut() else {
            return Ok(());
        };
        let info = read_frame_into(socket, self.adapter.packet_buffer())?;
        self.shared.record_frame(info.len);

        if let Some(unit) = self.adapter.decode(&info)? {
            sink::emit(self.sink.as_ref(), unit);
            self.shared.record_unit();
        }
        self.sync_codec();
        Ok(())
    }

    fn accept(&mut self, socket: StreamSocket) {
        // A disconnect requested before this handover frees the slot for it.
        if self.active.is_some() && self.shared.take_disconnect() {
            self.end_stream(StreamEndReason::Disconnected);
        }

        if self.active.is_some() {
            tracing::warn!(
                kind = %self.kind,
                peer = %socket,
                "stream already running; closing new socket"
            );
            self.shared.record_rejected();
            socket.close();
            return;
        }

        self.shared.set_state(PipelineState::Starting);

        let admitted = self.gate.as_ref().is_none_or(|gate| gate.wait(&self.stop));
        if !admitted {
            let reason = if self.stop.is_set() {
                StreamEndReason::Shutdown
            } else {
                tracing::warn!(kind = %self.kind, peer = %socket, "video not running; dropping socket");
                StreamEndReason::VideoNotRunning
            };
            self.abort_start(socket, reason);
            return;
        }

        let mut socket = socket;
        if let Err(e) = socket.send_all(start_request(self.kind)) {
            tracing::warn!(kind = %self.kind, peer = %socket, error = %e, "failed to send start request");
            self.abort_start(socket, StreamEndReason::StartFailed);
            return;
        }

        tracing::info!(kind = %self.kind, peer = %socket, "stream started");
        self.active = Some(socket);
        self.shared.record_started();
        self.shared.set_state(PipelineState::Running);
    }

    fn abort_start(&mut self, socket: StreamSocket, reason: StreamEndReason) {
        socket.close();
        self.shared.record_end(reason);
        self.shared.set_state(PipelineState::Idle);
    }

    fn fail(&mut self, err: StreamError) {
        if err.is_decoder_error() {
            self.adapter.invalidate();
            self.sync_codec();
        }

        if self.shared.take_disconnect() {
            self.end_stream(StreamEndReason::Disconnected);
            return;
        }

        let reason = err.end_reason();
        match reason {
            StreamEndReason::ConnectionClosed => {
                tracing::info!(kind = %self.kind, error = %err, "stream closed")
            }
            _ => tracing::warn!(kind = %self.kind, error = %err, "stream failed"),
        }
        self.end_stream(reason);
    }

    /// Close the active socket and go back to idle.
    fn end_stream(&mut self, reason: StreamEndReason) {
        if let Some(socket) = self.active.take() {
            tracing::info!(kind = %self.kind, peer = %socket, reason = ?reason, "stream ended");
            socket.close();
        }
        self.shared.record_end(reason);
        self.shared.set_state(PipelineState::Idle);
    }

    fn emit_idle(&self) {
        match self.kind {
            MediaKind::Video => self.sink.output_video(None),
            MediaKind::Audio => self.sink.output_audio(None),
        }
    }

    fn sync_codec(&mut self) {
        let codec = self.adapter.active_codec();
        if codec != self.codec {
            self.codec = codec;
            self.shared.set_codec(codec.map(|c| c.as_str()));
        }
    }

    fn teardown(&mut self) {
        if self.active.is_some() {
            self.end_stream(StreamEndReason::Shutdown);
        }
        self.shared.set_state(PipelineState::Idle);

        for socket in self.queue.drain() {
            tracing::debug!(kind = %self.kind, peer = %socket, "closing pending socket");
            socket.close();
        }

        self.adapter.shutdown();
        self.sync_codec();
        tracing::info!(kind = %self.kind, "pipeline stopped");
    }
}
