//! Stream context: owns the pipeline and worker threads and hands out controllers.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use avlink_types::{MediaKind, PipelineState, StreamStatus};

use crate::config::PipelineConfig;
use crate::connector::{self, Endpoint, StreamSocket};
use crate::decode::{DecoderFactory, DefaultDecoders};
use crate::error::Result;
use crate::pipeline::{self, PipelineParts, StartGate};
use crate::queue::{HandoverQueue, HandoverSender};
use crate::signal::StopSignal;
use crate::sink::MediaSink;
use crate::status::{PipelineMonitor, PipelineShared};
use crate::worker::{self, Action, ActionHandler};

/// Cloneable handle for driving the pipelines from any thread.
#[derive(Clone)]
pub struct StreamController {
    config: Arc<PipelineConfig>,
    video_tx: HandoverSender<StreamSocket>,
    audio_tx: HandoverSender<StreamSocket>,
    actions: HandoverSender<Action>,
    video: Arc<PipelineShared>,
    audio: Arc<PipelineShared>,
    started: Instant,
}

impl StreamController {
    /// Open the video connection (and the audio one when enabled) and hand them over.
    ///
    /// A video failure is returned; an audio failure only costs the audio stream.
    pub fn connect(&self, endpoint: &Endpoint, enable_audio: bool) -> Result<()> {
        let video = connector::connect(endpoint, &self.config.connect)?;
        self.handover(MediaKind::Video, video);

        if enable_audio {
            match connector::connect(endpoint, &self.config.connect) {
                Ok(audio) => self.handover(MediaKind::Audio, audio),
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "audio connect failed");
                }
            }
        }
        Ok(())
    }

    /// Queue `socket` for the pipeline of `kind`.
    pub fn handover(&self, kind: MediaKind, socket: StreamSocket) {
        let tx = match kind {
            MediaKind::Video => &self.video_tx,
            MediaKind::Audio => &self.audio_tx,
        };
        if let Err(socket) = tx.push(socket) {
            tracing::warn!(kind = %kind, peer = %socket, "pipeline stopped; closing socket");
            socket.close();
        }
    }

    /// Ask both pipelines to close their active streams.
    pub fn disconnect(&self) {
        self.video.request_disconnect();
        self.audio.request_disconnect();
    }

    pub fn submit(&self, action: Action) {
        if self.actions.push(action).is_err() {
            tracing::debug!(action = ?action, "action worker stopped; dropping action");
        }
    }

    pub fn state(&self, kind: MediaKind) -> PipelineState {
        self.monitor(kind).state()
    }

    pub fn monitor(&self, kind: MediaKind) -> PipelineMonitor {
        match kind {
            MediaKind::Video => PipelineMonitor::new(self.video.clone()),
            MediaKind::Audio => PipelineMonitor::new(self.audio.clone()),
        }
    }

    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            video: self.monitor(MediaKind::Video).snapshot(),
            audio: self.monitor(MediaKind::Audio).snapshot(),
            uptime_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Owns the video pipeline, the audio pipeline and the action worker.
///
/// Dropping the context stops and joins all three threads.
pub struct StreamContext {
    controller: StreamController,
    stop: StopSignal,
    threads: Vec<JoinHandle<()>>,
}

impl StreamContext {
    /// Start with the default openh264 / symphonia decoders.
    pub fn start(
        config: PipelineConfig,
        sink: Arc<dyn MediaSink>,
        handler: Box<dyn ActionHandler>,
    ) -> Result<Self> {
        Self::start_with_decoders(
            config,
            sink,
            Box::new(DefaultDecoders),
            Box::new(DefaultDecoders),
            handler,
        )
    }

    /// Start all threads and submit an initial [`Action::Activate`].
    pub fn start_with_decoders(
        config: PipelineConfig,
        sink: Arc<dyn MediaSink>,
        video_decoders: Box<dyn DecoderFactory>,
        audio_decoders: Box<dyn DecoderFactory>,
        handler: Box<dyn ActionHandler>,
    ) -> Result<Self> {
        let video_queue = HandoverQueue::new();
        let audio_queue = HandoverQueue::new();
        let action_queue = HandoverQueue::new();
        let video = PipelineShared::new(MediaKind::Video);
        let audio = PipelineShared::new(MediaKind::Audio);
        let stop = StopSignal::new();

        let controller = StreamController {
            config: Arc::new(config.clone()),
            video_tx: video_queue.sender(),
            audio_tx: audio_queue.sender(),
            actions: action_queue.sender(),
            video: video.clone(),
            audio: audio.clone(),
            started: Instant::now(),
        };

        // On a spawn failure the partially started context is dropped, which stops and
        // joins whatever already runs.
        let mut ctx = Self {
            controller: controller.clone(),
            stop: stop.clone(),
            threads: Vec::with_capacity(3),
        };

        let gate = StartGate::new(
            PipelineMonitor::new(video.clone()),
            config.idle_interval,
            config.video_wait_attempts,
        );

        ctx.threads.push(pipeline::spawn(PipelineParts {
            kind: MediaKind::Video,
            config: config.clone(),
            queue: video_queue,
            shared: video,
            factory: video_decoders,
            sink: sink.clone(),
            gate: None,
            stop: stop.clone(),
        })?);
        ctx.threads.push(pipeline::spawn(PipelineParts {
            kind: MediaKind::Audio,
            config,
            queue: audio_queue,
            shared: audio,
            factory: audio_decoders,
            sink,
            gate: Some(gate),
            stop: stop.clone(),
        })?);

        action_queue.push(Action::Activate);
        ctx.threads
            .push(worker::spawn(action_queue, handler, controller, stop)?);

        tracing::info!("stream context started");
        Ok(ctx)
    }

    pub fn controller(&self) -> &StreamController {
        &self.controller
    }

    /// Stop all threads and wait for them to exit.
    pub fn shutdown(mut self) {
        self.stop_threads();
    }

    fn stop_threads(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        self.stop.set();
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
            if handle.join().is_err() {
                tracing::error!(thread = %name, "thread panicked");
            }
        }
        tracing::info!("stream context stopped");
    }
}

impl Drop for StreamContext {
    fn drop(&mut self) {
        self.stop_threads();
    }
}
