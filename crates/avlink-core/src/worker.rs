//! Action worker: runs control operations (connecting, disconnecting) off the caller's
//! thread.
//!
//! Actions are queued through [`StreamController::submit`] and drained on a fixed tick.
//! What an action does is decided by the [`ActionHandler`] installed at start-up.

use std::thread::{self, JoinHandle};

use avlink_types::{MediaKind, PipelineState};

use crate::connector::Endpoint;
use crate::context::StreamController;
use crate::error::{Result, StreamError};
use crate::queue::HandoverQueue;
use crate::signal::StopSignal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Activate,
    Deactivate,
}

pub trait ActionHandler: Send {
    fn handle(&mut self, action: Action, controller: &StreamController);
}

/// Connects to a fixed endpoint on `Activate`, disconnects on `Deactivate`.
#[derive(Clone, Debug, Default)]
pub struct AutoConnect {
    pub endpoint: Option<Endpoint>,
    pub enable_audio: bool,
}

impl AutoConnect {
    pub fn new(endpoint: Endpoint, enable_audio: bool) -> Self {
        Self {
            endpoint: Some(endpoint),
            enable_audio,
        }
    }
}

impl ActionHandler for AutoConnect {
    fn handle(&mut self, action: Action, controller: &StreamController) {
        match action {
            Action::Activate => {
                let Some(endpoint) = &self.endpoint else {
                    tracing::debug!("no endpoint configured; nothing to activate");
                    return;
                };
                if controller.state(MediaKind::Video) != PipelineState::Idle {
                    tracing::debug!(endpoint = %endpoint, "video already active");
                    return;
                }
                if let Err(e) = controller.connect(endpoint, self.enable_audio) {
                    tracing::warn!(endpoint = %endpoint, error = %e, "auto-connect failed");
                }
            }
            Action::Deactivate => controller.disconnect(),
        }
    }
}

pub(crate) fn spawn(
    queue: HandoverQueue<Action>,
    mut handler: Box<dyn ActionHandler>,
    controller: StreamController,
    stop: StopSignal,
) -> Result<JoinHandle<()>> {
    let name = "action-worker".to_string();
    let interval = controller.config().worker_interval;
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            tracing::debug!("action worker started");
            loop {
                for action in queue.drain() {
                    tracing::debug!(action = ?action, "handling action");
                    handler.handle(action, &controller);
                }
                if stop.wait_timeout(interval) {
                    break;
                }
            }
            let dropped = queue.drain().len();
            if dropped > 0 {
                tracing::debug!(dropped, "discarding queued actions");
            }
            tracing::debug!("action worker stopped");
        })
        .map_err(|source| StreamError::Spawn { name, source })
}
