//! Receiver runtime: wires the stream context to the stats sink and reports status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use avlink_core::connector;
use avlink_core::signal::StopSignal;
use avlink_core::{AutoConnect, StreamContext, StreamController};
use avlink_types::StreamStatus;
use serde::Serialize;

use crate::config::{ConnectConfig, PingConfig};
use crate::sink::{SinkStats, StatsSink};

/// One status line.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub stream: StreamStatus,
    pub sink: SinkStats,
}

/// Receive from the device until Ctrl-C or the configured duration elapses.
pub fn run_connect(config: ConnectConfig, install_ctrlc: bool) -> Result<()> {
    let stop = StopSignal::new();
    if install_ctrlc {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.set()).context("install Ctrl-C handler")?;
    }
    run_until(config, &stop)
}

/// Same as [`run_connect`] with an externally owned stop signal.
pub fn run_until(config: ConnectConfig, stop: &StopSignal) -> Result<()> {
    tracing::info!(
        endpoint = %config.endpoint,
        audio = config.enable_audio,
        "starting receiver"
    );

    let sink = Arc::new(StatsSink::default());
    let ctx = StreamContext::start(
        config.pipeline.clone(),
        sink.clone(),
        Box::new(AutoConnect::new(config.endpoint.clone(), config.enable_audio)),
    )
    .context("start stream context")?;

    let deadline = config.duration.map(|d| Instant::now() + d);
    loop {
        let wait = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    tracing::info!("duration elapsed");
                    break;
                }
                left.min(config.status_interval)
            }
            None => config.status_interval,
        };
        if stop.wait_timeout(wait) {
            tracing::info!("stop requested");
            break;
        }
        log_status(ctx.controller(), &sink);
    }

    ctx.shutdown();
    log_status_final(&sink);
    Ok(())
}

pub fn status_report(controller: &StreamController, sink: &StatsSink) -> StatusReport {
    StatusReport {
        stream: controller.status(),
        sink: sink.snapshot(),
    }
}

fn log_status(controller: &StreamController, sink: &StatsSink) {
    let report = status_report(controller, sink);
    match serde_json::to_string(&report) {
        Ok(line) => tracing::info!(status = %line, "status"),
        Err(e) => tracing::warn!(error = %e, "failed to serialize status"),
    }
}

fn log_status_final(sink: &StatsSink) {
    let stats = sink.snapshot();
    tracing::info!(
        video_frames = stats.video_frames,
        audio_frames = stats.audio_frames,
        "receiver stopped"
    );
}

/// Connect, run the liveness check and report the round trip.
pub fn run_ping(config: PingConfig) -> Result<()> {
    let started = Instant::now();
    let socket = connector::connect_and_ping(&config.endpoint, &config.connect)
        .with_context(|| format!("ping {}", config.endpoint))?;
    let elapsed = started.elapsed();
    socket.close();

    let elapsed_ms = whole_millis(elapsed);
    tracing::info!(endpoint = %config.endpoint, elapsed_ms, "pong");
    println!("pong from {} in {} ms", config.endpoint, elapsed_ms);
    Ok(())
}

fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
