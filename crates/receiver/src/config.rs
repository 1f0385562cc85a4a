//! Receiver configuration: optional TOML file merged with command-line flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use avlink_core::Endpoint;
use avlink_core::config::{ConnectOptions, PipelineConfig};
use serde::Deserialize;

/// Default port the streaming device listens on.
pub const DEFAULT_PORT: u16 = 4747;

const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration file schema. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverConfig {
    /// Device host name or address.
    pub host: Option<String>,
    /// Device port.
    pub port: Option<u16>,
    /// Open the audio stream alongside video (default: true).
    pub audio: Option<bool>,
    pub connect_timeout_ms: Option<u64>,
    /// Read timeout in milliseconds; 0 disables it.
    pub read_timeout_ms: Option<u64>,
    pub recv_buffer_bytes: Option<usize>,
    /// Pipeline idle tick in milliseconds.
    pub idle_interval_ms: Option<u64>,
    /// Idle ticks audio waits for video before giving up.
    pub video_wait_attempts: Option<u32>,
    pub status_interval_secs: Option<u64>,
}

impl ReceiverConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<ReceiverConfig>(raw)?)
    }
}

/// Socket-level flags shared by every subcommand.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectFlags {
    pub connect_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
}

/// Settings for `connect`.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub endpoint: Endpoint,
    pub enable_audio: bool,
    pub pipeline: PipelineConfig,
    pub duration: Option<Duration>,
    pub status_interval: Duration,
}

/// Settings for `ping`.
#[derive(Debug, Clone)]
pub struct PingConfig {
    pub endpoint: Endpoint,
    pub connect: ConnectOptions,
}

/// Command-line values for `connect`, before merging.
#[derive(Debug, Default)]
pub struct ConnectArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_audio: bool,
    pub duration_secs: Option<u64>,
    pub status_interval_secs: Option<u64>,
}

pub fn resolve_connect(
    file: &ReceiverConfig,
    flags: ConnectFlags,
    args: ConnectArgs,
) -> Result<ConnectConfig> {
    let endpoint = resolve_endpoint(file, args.host, args.port)?;

    let defaults = PipelineConfig::default();
    let pipeline = PipelineConfig {
        idle_interval: file
            .idle_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.idle_interval),
        video_wait_attempts: file
            .video_wait_attempts
            .unwrap_or(defaults.video_wait_attempts),
        connect: resolve_connect_options(file, flags),
        ..defaults
    };

    let status_interval = args
        .status_interval_secs
        .or(file.status_interval_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_STATUS_INTERVAL);
    if status_interval.is_zero() {
        return Err(anyhow!("status interval must be at least one second"));
    }

    Ok(ConnectConfig {
        endpoint,
        enable_audio: !args.no_audio && file.audio.unwrap_or(true),
        pipeline,
        duration: args.duration_secs.map(Duration::from_secs),
        status_interval,
    })
}

pub fn resolve_ping(
    file: &ReceiverConfig,
    flags: ConnectFlags,
    host: Option<String>,
    port: Option<u16>,
) -> Result<PingConfig> {
    Ok(PingConfig {
        endpoint: resolve_endpoint(file, host, port)?,
        connect: resolve_connect_options(file, flags),
    })
}

fn resolve_endpoint(
    file: &ReceiverConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<Endpoint> {
    let host = host
        .or_else(|| file.host.clone())
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| anyhow!("device host is required (--host or `host` in config)"))?;
    let port = port.or(file.port).unwrap_or(DEFAULT_PORT);
    Ok(Endpoint::new(host.trim(), port))
}

fn resolve_connect_options(file: &ReceiverConfig, flags: ConnectFlags) -> ConnectOptions {
    let defaults = ConnectOptions::default();
    let read_timeout = match flags.read_timeout_ms.or(file.read_timeout_ms) {
        Some(0) => None,
        Some(ms) => Some(Duration::from_millis(ms)),
        None => defaults.read_timeout,
    };
    ConnectOptions {
        timeout: flags
            .connect_timeout_ms
            .or(file.connect_timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout),
        read_timeout,
        recv_buffer_size: file.recv_buffer_bytes.unwrap_or(defaults.recv_buffer_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let cfg = ReceiverConfig::parse(
            r#"
            host = "10.0.0.7"
            port = 5000
            audio = false
            connect_timeout_ms = 1500
            read_timeout_ms = 0
            recv_buffer_bytes = 131072
            idle_interval_ms = 50
            video_wait_attempts = 20
            status_interval_secs = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.host.as_deref(), Some("10.0.0.7"));
        assert_eq!(cfg.video_wait_attempts, Some(20));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(ReceiverConfig::parse("hots = \"x\"").is_err());
    }

    #[test]
    fn defaults_apply_without_file() {
        let cfg = resolve_connect(
            &ReceiverConfig::default(),
            ConnectFlags::default(),
            ConnectArgs {
                host: Some("phone.local".to_string()),
                ..ConnectArgs::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.endpoint, Endpoint::new("phone.local", DEFAULT_PORT));
        assert!(cfg.enable_audio);
        assert_eq!(cfg.pipeline.idle_interval, Duration::from_millis(100));
        assert_eq!(cfg.pipeline.video_wait_attempts, 10);
        assert_eq!(cfg.pipeline.connect.timeout, Duration::from_secs(2));
        assert_eq!(cfg.pipeline.connect.recv_buffer_size, 64 * 1024);
        assert_eq!(cfg.status_interval, DEFAULT_STATUS_INTERVAL);
        assert_eq!(cfg.duration, None);
    }

    #[test]
    fn flags_override_file() {
        let file = ReceiverConfig::parse(
            r#"
            host = "from-file"
            port = 5000
            connect_timeout_ms = 1500
            read_timeout_ms = 0
            idle_interval_ms = 50
            "#,
        )
        .unwrap();
        let cfg = resolve_connect(
            &file,
            ConnectFlags {
                connect_timeout_ms: Some(250),
                read_timeout_ms: None,
            },
            ConnectArgs {
                host: Some("from-flag".to_string()),
                no_audio: true,
                duration_secs: Some(3),
                ..ConnectArgs::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.endpoint, Endpoint::new("from-flag", 5000));
        assert!(!cfg.enable_audio);
        assert_eq!(cfg.pipeline.connect.timeout, Duration::from_millis(250));
        assert_eq!(cfg.pipeline.connect.read_timeout, None);
        assert_eq!(cfg.pipeline.idle_interval, Duration::from_millis(50));
        assert_eq!(cfg.duration, Some(Duration::from_secs(3)));
    }

    #[test]
    fn host_is_required() {
        let err = resolve_ping(&ReceiverConfig::default(), ConnectFlags::default(), None, None)
            .unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn zero_status_interval_is_rejected() {
        let err = resolve_connect(
            &ReceiverConfig::default(),
            ConnectFlags::default(),
            ConnectArgs {
                host: Some("h".to_string()),
                status_interval_secs: Some(0),
                ..ConnectArgs::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("status interval"));
    }
}
