//! avlink-receiver: connects to a streaming device, decodes its video and audio streams
//! and reports what arrives.
//!
//! - `connect`: start both pipelines, auto-connect to the device, log a JSON status line
//!   periodically until Ctrl-C or `--duration-secs`.
//! - `ping`: connect and run the liveness check only.

use anyhow::Result;
use avlink_receiver::cli::{Args, Command};
use avlink_receiver::config::{self, ConnectArgs, ConnectFlags, ReceiverConfig};
use avlink_receiver::runtime;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,avlink_core=info")),
        )
        .init();

    let file = match args.config.as_deref() {
        Some(path) => ReceiverConfig::load(path)?,
        None => ReceiverConfig::default(),
    };
    let flags = ConnectFlags {
        connect_timeout_ms: args.connect_timeout_ms,
        read_timeout_ms: args.read_timeout_ms,
    };

    match args.cmd {
        Command::Connect {
            host,
            port,
            no_audio,
            duration_secs,
            status_interval_secs,
        } => {
            let config = config::resolve_connect(
                &file,
                flags,
                ConnectArgs {
                    host,
                    port,
                    no_audio,
                    duration_secs,
                    status_interval_secs,
                },
            )?;
            runtime::run_connect(config, true)
        }
        Command::Ping { host, port } => {
            let config = config::resolve_ping(&file, flags, host, port)?;
            runtime::run_ping(config)
        }
    }
}
