use std::path::PathBuf;

use clap::{Parser, Subcommand};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "avlink-receiver", version = VERSION)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Optional TOML config file; command-line flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Upper bound for establishing a connection, in milliseconds
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Read timeout on established streams, in milliseconds (0 disables it)
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a device and receive its streams until interrupted
    Connect {
        /// Device host name or address
        #[arg(long)]
        host: Option<String>,

        /// Device port
        #[arg(long)]
        port: Option<u16>,

        /// Receive video only
        #[arg(long)]
        no_audio: bool,

        /// Stop after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Interval between status lines, in seconds
        #[arg(long)]
        status_interval_secs: Option<u64>,
    },

    /// Check that a device answers the liveness check
    Ping {
        /// Device host name or address
        #[arg(long)]
        host: Option<String>,

        /// Device port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connect_with_flags() {
        let args = Args::try_parse_from([
            "avlink-receiver",
            "--connect-timeout-ms",
            "500",
            "connect",
            "--host",
            "192.168.1.20",
            "--port",
            "4747",
            "--no-audio",
            "--duration-secs",
            "10",
        ])
        .unwrap();
        assert_eq!(args.connect_timeout_ms, Some(500));
        match args.cmd {
            Command::Connect {
                host,
                port,
                no_audio,
                duration_secs,
                status_interval_secs,
            } => {
                assert_eq!(host.as_deref(), Some("192.168.1.20"));
                assert_eq!(port, Some(4747));
                assert!(no_audio);
                assert_eq!(duration_secs, Some(10));
                assert_eq!(status_interval_secs, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn version_carries_revision_and_build_date() {
        assert!(VERSION.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(VERSION.contains(env!("GIT_SHA")));
        // Build date is a plain calendar date.
        let date = env!("BUILD_DATE");
        assert_eq!(date.len(), 10, "{date}");
        assert_eq!(date.matches('-').count(), 2, "{date}");
    }

    #[test]
    fn parses_ping() {
        let args =
            Args::try_parse_from(["avlink-receiver", "ping", "--host", "localhost"]).unwrap();
        assert!(matches!(args.cmd, Command::Ping { port: None, .. }));
    }
}
