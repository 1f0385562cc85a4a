use std::time::Duration;

/// Socket options applied by the connector.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    /// Upper bound for the non-blocking connect.
    pub timeout: Duration,
    /// Read timeout on established sockets. Bounds how long a stalled peer can block a
    /// pipeline thread (and therefore shutdown).
    pub read_timeout: Option<Duration>,
    /// Requested `SO_RCVBUF` in bytes.
    pub recv_buffer_size: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            read_timeout: Some(Duration::from_secs(5)),
            recv_buffer_size: 64 * 1024,
        }
    }
}

/// Timing parameters shared by the pipelines and the action worker.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Idle tick: placeholder cadence and queue poll interval.
    pub idle_interval: Duration,
    /// How many idle ticks audio waits for video to reach `Running`.
    pub video_wait_attempts: u32,
    /// Action worker tick.
    pub worker_interval: Duration,
    pub connect: ConnectOptions,
}

impl Default for PipelineConfig {
    /// 10 ticks per second; audio gives up on video after about a second.
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(100),
            video_wait_attempts: 10,
            worker_interval: Duration::from_secs(1),
            connect: ConnectOptions::default(),
        }
    }
}
