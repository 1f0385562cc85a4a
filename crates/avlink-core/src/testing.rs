//! Test doubles shared by the in-crate tests.

use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::connector::{Endpoint, StreamSocket};
use crate::decode::{
    AudioFrame, ChannelLayout, CodecKind, DecodedUnit, DecoderFactory, MediaDecoder,
    PixelFormat, VideoFrame,
};
use crate::error::{Result, StreamError};
use crate::sink::MediaSink;

type CreateLog = Arc<Mutex<Vec<(CodecKind, Option<Vec<u8>>)>>>;

/// Factory producing echo decoders and recording every creation.
///
/// Echo decoders turn the payload into a unit directly: video data is the payload bytes,
/// audio samples are the payload bytes as `f32`. Payloads starting with `bad` fail to decode.
#[derive(Clone, Default)]
pub struct ScriptedDecoders {
    created: CreateLog,
    video_codec: Option<CodecKind>,
    fail_create: bool,
}

impl ScriptedDecoders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `codec` from video decoders instead of H.264.
    pub fn with_video_codec(mut self, codec: CodecKind) -> Self {
        self.video_codec = Some(codec);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn created(&self) -> Vec<(CodecKind, Option<Vec<u8>>)> {
        self.created.lock().unwrap().clone()
    }
}

impl DecoderFactory for ScriptedDecoders {
    fn create(
        &mut self,
        codec: CodecKind,
        config: Option<&[u8]>,
    ) -> Result<Box<dyn MediaDecoder>> {
        self.created
            .lock()
            .unwrap()
            .push((codec, config.map(<[u8]>::to_vec)));
        if self.fail_create {
            return Err(StreamError::DecoderInitFailed("scripted failure".to_string()));
        }
        let reported = match codec {
            CodecKind::H264 => self.video_codec.unwrap_or(CodecKind::H264),
            CodecKind::Aac => CodecKind::Aac,
        };
        Ok(Box::new(EchoDecoder {
            kind: codec,
            reported,
            video: VideoFrame {
                timestamp: 0,
                width: 0,
                height: 1,
                format: PixelFormat::Rgba8,
                data: Vec::new(),
            },
            audio: AudioFrame::default(),
        }))
    }
}

struct EchoDecoder {
    kind: CodecKind,
    reported: CodecKind,
    video: VideoFrame,
    audio: AudioFrame,
}

impl MediaDecoder for EchoDecoder {
    fn codec(&self) -> CodecKind {
        self.reported
    }

    fn decode(&mut self, payload: &[u8], timestamp: u64) -> Result<Option<DecodedUnit<'_>>> {
        if payload.starts_with(b"bad") {
            return Err(StreamError::DecodeFailed("scripted bad payload".to_string()));
        }
        match self.kind {
            CodecKind::H264 => {
                self.video.timestamp = timestamp;
                self.video.width = payload.len() as u32;
                self.video.data = payload.to_vec();
                Ok(Some(DecodedUnit::Video(&self.video)))
            }
            CodecKind::Aac => {
                self.audio.timestamp = timestamp;
                self.audio.samples = payload.iter().map(|b| f32::from(*b)).collect();
                self.audio.frames = payload.len();
                self.audio.sample_rate = 48_000;
                self.audio.layout = ChannelLayout::Mono;
                Ok(Some(DecodedUnit::Audio(&self.audio)))
            }
        }
    }
}

/// Everything a [`RecordingSink`] has seen.
#[derive(Clone, Debug, Default)]
pub struct Recorded {
    pub video: Vec<(u64, Vec<u8>)>,
    pub audio: Vec<(u64, Vec<f32>)>,
    pub video_idle: usize,
    pub audio_idle: usize,
}

#[derive(Default)]
pub struct RecordingSink {
    inner: Mutex<Recorded>,
    cv: Condvar,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Recorded {
        self.inner.lock().unwrap().clone()
    }

    /// Block until `cond` holds or `timeout` passes. Returns whether it held.
    pub fn wait_for(&self, timeout: Duration, cond: impl Fn(&Recorded) -> bool) -> bool {
        let guard = self.inner.lock().unwrap();
        let (guard, _) = self
            .cv
            .wait_timeout_while(guard, timeout, |rec| !cond(rec))
            .unwrap();
        cond(&guard)
    }
}

impl MediaSink for RecordingSink {
    fn output_video(&self, frame: Option<&VideoFrame>) {
        let mut rec = self.inner.lock().unwrap();
        match frame {
            Some(f) => rec.video.push((f.timestamp, f.data.clone())),
            None => rec.video_idle += 1,
        }
        self.cv.notify_all();
    }

    fn output_audio(&self, frame: Option<&AudioFrame>) {
        let mut rec = self.inner.lock().unwrap();
        match frame {
            Some(f) => rec.audio.push((f.timestamp, f.samples.clone())),
            None => rec.audio_idle += 1,
        }
        self.cv.notify_all();
    }
}

/// Loopback stand-in for the streaming device.
pub fn device_listener() -> (TcpListener, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, Endpoint::new("127.0.0.1", port))
}

/// Connected pair: our side wrapped as a [`StreamSocket`], and the device side.
pub fn socket_pair() -> (StreamSocket, TcpStream) {
    let (listener, endpoint) = device_listener();
    let ours = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).unwrap();
    ours.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let (theirs, _) = listener.accept().unwrap();
    theirs
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    (StreamSocket::from_stream(ours), theirs)
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
