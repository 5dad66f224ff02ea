//! Runtime types exchanged with the projection platform.
//!
//! These types describe live platform objects and are not part of the wire
//! format. For serializable request types, see castkit-common.

use castkit_common::{
    AudioEncoder, AudioSource, NormalizedRequest, OutputFormat, VideoEncoder, VideoSource,
    VirtualDisplayFlags,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Opaque capture grant produced by the permission flow.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantToken {
    /// Platform result code returned by the permission UI
    pub result_code: i32,
    /// Caller-level intent payload handed back by the permission UI
    pub intent: serde_json::Value,
}

impl GrantToken {
    pub fn new(result_code: i32, intent: serde_json::Value) -> Self {
        Self {
            result_code,
            intent,
        }
    }
}

/// Current resolution and density of the display being projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMetrics {
    pub width: u32,
    pub height: u32,
    pub density_dpi: u32,
}

/// Opaque handle to the recorder's input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Video track settings pushed to the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTrackSettings {
    pub source: VideoSource,
    pub encoder: VideoEncoder,
    pub width: u32,
    pub height: u32,
    pub bitrate: u32,
    pub fps: u32,
}

/// Complete recorder configuration for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSettings {
    pub audio_source: AudioSource,
    pub audio_encoder: AudioEncoder,
    pub audio_bitrate: u32,
    pub audio_channels: u8,
    pub audio_sample_rate: u32,
    /// None for audio-only sessions
    pub video: Option<VideoTrackSettings>,
    pub format: OutputFormat,
    pub max_duration: Option<Duration>,
    pub max_file_size: Option<u64>,
    pub output_path: PathBuf,
}

impl RecorderSettings {
    /// Build recorder settings from a normalized request and the resolved
    /// display geometry.
    pub fn new(
        request: &NormalizedRequest,
        display: Option<&DisplayMetrics>,
        output_path: PathBuf,
    ) -> Self {
        let video = match (request.video(), display) {
            (Some(video), Some(display)) => Some(VideoTrackSettings {
                source: video.source(),
                encoder: video.encoder(),
                width: display.width,
                height: display.height,
                bitrate: video.bitrate(),
                fps: video.fps(),
            }),
            _ => None,
        };
        let audio = request.audio();
        Self {
            audio_source: audio.source(),
            audio_encoder: audio.encoder(),
            audio_bitrate: audio.bitrate(),
            audio_channels: audio.channels(),
            audio_sample_rate: audio.sample_rate(),
            video,
            format: request.format(),
            max_duration: request.max_duration(),
            max_file_size: request.max_file_size(),
            output_path,
        }
    }
}

/// Parameters for the virtual display the platform composites onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDisplaySpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub density_dpi: u32,
    pub flags: VirtualDisplayFlags,
}

/// Which resource limit fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    MaxDuration,
    MaxFileSize,
}

/// Asynchronous notification that ends or affects the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The platform revoked the capture grant
    GrantRevoked,
    /// The recorder failed while encoding
    RecorderError { code: i32, detail: String },
    /// A duration or file size limit was reached
    LimitReached(LimitKind),
}

/// Handle the platform and the limit triggers use to notify a session.
///
/// Each session gets its own channel; signals sent after the session ended
/// are dropped.
#[derive(Debug, Clone)]
pub struct SignalSender {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionSignal>,
}

impl SignalSender {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<SessionSignal>) -> Self {
        Self { generation, tx }
    }

    /// Session generation this sender belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver a signal. Returns false if the session is already gone.
    pub fn send(&self, signal: SessionSignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}
