//! Recording request types.
//!
//! A [`MediaProjectionRequest`] is what the caller asks for. It is never
//! mutated; the `with_*` helpers return a new request with one field
//! overridden. The validator turns it into a [`NormalizedRequest`], the only
//! form the capture session accepts.

use crate::catalog::{AudioEncoder, AudioSource, OutputFormat, VideoEncoder, VideoSource};
use crate::display_flags::VirtualDisplayFlags;
use crate::validation::ValidationWarning;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Frame rate used when the caller does not pick one.
pub const DEFAULT_FPS: i32 = 30;

/// Video half of a recording request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecordingProps {
    pub source: VideoSource,
    /// None lets the container pick its default video encoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<VideoEncoder>,
    /// Capture width in pixels. None means the live display width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    /// Capture height in pixels. None means the live display height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    pub format: OutputFormat,
    /// Virtual display density. None means the live display density.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_dpi: Option<i32>,
    /// Bits per second. None means the encoder's recommended rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<i32>,
    pub fps: i32,
    #[serde(default)]
    pub display_flags: VirtualDisplayFlags,
}

impl Default for VideoRecordingProps {
    fn default() -> Self {
        Self {
            source: VideoSource::Surface,
            encoder: None,
            width: None,
            height: None,
            format: OutputFormat::Mpeg4,
            density_dpi: None,
            bitrate: None,
            fps: DEFAULT_FPS,
            display_flags: VirtualDisplayFlags::default(),
        }
    }
}

/// Audio half of a recording request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRecordingProps {
    pub source: AudioSource,
    /// None lets the container pick its default audio encoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<AudioEncoder>,
    /// Bits per second. None means the encoder's recommended rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<i32>,
    pub format: OutputFormat,
    /// 1 (mono) or 2 (stereo). None means the encoder's recommendation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<i32>,
    /// Hz. None means the encoder's recommended rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<i32>,
}

impl Default for AudioRecordingProps {
    fn default() -> Self {
        Self {
            source: AudioSource::Mic,
            encoder: None,
            bitrate: None,
            format: OutputFormat::Mpeg4,
            channels: None,
            sample_rate: None,
        }
    }
}

/// Top-level capture configuration as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaProjectionRequest {
    #[serde(default)]
    pub audio_only: bool,
    #[serde(default)]
    pub video: VideoRecordingProps,
    #[serde(default)]
    pub audio: AudioRecordingProps,
    /// Directory for the output file. None means the service cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,
    /// File name. None means a timestamped name is synthesized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size_bytes: Option<i64>,
}

impl MediaProjectionRequest {
    pub fn with_audio_only(self, audio_only: bool) -> Self {
        Self { audio_only, ..self }
    }

    pub fn with_video(self, video: VideoRecordingProps) -> Self {
        Self { video, ..self }
    }

    pub fn with_audio(self, audio: AudioRecordingProps) -> Self {
        Self { audio, ..self }
    }

    pub fn with_output_directory(self, dir: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: Some(dir.into()),
            ..self
        }
    }

    pub fn with_file_name(self, name: impl Into<String>) -> Self {
        Self {
            file_name: Some(name.into()),
            ..self
        }
    }

    pub fn with_max_duration_ms(self, ms: i64) -> Self {
        Self {
            max_duration_ms: Some(ms),
            ..self
        }
    }

    pub fn with_max_file_size_bytes(self, bytes: i64) -> Self {
        Self {
            max_file_size_bytes: Some(bytes),
            ..self
        }
    }

    /// Use one container for both streams.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.video.format = format;
        self.audio.format = format;
        self
    }
}

/// Video settings after defaulting and validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct NormalizedVideo {
    pub(crate) source: VideoSource,
    pub(crate) encoder: VideoEncoder,
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
    pub(crate) density_dpi: Option<u32>,
    pub(crate) bitrate: u32,
    pub(crate) fps: u32,
    pub(crate) display_flags: VirtualDisplayFlags,
}

/// Audio settings after defaulting and validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct NormalizedAudio {
    pub(crate) source: AudioSource,
    pub(crate) encoder: AudioEncoder,
    pub(crate) bitrate: u32,
    pub(crate) channels: u8,
    pub(crate) sample_rate: u32,
}

/// A validated request with every defaultable field filled in.
///
/// Only [`crate::validation::validate`] can produce one, and it is
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct NormalizedRequest {
    pub(crate) audio_only: bool,
    /// The single container used for the output file
    pub(crate) format: OutputFormat,
    /// Present unless the request is audio-only
    pub(crate) video: Option<NormalizedVideo>,
    pub(crate) audio: NormalizedAudio,
    pub(crate) output_directory: Option<PathBuf>,
    pub(crate) file_name: Option<String>,
    pub(crate) max_duration: Option<Duration>,
    pub(crate) max_file_size: Option<u64>,
    /// Advisory notices raised during validation
    pub(crate) warnings: Vec<ValidationWarning>,
}

impl NormalizedRequest {
    pub(crate) fn new(
        audio_only: bool,
        format: OutputFormat,
        video: Option<NormalizedVideo>,
        audio: NormalizedAudio,
        request: &MediaProjectionRequest,
        warnings: Vec<ValidationWarning>,
    ) -> Self {
        Self {
            audio_only,
            format,
            video,
            audio,
            output_directory: request.output_directory.clone(),
            file_name: request.file_name.clone(),
            max_duration: request
                .max_duration_ms
                .map(|ms| Duration::from_millis(ms.unsigned_abs())),
            max_file_size: request.max_file_size_bytes.map(i64::unsigned_abs),
            warnings,
        }
    }

    pub fn audio_only(&self) -> bool {
        self.audio_only
    }

    /// The single container used for the output file.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Video settings, absent for audio-only requests.
    pub fn video(&self) -> Option<&NormalizedVideo> {
        self.video.as_ref()
    }

    pub fn audio(&self) -> &NormalizedAudio {
        &self.audio
    }

    pub fn output_directory(&self) -> Option<&Path> {
        self.output_directory.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    pub fn max_file_size(&self) -> Option<u64> {
        self.max_file_size
    }

    /// Advisory notices raised during validation.
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }
}

impl NormalizedVideo {
    pub(crate) fn new(props: &VideoRecordingProps, encoder: VideoEncoder, bitrate: u32) -> Self {
        Self {
            source: props.source,
            encoder,
            width: props.width.map(|w| w.unsigned_abs()),
            height: props.height.map(|h| h.unsigned_abs()),
            density_dpi: props.density_dpi.map(|d| d.unsigned_abs()),
            bitrate,
            fps: props.fps.unsigned_abs(),
            display_flags: props.display_flags,
        }
    }

    pub fn source(&self) -> VideoSource {
        self.source
    }

    pub fn encoder(&self) -> VideoEncoder {
        self.encoder
    }

    /// Requested width; filled from the live display when absent.
    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn density_dpi(&self) -> Option<u32> {
        self.density_dpi
    }

    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn display_flags(&self) -> VirtualDisplayFlags {
        self.display_flags
    }
}

impl NormalizedAudio {
    pub(crate) fn new(
        props: &AudioRecordingProps,
        encoder: AudioEncoder,
        bitrate: u32,
        channels: u8,
        sample_rate: u32,
    ) -> Self {
        Self {
            source: props.source,
            encoder,
            bitrate,
            channels,
            sample_rate,
        }
    }

    pub fn source(&self) -> AudioSource {
        self.source
    }

    pub fn encoder(&self) -> AudioEncoder {
        self.encoder
    }

    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
