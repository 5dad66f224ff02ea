//! Flat wire representation of a recording request.
//!
//! Every field of [`MediaProjectionRequest`] is keyed by name at the top
//! level, and sources, encoders, formats and display flags travel as the
//! platform's integers. Encoder id `0` means "container default".

use crate::catalog::{AudioEncoder, AudioSource, OutputFormat, UnknownIdentifier, VideoEncoder, VideoSource};
use crate::display_flags::{UnknownFlagBits, VirtualDisplayFlags};
use crate::types::{AudioRecordingProps, MediaProjectionRequest, VideoRecordingProps, DEFAULT_FPS};
use serde::{Deserialize, Serialize};

/// Encoder id the platform uses for "pick one for me".
pub const DEFAULT_ENCODER_ID: i32 = 0;

/// Error converting a wire request into a typed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// An integer field does not name a known capability
    UnknownIdentifier(UnknownIdentifier),
    /// The display flag bitmask has unknown bits set
    UnknownFlagBits(UnknownFlagBits),
    /// The payload is not valid JSON for a wire request
    ParseError(String),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::UnknownIdentifier(e) => write!(f, "{}", e),
            WireError::UnknownFlagBits(e) => write!(f, "{}", e),
            WireError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for WireError {}

impl From<UnknownIdentifier> for WireError {
    fn from(e: UnknownIdentifier) -> Self {
        WireError::UnknownIdentifier(e)
    }
}

impl From<UnknownFlagBits> for WireError {
    fn from(e: UnknownFlagBits) -> Self {
        WireError::UnknownFlagBits(e)
    }
}

/// Flat, integer-typed request as carried between processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRequest {
    #[serde(default)]
    pub audio_only: bool,

    pub video_source: i32,
    #[serde(default)]
    pub video_encoder: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    pub video_format: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_dpi: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<i32>,
    #[serde(default = "default_fps")]
    pub fps: i32,
    #[serde(default = "default_display_flags")]
    pub virtual_display_flags: i32,

    pub audio_source: i32,
    #[serde(default)]
    pub audio_encoder: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<i32>,
    pub audio_format: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size_bytes: Option<i64>,
}

fn default_fps() -> i32 {
    DEFAULT_FPS
}

fn default_display_flags() -> i32 {
    VirtualDisplayFlags::default().to_bits()
}

fn optional_id<T>(id: i32) -> Result<Option<T>, UnknownIdentifier>
where
    T: TryFrom<i32, Error = UnknownIdentifier>,
{
    if id == DEFAULT_ENCODER_ID {
        Ok(None)
    } else {
        T::try_from(id).map(Some)
    }
}

impl WireRequest {
    /// Parse a JSON payload.
    pub fn from_json(data: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(data).map_err(|e| WireError::ParseError(e.to_string()))
    }

    /// Convert into a typed request, resolving every integer identifier.
    pub fn into_request(self) -> Result<MediaProjectionRequest, WireError> {
        let video = VideoRecordingProps {
            source: VideoSource::try_from(self.video_source)?,
            encoder: optional_id::<VideoEncoder>(self.video_encoder)?,
            width: self.width,
            height: self.height,
            format: OutputFormat::try_from(self.video_format)?,
            density_dpi: self.density_dpi,
            bitrate: self.video_bitrate,
            fps: self.fps,
            display_flags: VirtualDisplayFlags::from_bits(self.virtual_display_flags)?,
        };
        let audio = AudioRecordingProps {
            source: AudioSource::try_from(self.audio_source)?,
            encoder: optional_id::<AudioEncoder>(self.audio_encoder)?,
            bitrate: self.audio_bitrate,
            format: OutputFormat::try_from(self.audio_format)?,
            channels: self.channels,
            sample_rate: self.sample_rate,
        };
        Ok(MediaProjectionRequest {
            audio_only: self.audio_only,
            video,
            audio,
            output_directory: self.output_directory.map(Into::into),
            file_name: self.file_name,
            max_duration_ms: self.max_duration_ms,
            max_file_size_bytes: self.max_file_size_bytes,
        })
    }
}

impl From<&MediaProjectionRequest> for WireRequest {
    fn from(request: &MediaProjectionRequest) -> Self {
        let video = &request.video;
        let audio = &request.audio;
        Self {
            audio_only: request.audio_only,
            video_source: video.source.id(),
            video_encoder: video.encoder.map_or(DEFAULT_ENCODER_ID, VideoEncoder::id),
            width: video.width,
            height: video.height,
            video_format: video.format.id(),
            density_dpi: video.density_dpi,
            video_bitrate: video.bitrate,
            fps: video.fps,
            virtual_display_flags: video.display_flags.to_bits(),
            audio_source: audio.source.id(),
            audio_encoder: audio.encoder.map_or(DEFAULT_ENCODER_ID, AudioEncoder::id),
            audio_bitrate: audio.bitrate,
            audio_format: audio.format.id(),
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            output_directory: request
                .output_directory
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            file_name: request.file_name.clone(),
            max_duration_ms: request.max_duration_ms,
            max_file_size_bytes: request.max_file_size_bytes,
        }
    }
}

impl TryFrom<WireRequest> for MediaProjectionRequest {
    type Error = WireError;

    fn try_from(wire: WireRequest) -> Result<Self, Self::Error> {
        wire.into_request()
    }
}
