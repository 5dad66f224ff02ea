//! Request validation.
//!
//! [`validate`] is a pure function: it fills unset fields from the catalog,
//! then runs a fixed sequence of checks and reports the first violation.
//! The order of the checks is part of the contract.

use crate::catalog::{AudioEncoder, AudioSource, OutputFormat, VideoEncoder, VideoSource};
use crate::types::{MediaProjectionRequest, NormalizedAudio, NormalizedRequest, NormalizedVideo};
use serde::Serialize;

/// Lowest accepted frame rate.
pub const MIN_FPS: i32 = 1;

/// Highest accepted frame rate.
pub const MAX_FPS: i32 = 120;

/// Identifier of the rule a rejected request violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    FileName,
    MaxDuration,
    MaxFileSize,
    VideoBitrate,
    FrameRate,
    Width,
    Height,
    DensityDpi,
    AudioBitrate,
    SampleRate,
    ChannelCount,
    AudioEncoderContainer,
    VideoEncoderContainer,
    ContainerVideoSupport,
    ContainerAudioOnlySupport,
    ContainerMismatch,
}

impl ValidationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRule::FileName => "file_name",
            ValidationRule::MaxDuration => "max_duration",
            ValidationRule::MaxFileSize => "max_file_size",
            ValidationRule::VideoBitrate => "video_bitrate",
            ValidationRule::FrameRate => "frame_rate",
            ValidationRule::Width => "width",
            ValidationRule::Height => "height",
            ValidationRule::DensityDpi => "density_dpi",
            ValidationRule::AudioBitrate => "audio_bitrate",
            ValidationRule::SampleRate => "sample_rate",
            ValidationRule::ChannelCount => "channel_count",
            ValidationRule::AudioEncoderContainer => "audio_encoder_container",
            ValidationRule::VideoEncoderContainer => "video_encoder_container",
            ValidationRule::ContainerVideoSupport => "container_video_support",
            ValidationRule::ContainerAudioOnlySupport => "container_audio_only_support",
            ValidationRule::ContainerMismatch => "container_mismatch",
        }
    }
}

impl std::fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection of a recording request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// File name was supplied but blank
    EmptyFileName,
    /// Max duration was supplied but not positive
    InvalidMaxDuration { value_ms: i64 },
    /// Max file size was supplied but not positive
    InvalidMaxFileSize { value_bytes: i64 },
    /// A numeric setting is outside its accepted range
    OutOfRange {
        rule: ValidationRule,
        value: i64,
        min: i64,
        max: i64,
    },
    /// Audio encoder cannot be muxed into the audio container
    IncompatibleAudioEncoder {
        encoder: AudioEncoder,
        format: OutputFormat,
    },
    /// Video encoder cannot be muxed into the video container
    IncompatibleVideoEncoder {
        encoder: VideoEncoder,
        format: OutputFormat,
    },
    /// Video requested in a container without a video track
    ContainerLacksVideo { format: OutputFormat },
    /// Audio-only requested in a container that cannot be audio-only
    ContainerNotAudioOnly { format: OutputFormat },
    /// Video and audio containers differ
    ContainerMismatch {
        video_format: OutputFormat,
        audio_format: OutputFormat,
    },
}

impl ValidationError {
    /// The rule this error violates.
    pub fn rule(&self) -> ValidationRule {
        match self {
            ValidationError::EmptyFileName => ValidationRule::FileName,
            ValidationError::InvalidMaxDuration { .. } => ValidationRule::MaxDuration,
            ValidationError::InvalidMaxFileSize { .. } => ValidationRule::MaxFileSize,
            ValidationError::OutOfRange { rule, .. } => *rule,
            ValidationError::IncompatibleAudioEncoder { .. } => ValidationRule::AudioEncoderContainer,
            ValidationError::IncompatibleVideoEncoder { .. } => ValidationRule::VideoEncoderContainer,
            ValidationError::ContainerLacksVideo { .. } => ValidationRule::ContainerVideoSupport,
            ValidationError::ContainerNotAudioOnly { .. } => ValidationRule::ContainerAudioOnlySupport,
            ValidationError::ContainerMismatch { .. } => ValidationRule::ContainerMismatch,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyFileName => write!(f, "File name must not be empty"),
            ValidationError::InvalidMaxDuration { value_ms } => {
                write!(f, "Max duration must be positive: {} ms", value_ms)
            }
            ValidationError::InvalidMaxFileSize { value_bytes } => {
                write!(f, "Max file size must be positive: {} bytes", value_bytes)
            }
            ValidationError::OutOfRange {
                rule,
                value,
                min,
                max,
            } => write!(f, "{} out of range: {} (expected {}..={})", rule, value, min, max),
            ValidationError::IncompatibleAudioEncoder { encoder, format } => {
                write!(f, "Audio encoder {} is not supported in {}", encoder, format)
            }
            ValidationError::IncompatibleVideoEncoder { encoder, format } => {
                write!(f, "Video encoder {} is not supported in {}", encoder, format)
            }
            ValidationError::ContainerLacksVideo { format } => {
                write!(f, "Container {} cannot carry video", format)
            }
            ValidationError::ContainerNotAudioOnly { format } => {
                write!(f, "Container {} cannot be used for audio-only output", format)
            }
            ValidationError::ContainerMismatch {
                video_format,
                audio_format,
            } => write!(
                f,
                "Container format mismatch: video {} vs audio {}",
                video_format, audio_format
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Non-fatal notice about a request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Audio source needs a permission beyond the capture grant
    ElevatedPermissionSource { source: AudioSource },
    /// Video source cannot be fed by a virtual display
    VideoSourceNotScreenCapture { source: VideoSource },
    LimitedSupportAudioEncoder { encoder: AudioEncoder },
    LimitedSupportVideoEncoder { encoder: VideoEncoder },
    LegacyAudioEncoder { encoder: AudioEncoder },
    LegacyVideoEncoder { encoder: VideoEncoder },
    LegacyContainer { format: OutputFormat },
    /// More channels requested than the encoder can produce
    ChannelsExceedEncoder { encoder: AudioEncoder, channels: u8 },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::ElevatedPermissionSource { source } => {
                write!(f, "Audio source {} requires an elevated permission", source)
            }
            ValidationWarning::VideoSourceNotScreenCapture { source } => {
                write!(f, "Video source {} cannot receive screen content", source)
            }
            ValidationWarning::LimitedSupportAudioEncoder { encoder } => {
                write!(f, "Audio encoder {} has limited device support", encoder)
            }
            ValidationWarning::LimitedSupportVideoEncoder { encoder } => {
                write!(f, "Video encoder {} has limited device support", encoder)
            }
            ValidationWarning::LegacyAudioEncoder { encoder } => {
                write!(f, "Audio encoder {} is legacy", encoder)
            }
            ValidationWarning::LegacyVideoEncoder { encoder } => {
                write!(f, "Video encoder {} is legacy", encoder)
            }
            ValidationWarning::LegacyContainer { format } => {
                write!(f, "Container {} is legacy", format)
            }
            ValidationWarning::ChannelsExceedEncoder { encoder, channels } => {
                write!(f, "Audio encoder {} is mono-only, {} channels requested", encoder, channels)
            }
        }
    }
}

fn check_range(rule: ValidationRule, value: i32, min: i32, max: i32) -> Result<u32, ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            rule,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        });
    }
    Ok(value.unsigned_abs())
}

fn check_positive(rule: ValidationRule, value: i32) -> Result<u32, ValidationError> {
    check_range(rule, value, 1, i32::MAX)
}

/// Validate a request and produce its normalized form.
///
/// Unset encoders come from the container, unset bitrates, sample rate and
/// channel count from the encoder. Checks then run in this order, first
/// failure wins:
/// 1. file name non-empty
/// 2. max duration positive
/// 3. max file size positive
/// 4. numeric ranges (video first, skipped for audio-only; then audio)
/// 5. encoder/container compatibility
/// 6. container capability (video support, or audio-only use)
/// 7. video and audio containers identical
pub fn validate(request: &MediaProjectionRequest) -> Result<NormalizedRequest, ValidationError> {
    let video = &request.video;
    let audio = &request.audio;

    let audio_encoder = audio
        .encoder
        .unwrap_or_else(|| audio.format.default_audio_encoder());
    let audio_bitrate = audio
        .bitrate
        .unwrap_or_else(|| audio_encoder.recommended_bitrate());
    let sample_rate = audio
        .sample_rate
        .unwrap_or_else(|| audio_encoder.recommended_sample_rate());
    let channels = audio
        .channels
        .unwrap_or_else(|| audio_encoder.recommended_channels());
    let video_encoder = video.encoder.or_else(|| video.format.default_video_encoder());
    let video_bitrate = video
        .bitrate
        .or_else(|| video_encoder.map(VideoEncoder::recommended_bitrate));

    if let Some(name) = &request.file_name {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyFileName);
        }
    }

    if let Some(ms) = request.max_duration_ms {
        if ms <= 0 {
            return Err(ValidationError::InvalidMaxDuration { value_ms: ms });
        }
    }

    if let Some(bytes) = request.max_file_size_bytes {
        if bytes <= 0 {
            return Err(ValidationError::InvalidMaxFileSize { value_bytes: bytes });
        }
    }

    let mut checked_video_bitrate = None;
    if !request.audio_only {
        if let Some(bitrate) = video_bitrate {
            checked_video_bitrate = Some(check_positive(ValidationRule::VideoBitrate, bitrate)?);
        }
        check_range(ValidationRule::FrameRate, video.fps, MIN_FPS, MAX_FPS)?;
        if let Some(width) = video.width {
            check_positive(ValidationRule::Width, width)?;
        }
        if let Some(height) = video.height {
            check_positive(ValidationRule::Height, height)?;
        }
        if let Some(dpi) = video.density_dpi {
            check_positive(ValidationRule::DensityDpi, dpi)?;
        }
    }
    let audio_bitrate = check_positive(ValidationRule::AudioBitrate, audio_bitrate)?;
    let sample_rate = check_positive(ValidationRule::SampleRate, sample_rate)?;
    let channels = check_range(ValidationRule::ChannelCount, channels, 1, 2)?;

    if !audio.format.supports_audio_encoder(audio_encoder) {
        return Err(ValidationError::IncompatibleAudioEncoder {
            encoder: audio_encoder,
            format: audio.format,
        });
    }
    if !request.audio_only {
        if let Some(encoder) = video_encoder {
            if !video.format.supports_video_encoder(encoder) {
                return Err(ValidationError::IncompatibleVideoEncoder {
                    encoder,
                    format: video.format,
                });
            }
        }
    }

    if request.audio_only {
        if !audio.format.usable_for_audio_only() {
            return Err(ValidationError::ContainerNotAudioOnly {
                format: audio.format,
            });
        }
    } else if !video.format.supports_video() {
        return Err(ValidationError::ContainerLacksVideo {
            format: video.format,
        });
    }

    if !request.audio_only && video.format != audio.format {
        return Err(ValidationError::ContainerMismatch {
            video_format: video.format,
            audio_format: audio.format,
        });
    }

    // Narrowed by the checks above; 1..=2 fits a u8.
    let channels = channels as u8;

    let normalized_video = if request.audio_only {
        None
    } else {
        let (Some(encoder), Some(bitrate)) = (video_encoder, checked_video_bitrate) else {
            return Err(ValidationError::ContainerLacksVideo {
                format: video.format,
            });
        };
        Some(NormalizedVideo::new(video, encoder, bitrate))
    };

    let mut warnings = Vec::new();
    collect_warnings(request, audio_encoder, normalized_video.as_ref(), channels, &mut warnings);

    Ok(NormalizedRequest::new(
        request.audio_only,
        audio.format,
        normalized_video,
        NormalizedAudio::new(audio, audio_encoder, audio_bitrate, channels, sample_rate),
        request,
        warnings,
    ))
}

fn collect_warnings(
    request: &MediaProjectionRequest,
    audio_encoder: AudioEncoder,
    video: Option<&NormalizedVideo>,
    channels: u8,
    warnings: &mut Vec<ValidationWarning>,
) {
    let source = request.audio.source;
    if source.requires_elevated_permission() {
        warnings.push(ValidationWarning::ElevatedPermissionSource { source });
    }

    let audio_flags = audio_encoder.flags();
    if audio_flags.limited_support {
        warnings.push(ValidationWarning::LimitedSupportAudioEncoder {
            encoder: audio_encoder,
        });
    }
    if audio_flags.legacy {
        warnings.push(ValidationWarning::LegacyAudioEncoder {
            encoder: audio_encoder,
        });
    }
    if i32::from(channels) > audio_encoder.max_channels() {
        warnings.push(ValidationWarning::ChannelsExceedEncoder {
            encoder: audio_encoder,
            channels,
        });
    }

    if let Some(video) = video {
        if !video.source.supports_screen_capture() {
            warnings.push(ValidationWarning::VideoSourceNotScreenCapture {
                source: video.source,
            });
        }
        let video_flags = video.encoder.flags();
        if video_flags.limited_support {
            warnings.push(ValidationWarning::LimitedSupportVideoEncoder {
                encoder: video.encoder,
            });
        }
        if video_flags.legacy {
            warnings.push(ValidationWarning::LegacyVideoEncoder {
                encoder: video.encoder,
            });
        }
    }

    if request.audio.format.flags().legacy {
        warnings.push(ValidationWarning::LegacyContainer {
            format: request.audio.format,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AudioRecordingProps, VideoRecordingProps};
    use std::time::Duration;

    fn mp4_request() -> MediaProjectionRequest {
        MediaProjectionRequest::default()
            .with_video(VideoRecordingProps {
                encoder: Some(VideoEncoder::H264),
                format: OutputFormat::Mpeg4,
                fps: 30,
                ..VideoRecordingProps::default()
            })
            .with_audio(AudioRecordingProps {
                encoder: Some(AudioEncoder::Aac),
                format: OutputFormat::Mpeg4,
                ..AudioRecordingProps::default()
            })
    }

    fn with_fps(fps: i32) -> MediaProjectionRequest {
        let request = mp4_request();
        let video = VideoRecordingProps {
            fps,
            ..request.video.clone()
        };
        request.with_video(video)
    }

    #[test]
    fn test_mp4_h264_aac_defaults() {
        let normalized = validate(&mp4_request()).unwrap();
        let video = normalized.video.as_ref().unwrap();
        assert_eq!(video.encoder, VideoEncoder::H264);
        assert_eq!(video.bitrate, 8_000_000);
        assert_eq!(video.fps, 30);
        assert_eq!(normalized.audio.bitrate, 128_000);
        assert_eq!(normalized.audio.sample_rate, 44_100);
        assert_eq!(normalized.audio.channels, 2);
        assert_eq!(normalized.format, OutputFormat::Mpeg4);
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_webm_video_with_mp4_audio_is_mismatch() {
        let mut request = mp4_request();
        request.video.encoder = None;
        request.video.format = OutputFormat::Webm;
        let err = validate(&request).unwrap_err();
        assert_eq!(err.rule(), ValidationRule::ContainerMismatch);
        assert_eq!(
            err,
            ValidationError::ContainerMismatch {
                video_format: OutputFormat::Webm,
                audio_format: OutputFormat::Mpeg4,
            }
        );
    }

    #[test]
    fn test_any_differing_video_containers_are_rejected() {
        for video_format in OutputFormat::ALL.iter().filter(|f| f.supports_video()) {
            for audio_format in OutputFormat::ALL {
                if video_format == audio_format {
                    continue;
                }
                let request = MediaProjectionRequest::default()
                    .with_video(VideoRecordingProps {
                        format: *video_format,
                        ..VideoRecordingProps::default()
                    })
                    .with_audio(AudioRecordingProps {
                        format: *audio_format,
                        ..AudioRecordingProps::default()
                    });
                let err = validate(&request).unwrap_err();
                assert_eq!(err.rule(), ValidationRule::ContainerMismatch, "{:?}", err);
            }
        }
    }

    #[test]
    fn test_fps_boundaries() {
        assert!(validate(&with_fps(1)).is_ok());
        assert!(validate(&with_fps(120)).is_ok());
        for fps in [0, -1, 121, 240] {
            let err = validate(&with_fps(fps)).unwrap_err();
            assert_eq!(err.rule(), ValidationRule::FrameRate);
        }
    }

    #[test]
    fn test_audio_defaults_come_from_encoder() {
        for encoder in [AudioEncoder::Aac, AudioEncoder::HeAac, AudioEncoder::AacEld] {
            let request = mp4_request().with_audio(AudioRecordingProps {
                encoder: Some(encoder),
                format: OutputFormat::Mpeg4,
                ..AudioRecordingProps::default()
            });
            let normalized = validate(&request).unwrap();
            assert_eq!(normalized.audio.bitrate as i32, encoder.recommended_bitrate());
            assert_eq!(normalized.audio.sample_rate as i32, encoder.recommended_sample_rate());
        }
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let mut request = mp4_request();
        request.audio.bitrate = Some(96_000);
        request.audio.sample_rate = Some(48_000);
        request.audio.channels = Some(1);
        request.video.bitrate = Some(2_500_000);
        let normalized = validate(&request).unwrap();
        assert_eq!(normalized.audio.bitrate, 96_000);
        assert_eq!(normalized.audio.sample_rate, 48_000);
        assert_eq!(normalized.audio.channels, 1);
        assert_eq!(normalized.video.unwrap().bitrate, 2_500_000);
    }

    #[test]
    fn test_empty_file_name() {
        let err = validate(&mp4_request().with_file_name("")).unwrap_err();
        assert_eq!(err, ValidationError::EmptyFileName);
        let err = validate(&mp4_request().with_file_name("   ")).unwrap_err();
        assert_eq!(err.rule(), ValidationRule::FileName);
    }

    #[test]
    fn test_limits_must_be_positive() {
        let err = validate(&mp4_request().with_max_duration_ms(0)).unwrap_err();
        assert_eq!(err, ValidationError::InvalidMaxDuration { value_ms: 0 });
        let err = validate(&mp4_request().with_max_file_size_bytes(-5)).unwrap_err();
        assert_eq!(err, ValidationError::InvalidMaxFileSize { value_bytes: -5 });

        let normalized = validate(
            &mp4_request()
                .with_max_duration_ms(1_500)
                .with_max_file_size_bytes(1 << 20),
        )
        .unwrap();
        assert_eq!(normalized.max_duration, Some(Duration::from_millis(1_500)));
        assert_eq!(normalized.max_file_size, Some(1 << 20));
    }

    #[test]
    fn test_first_violation_wins() {
        // Empty file name, bad duration and bad fps at once
        let request = with_fps(0).with_file_name("").with_max_duration_ms(-1);
        assert_eq!(validate(&request).unwrap_err().rule(), ValidationRule::FileName);

        let request = with_fps(0).with_max_duration_ms(-1);
        assert_eq!(validate(&request).unwrap_err().rule(), ValidationRule::MaxDuration);

        // Numeric checks come before compatibility checks
        let mut request = with_fps(0);
        request.audio.encoder = Some(AudioEncoder::Opus);
        assert_eq!(validate(&request).unwrap_err().rule(), ValidationRule::FrameRate);
    }

    #[test]
    fn test_numeric_fields() {
        let mut request = mp4_request();
        request.video.width = Some(0);
        let err = validate(&request).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutOfRange {
                rule: ValidationRule::Width,
                value: 0,
                min: 1,
                max: i32::MAX as i64,
            }
        );

        let mut request = mp4_request();
        request.video.density_dpi = Some(-160);
        assert_eq!(validate(&request).unwrap_err().rule(), ValidationRule::DensityDpi);

        let mut request = mp4_request();
        request.audio.channels = Some(3);
        assert_eq!(validate(&request).unwrap_err().rule(), ValidationRule::ChannelCount);

        let mut request = mp4_request();
        request.audio.sample_rate = Some(0);
        assert_eq!(validate(&request).unwrap_err().rule(), ValidationRule::SampleRate);

        let mut request = mp4_request();
        request.video.bitrate = Some(0);
        assert_eq!(validate(&request).unwrap_err().rule(), ValidationRule::VideoBitrate);
    }

    #[test]
    fn test_incompatible_encoders() {
        let mut request = mp4_request();
        request.audio.encoder = Some(AudioEncoder::Vorbis);
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::IncompatibleAudioEncoder {
                encoder: AudioEncoder::Vorbis,
                format: OutputFormat::Mpeg4,
            }
        );

        let mut request = mp4_request();
        request.video.encoder = Some(VideoEncoder::Vp9);
        assert_eq!(
            validate(&request).unwrap_err().rule(),
            ValidationRule::VideoEncoderContainer
        );
    }

    #[test]
    fn test_video_in_audio_container() {
        let request = MediaProjectionRequest::default().with_format(OutputFormat::AacAdts);
        assert_eq!(
            validate(&request).unwrap_err(),
            ValidationError::ContainerLacksVideo {
                format: OutputFormat::AacAdts
            }
        );
    }

    #[test]
    fn test_audio_only() {
        let request = MediaProjectionRequest::default()
            .with_audio_only(true)
            .with_format(OutputFormat::Ogg);
        let normalized = validate(&request).unwrap();
        assert!(normalized.audio_only);
        assert!(normalized.video.is_none());
        assert_eq!(normalized.audio.encoder, AudioEncoder::Opus);
        assert_eq!(normalized.format, OutputFormat::Ogg);

        // Video settings are ignored for audio-only requests
        let mut request = request;
        request.video.fps = 0;
        request.video.format = OutputFormat::Webm;
        assert!(validate(&request).is_ok());

        let request = MediaProjectionRequest::default()
            .with_audio_only(true)
            .with_format(OutputFormat::Mpeg2Ts);
        assert_eq!(
            validate(&request).unwrap_err().rule(),
            ValidationRule::ContainerAudioOnlySupport
        );
    }

    #[test]
    fn test_warnings_are_advisory() {
        let mut request = mp4_request();
        request.audio.source = AudioSource::RemoteSubmix;
        request.video.encoder = Some(VideoEncoder::Av1);
        let normalized = validate(&request).unwrap();
        assert!(normalized
            .warnings
            .contains(&ValidationWarning::ElevatedPermissionSource {
                source: AudioSource::RemoteSubmix
            }));
        assert!(normalized
            .warnings
            .contains(&ValidationWarning::LimitedSupportVideoEncoder {
                encoder: VideoEncoder::Av1
            }));
    }

    #[test]
    fn test_mono_encoder_with_stereo_warns() {
        let mut request = MediaProjectionRequest::default()
            .with_audio_only(true)
            .with_format(OutputFormat::AmrWb);
        request.audio.channels = Some(2);
        let normalized = validate(&request).unwrap();
        assert!(normalized
            .warnings
            .contains(&ValidationWarning::ChannelsExceedEncoder {
                encoder: AudioEncoder::AmrWb,
                channels: 2,
            }));
    }
}
