//! Container formats and their encoder compatibility sets.

use super::{AudioEncoder, CapabilityFlags, VideoEncoder};

capability_enum! {
    /// Container the recorder writes.
    OutputFormat, "output format" {
        ThreeGpp = 1 => "3GPP",
        Mpeg4 = 2 => "MPEG-4",
        AmrNb = 3 => "AMR-NB",
        AmrWb = 4 => "AMR-WB",
        AacAdts = 6 => "AAC ADTS",
        Mpeg2Ts = 8 => "MPEG-2 TS",
        Webm = 9 => "WebM",
        Ogg = 11 => "Ogg",
    }
}

const AAC_FAMILY: &[AudioEncoder] = &[AudioEncoder::Aac, AudioEncoder::HeAac, AudioEncoder::AacEld];

const MP4_AUDIO: &[AudioEncoder] = &[
    AudioEncoder::AmrNb,
    AudioEncoder::AmrWb,
    AudioEncoder::Aac,
    AudioEncoder::HeAac,
    AudioEncoder::AacEld,
];

impl OutputFormat {
    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::ThreeGpp => "3gp",
            OutputFormat::Mpeg4 => "mp4",
            OutputFormat::AmrNb => "amr",
            OutputFormat::AmrWb => "awb",
            OutputFormat::AacAdts => "aac",
            OutputFormat::Mpeg2Ts => "ts",
            OutputFormat::Webm => "webm",
            OutputFormat::Ogg => "ogg",
        }
    }

    /// Audio encoders that may be muxed into this container.
    pub fn audio_encoders(self) -> &'static [AudioEncoder] {
        match self {
            OutputFormat::ThreeGpp | OutputFormat::Mpeg4 => MP4_AUDIO,
            OutputFormat::AmrNb => &[AudioEncoder::AmrNb],
            OutputFormat::AmrWb => &[AudioEncoder::AmrWb],
            OutputFormat::AacAdts => AAC_FAMILY,
            OutputFormat::Mpeg2Ts => &[AudioEncoder::Aac, AudioEncoder::HeAac],
            OutputFormat::Webm => &[AudioEncoder::Vorbis, AudioEncoder::Opus],
            OutputFormat::Ogg => &[AudioEncoder::Opus],
        }
    }

    /// Video encoders that may be muxed into this container.
    ///
    /// Empty for audio-only containers.
    pub fn video_encoders(self) -> &'static [VideoEncoder] {
        match self {
            OutputFormat::ThreeGpp => &[VideoEncoder::H263, VideoEncoder::H264, VideoEncoder::Mpeg4Sp],
            OutputFormat::Mpeg4 => &[
                VideoEncoder::H263,
                VideoEncoder::H264,
                VideoEncoder::Mpeg4Sp,
                VideoEncoder::Hevc,
                VideoEncoder::DolbyVision,
                VideoEncoder::Av1,
            ],
            OutputFormat::Mpeg2Ts => &[VideoEncoder::H264, VideoEncoder::Hevc],
            OutputFormat::Webm => &[VideoEncoder::Vp8, VideoEncoder::Vp9],
            OutputFormat::AmrNb | OutputFormat::AmrWb | OutputFormat::AacAdts | OutputFormat::Ogg => &[],
        }
    }

    /// Audio encoder used when the request leaves it unset.
    pub fn default_audio_encoder(self) -> AudioEncoder {
        match self {
            OutputFormat::ThreeGpp
            | OutputFormat::Mpeg4
            | OutputFormat::AacAdts
            | OutputFormat::Mpeg2Ts => AudioEncoder::Aac,
            OutputFormat::AmrNb => AudioEncoder::AmrNb,
            OutputFormat::AmrWb => AudioEncoder::AmrWb,
            OutputFormat::Webm | OutputFormat::Ogg => AudioEncoder::Opus,
        }
    }

    /// Video encoder used when the request leaves it unset.
    pub fn default_video_encoder(self) -> Option<VideoEncoder> {
        match self {
            OutputFormat::ThreeGpp | OutputFormat::Mpeg4 | OutputFormat::Mpeg2Ts => {
                Some(VideoEncoder::H264)
            }
            OutputFormat::Webm => Some(VideoEncoder::Vp8),
            OutputFormat::AmrNb | OutputFormat::AmrWb | OutputFormat::AacAdts | OutputFormat::Ogg => None,
        }
    }

    pub fn supports_audio_encoder(self, encoder: AudioEncoder) -> bool {
        self.audio_encoders().contains(&encoder)
    }

    pub fn supports_video_encoder(self, encoder: VideoEncoder) -> bool {
        self.video_encoders().contains(&encoder)
    }

    /// Whether this container can carry a video track.
    pub fn supports_video(self) -> bool {
        self.flags().supports_video
    }

    /// Whether this container can be written with a single audio track.
    pub fn usable_for_audio_only(self) -> bool {
        self.flags().audio_only_capable
    }

    /// Classification flags for this container.
    pub fn flags(self) -> CapabilityFlags {
        match self {
            OutputFormat::Mpeg4 => CapabilityFlags {
                supports_video: true,
                audio_only_capable: true,
                widely_supported: true,
                ..CapabilityFlags::NONE
            },
            OutputFormat::ThreeGpp => CapabilityFlags {
                supports_video: true,
                audio_only_capable: true,
                legacy: true,
                ..CapabilityFlags::NONE
            },
            OutputFormat::Webm => CapabilityFlags {
                supports_video: true,
                audio_only_capable: true,
                ..CapabilityFlags::NONE
            },
            // Transport streams need a video PID to be useful to most players
            OutputFormat::Mpeg2Ts => CapabilityFlags {
                supports_video: true,
                ..CapabilityFlags::NONE
            },
            OutputFormat::AmrNb => CapabilityFlags {
                audio_only_capable: true,
                legacy: true,
                ..CapabilityFlags::NONE
            },
            OutputFormat::AmrWb | OutputFormat::AacAdts | OutputFormat::Ogg => CapabilityFlags {
                audio_only_capable: true,
                ..CapabilityFlags::NONE
            },
        }
    }
}
