//! Audio and video encoders with their recommended settings.

use super::CapabilityFlags;

capability_enum! {
    /// Audio codec the recorder encodes with.
    AudioEncoder, "audio encoder" {
        AmrNb = 1 => "AMR narrowband",
        AmrWb = 2 => "AMR wideband",
        Aac = 3 => "AAC-LC",
        HeAac = 4 => "HE-AAC",
        AacEld = 5 => "AAC-ELD",
        Vorbis = 6 => "Vorbis",
        Opus = 7 => "Opus",
    }
}

impl AudioEncoder {
    /// Recommended audio bitrate in bits per second.
    pub fn recommended_bitrate(self) -> i32 {
        match self {
            AudioEncoder::AmrNb => 12_200,
            AudioEncoder::AmrWb => 23_850,
            AudioEncoder::Aac => 128_000,
            AudioEncoder::HeAac => 64_000,
            AudioEncoder::AacEld => 64_000,
            AudioEncoder::Vorbis => 128_000,
            AudioEncoder::Opus => 96_000,
        }
    }

    /// Recommended sample rate in Hz.
    pub fn recommended_sample_rate(self) -> i32 {
        match self {
            AudioEncoder::AmrNb => 8_000,
            AudioEncoder::AmrWb => 16_000,
            AudioEncoder::Aac | AudioEncoder::HeAac | AudioEncoder::Vorbis => 44_100,
            AudioEncoder::AacEld | AudioEncoder::Opus => 48_000,
        }
    }

    /// Recommended channel count.
    pub fn recommended_channels(self) -> i32 {
        self.max_channels()
    }

    /// Highest channel count the codec can encode.
    pub fn max_channels(self) -> i32 {
        match self {
            AudioEncoder::AmrNb | AudioEncoder::AmrWb => 1,
            _ => 2,
        }
    }

    /// Classification flags for this encoder.
    pub fn flags(self) -> CapabilityFlags {
        match self {
            AudioEncoder::Aac => CapabilityFlags {
                widely_supported: true,
                ..CapabilityFlags::NONE
            },
            AudioEncoder::AmrNb => CapabilityFlags {
                legacy: true,
                ..CapabilityFlags::NONE
            },
            AudioEncoder::AacEld => CapabilityFlags {
                limited_support: true,
                ..CapabilityFlags::NONE
            },
            AudioEncoder::AmrWb | AudioEncoder::HeAac | AudioEncoder::Vorbis | AudioEncoder::Opus => {
                CapabilityFlags::NONE
            }
        }
    }
}

capability_enum! {
    /// Video codec the recorder encodes with.
    VideoEncoder, "video encoder" {
        H263 = 1 => "H.263",
        H264 = 2 => "H.264 / AVC",
        Mpeg4Sp = 3 => "MPEG-4 Simple Profile",
        Vp8 = 4 => "VP8",
        Hevc = 5 => "H.265 / HEVC",
        Vp9 = 6 => "VP9",
        DolbyVision = 7 => "Dolby Vision",
        Av1 = 8 => "AV1",
    }
}

impl VideoEncoder {
    /// Typical bitrate for 1080p capture in bits per second.
    pub fn recommended_bitrate(self) -> i32 {
        match self {
            VideoEncoder::H263 => 2_000_000,
            VideoEncoder::H264 => 8_000_000,
            VideoEncoder::Mpeg4Sp => 4_000_000,
            VideoEncoder::Vp8 => 8_000_000,
            VideoEncoder::Hevc => 5_000_000,
            VideoEncoder::Vp9 => 5_000_000,
            VideoEncoder::DolbyVision => 10_000_000,
            VideoEncoder::Av1 => 4_000_000,
        }
    }

    /// Classification flags for this encoder.
    pub fn flags(self) -> CapabilityFlags {
        match self {
            VideoEncoder::H264 => CapabilityFlags {
                widely_supported: true,
                ..CapabilityFlags::NONE
            },
            VideoEncoder::H263 | VideoEncoder::Mpeg4Sp => CapabilityFlags {
                legacy: true,
                ..CapabilityFlags::NONE
            },
            VideoEncoder::DolbyVision | VideoEncoder::Av1 => CapabilityFlags {
                limited_support: true,
                ..CapabilityFlags::NONE
            },
            VideoEncoder::Vp8 | VideoEncoder::Hevc | VideoEncoder::Vp9 => CapabilityFlags::NONE,
        }
    }
}
