//! Audio and video sources.

use super::CapabilityFlags;

capability_enum! {
    /// Where the recorder pulls its audio track from.
    AudioSource, "audio source" {
        /// Platform default input
        Default = 0 => "Default",
        Mic = 1 => "Microphone",
        VoiceUplink = 2 => "Voice call uplink",
        VoiceDownlink = 3 => "Voice call downlink",
        VoiceCall = 4 => "Voice call (both directions)",
        /// Microphone tuned for video recording
        Camcorder = 5 => "Camcorder",
        VoiceRecognition = 6 => "Voice recognition",
        VoiceCommunication = 7 => "Voice communication",
        /// Mix of the device's own audio output
        RemoteSubmix = 8 => "Remote submix",
        Unprocessed = 9 => "Unprocessed microphone",
        VoicePerformance = 10 => "Voice performance",
    }
}

impl AudioSource {
    /// Classification flags for this source.
    pub fn flags(self) -> CapabilityFlags {
        match self {
            AudioSource::VoiceUplink
            | AudioSource::VoiceDownlink
            | AudioSource::VoiceCall
            | AudioSource::RemoteSubmix => CapabilityFlags {
                requires_elevated_permission: true,
                ..CapabilityFlags::NONE
            },
            AudioSource::Default | AudioSource::Mic => CapabilityFlags {
                widely_supported: true,
                ..CapabilityFlags::NONE
            },
            AudioSource::Unprocessed | AudioSource::VoicePerformance => CapabilityFlags {
                limited_support: true,
                ..CapabilityFlags::NONE
            },
            AudioSource::Camcorder
            | AudioSource::VoiceRecognition
            | AudioSource::VoiceCommunication => CapabilityFlags::NONE,
        }
    }

    pub fn requires_elevated_permission(self) -> bool {
        self.flags().requires_elevated_permission
    }
}

capability_enum! {
    /// Where the recorder pulls its video frames from.
    VideoSource, "video source" {
        Default = 0 => "Default",
        Camera = 1 => "Camera",
        /// Frames rendered into the recorder's input surface
        Surface = 2 => "Surface",
    }
}

impl VideoSource {
    /// Classification flags for this source.
    pub fn flags(self) -> CapabilityFlags {
        match self {
            VideoSource::Surface => CapabilityFlags {
                widely_supported: true,
                ..CapabilityFlags::NONE
            },
            VideoSource::Default | VideoSource::Camera => CapabilityFlags::NONE,
        }
    }

    /// Whether a virtual display can render into this source.
    ///
    /// Screen capture composites into the recorder's input surface, so only
    /// `Surface` is usable for projection.
    pub fn supports_screen_capture(self) -> bool {
        self == VideoSource::Surface
    }
}
