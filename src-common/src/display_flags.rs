//! Virtual display behaviour flags.

use serde::{Deserialize, Serialize};

const PUBLIC: i32 = 1 << 0;
const PRESENTATION: i32 = 1 << 1;
const SECURE: i32 = 1 << 2;
const OWN_CONTENT_ONLY: i32 = 1 << 3;
const AUTO_MIRROR: i32 = 1 << 4;

const KNOWN_BITS: i32 = PUBLIC | PRESENTATION | SECURE | OWN_CONTENT_ONLY | AUTO_MIRROR;

/// Independent behaviours requested for the virtual display.
///
/// Serialized as the platform's integer bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct VirtualDisplayFlags {
    /// Other apps may show content on the display
    pub public: bool,
    /// Display is intended for presentations
    pub presentation: bool,
    /// Display may show secure surfaces
    pub secure: bool,
    /// Only the owner's content is shown, never mirrored content
    pub own_content_only: bool,
    /// Mirror the default display when there is no own content
    pub auto_mirror: bool,
}

/// Error returned for bitmasks containing bits no flag maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownFlagBits(pub i32);

impl std::fmt::Display for UnknownFlagBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown virtual display flag bits: {:#x}", self.0)
    }
}

impl std::error::Error for UnknownFlagBits {}

impl VirtualDisplayFlags {
    /// No behaviours enabled.
    pub const fn empty() -> Self {
        Self {
            public: false,
            presentation: false,
            secure: false,
            own_content_only: false,
            auto_mirror: false,
        }
    }

    /// Build the platform bitmask.
    pub fn to_bits(self) -> i32 {
        let mut bits = 0;
        if self.public {
            bits |= PUBLIC;
        }
        if self.presentation {
            bits |= PRESENTATION;
        }
        if self.secure {
            bits |= SECURE;
        }
        if self.own_content_only {
            bits |= OWN_CONTENT_ONLY;
        }
        if self.auto_mirror {
            bits |= AUTO_MIRROR;
        }
        bits
    }

    /// Decode a platform bitmask, rejecting unknown bits.
    pub fn from_bits(bits: i32) -> Result<Self, UnknownFlagBits> {
        let unknown = bits & !KNOWN_BITS;
        if unknown != 0 {
            return Err(UnknownFlagBits(unknown));
        }
        Ok(Self {
            public: bits & PUBLIC != 0,
            presentation: bits & PRESENTATION != 0,
            secure: bits & SECURE != 0,
            own_content_only: bits & OWN_CONTENT_ONLY != 0,
            auto_mirror: bits & AUTO_MIRROR != 0,
        })
    }
}

impl Default for VirtualDisplayFlags {
    fn default() -> Self {
        Self {
            auto_mirror: true,
            ..Self::empty()
        }
    }
}

impl TryFrom<i32> for VirtualDisplayFlags {
    type Error = UnknownFlagBits;

    fn try_from(bits: i32) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
    }
}

impl From<VirtualDisplayFlags> for i32 {
    fn from(flags: VirtualDisplayFlags) -> i32 {
        flags.to_bits()
    }
}
