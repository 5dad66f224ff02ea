//! Capability catalog.
//!
//! Static knowledge of the sources, encoders and container formats the
//! projection subsystem understands. Every entry is keyed by the platform's
//! stable integer identifier, which is also what goes over the wire.

use serde::Serialize;

/// Error returned when an integer does not name a known capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownIdentifier {
    /// Kind of capability that was being looked up (e.g. "audio encoder")
    pub kind: &'static str,
    /// The unrecognised identifier
    pub id: i32,
}

impl std::fmt::Display for UnknownIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown {} identifier: {}", self.kind, self.id)
    }
}

impl std::error::Error for UnknownIdentifier {}

/// Classification flags attached to catalog entries.
///
/// Not every flag is meaningful for every kind of entry; unused flags stay
/// `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityFlags {
    /// Source needs a privileged permission beyond the capture grant
    pub requires_elevated_permission: bool,
    /// Deprecated or kept only for old devices
    pub legacy: bool,
    /// Available on a minority of devices
    pub limited_support: bool,
    /// Safe choice on practically every device
    pub widely_supported: bool,
    /// Container can carry a video track
    pub supports_video: bool,
    /// Container can be written with a single audio track
    pub audio_only_capable: bool,
}

impl CapabilityFlags {
    /// All flags cleared.
    pub const NONE: CapabilityFlags = CapabilityFlags {
        requires_elevated_permission: false,
        legacy: false,
        limited_support: false,
        widely_supported: false,
        supports_video: false,
        audio_only_capable: false,
    };
}

/// Declares a closed capability enum with its integer id and display name.
///
/// Generates `ALL`, `id`, `display_name`, `from_id`, the `i32` conversions
/// used by serde, and `Display`.
macro_rules! capability_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $id:literal => $display:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "i32", into = "i32")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in identifier order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Platform integer identifier.
            pub fn id(self) -> i32 {
                match self {
                    $($name::$variant => $id,)+
                }
            }

            /// Human readable name.
            pub fn display_name(self) -> &'static str {
                match self {
                    $($name::$variant => $display,)+
                }
            }

            /// Look up a variant by its platform identifier.
            pub fn from_id(id: i32) -> Option<Self> {
                match id {
                    $($id => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = $crate::catalog::UnknownIdentifier;

            fn try_from(id: i32) -> Result<Self, Self::Error> {
                $name::from_id(id).ok_or($crate::catalog::UnknownIdentifier { kind: $kind, id })
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                value.id()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.display_name())
            }
        }
    };
}

mod encoders;
mod formats;
mod sources;

pub use encoders::{AudioEncoder, VideoEncoder};
pub use formats::OutputFormat;
pub use sources::{AudioSource, VideoSource};
