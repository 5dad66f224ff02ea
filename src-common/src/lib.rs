//! castkit common library
//!
//! Capability catalog, recording request types, validation and the flat wire
//! mapping shared by the capture service and its clients.

pub mod catalog;
pub mod display_flags;
pub mod logging;
pub mod types;
pub mod validation;
pub mod wire;

pub use catalog::{AudioEncoder, AudioSource, CapabilityFlags, OutputFormat, VideoEncoder, VideoSource};
pub use display_flags::VirtualDisplayFlags;
pub use types::*;
pub use validation::{validate, ValidationError, ValidationRule, ValidationWarning};
pub use wire::{WireError, WireRequest};
