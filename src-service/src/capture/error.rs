//! Error types for capture operations.

use std::fmt;

/// Error reported by the projection platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The capture grant was refused, revoked or has expired
    PermissionDenied(String),
    /// Platform-specific failure with its error code
    PlatformError { code: i32, message: String },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            CaptureError::PlatformError { code, message } => {
                write!(f, "Platform error {}: {}", code, message)
            }
        }
    }
}

impl std::error::Error for CaptureError {}
