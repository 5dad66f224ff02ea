//! Platform binding for hosts without a screen projection subsystem.
//!
//! Desktop builds of the service have no way to redeem a projection grant,
//! so every session is refused at the grant step. The session manager still
//! runs, validates and reports, which keeps the service usable for
//! configuration checks and for driving it from tests.

use super::{
    CaptureError, DisplayMetrics, GrantToken, MediaRecorder, ProjectionGrant, ProjectionPlatform,
    SignalSender,
};
use tracing::warn;

/// Error code reported for operations the host cannot perform.
pub const UNSUPPORTED: i32 = -38;

/// Projection platform of a host without projection support.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostPlatform;

fn unsupported(operation: &str) -> CaptureError {
    CaptureError::PlatformError {
        code: UNSUPPORTED,
        message: format!("{} is not available on this host", operation),
    }
}

impl ProjectionPlatform for HostPlatform {
    fn redeem_grant(
        &self,
        _token: &GrantToken,
        _signals: SignalSender,
    ) -> Result<Box<dyn ProjectionGrant>, CaptureError> {
        warn!("Capture grant refused: no projection subsystem on this host");
        Err(CaptureError::PermissionDenied(
            "no projection subsystem on this host".to_string(),
        ))
    }

    fn display_metrics(&self) -> Result<DisplayMetrics, CaptureError> {
        Err(unsupported("Display metrics"))
    }

    fn create_recorder(
        &self,
        _signals: SignalSender,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError> {
        Err(unsupported("Media recording"))
    }
}

/// The platform binding for the current host.
pub fn host_platform() -> HostPlatform {
    HostPlatform
}
