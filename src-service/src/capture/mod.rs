//! Projection platform interfaces.
//!
//! The session state machine drives the platform exclusively through these
//! traits. A platform binding implements them over the real projection,
//! recorder and display APIs; tests implement them with mocks.

pub mod error;
pub mod host;
pub mod types;

pub use error::CaptureError;
pub use host::{host_platform, HostPlatform};
pub use types::{
    DisplayMetrics, GrantToken, LimitKind, RecorderSettings, SessionSignal, SignalSender,
    SurfaceHandle, VideoTrackSettings, VirtualDisplaySpec,
};

/// Entry point to the platform's projection subsystem.
pub trait ProjectionPlatform: Send + Sync {
    /// Redeem a grant token for a live capture grant.
    ///
    /// `signals` must be used to report revocation of the grant.
    fn redeem_grant(
        &self,
        token: &GrantToken,
        signals: SignalSender,
    ) -> Result<Box<dyn ProjectionGrant>, CaptureError>;

    /// Current metrics of the display being projected.
    fn display_metrics(&self) -> Result<DisplayMetrics, CaptureError>;

    /// Create an unconfigured recorder.
    ///
    /// `signals` must be used to report runtime recorder errors and
    /// limit notifications.
    fn create_recorder(
        &self,
        signals: SignalSender,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError>;
}

/// A redeemed capture grant.
pub trait ProjectionGrant: Send {
    /// Create a virtual display rendering into `surface`.
    fn create_virtual_display(
        &mut self,
        spec: &VirtualDisplaySpec,
        surface: SurfaceHandle,
    ) -> Result<Box<dyn VirtualDisplay>, CaptureError>;

    /// Give the grant back to the platform.
    fn release(&mut self) -> Result<(), CaptureError>;
}

/// External encoder/muxer writing the output file.
pub trait MediaRecorder: Send {
    fn configure(&mut self, settings: &RecorderSettings) -> Result<(), CaptureError>;

    fn prepare(&mut self) -> Result<(), CaptureError>;

    /// Input surface for video frames. Only valid after `prepare`.
    fn surface(&self) -> Result<SurfaceHandle, CaptureError>;

    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop encoding and finalize the file. May block briefly.
    fn stop(&mut self) -> Result<(), CaptureError>;

    fn release(&mut self) -> Result<(), CaptureError>;
}

/// Off-screen display bound to a recorder surface.
pub trait VirtualDisplay: Send {
    fn release(&mut self) -> Result<(), CaptureError>;
}
