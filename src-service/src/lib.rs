//! castkit capture service.
//!
//! Runs the capture session state machine on top of a projection platform:
//! redeems a capture grant, configures the recorder and virtual display,
//! enforces duration and file size limits, and tears everything down in a
//! fixed order when the session ends.

pub mod capture;
pub mod config;
pub mod logging;
pub mod output;
pub mod session;
pub mod state;
pub mod supervisor;
pub mod triggers;

pub use capture::{CaptureError, GrantToken, ProjectionPlatform};
pub use session::{init_session_manager, session_manager, SessionConfig, SessionManager};
pub use state::{
    FailureReason, FailureRecord, SessionError, SessionEvent, SessionState, Started, StopReason,
    Stopped,
};
