//! Session states, outcomes and events.

use crate::capture::LimitKind;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Why a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The grant token was denied, invalid or expired
    PermissionDenied,
    /// Output path, recorder setup, display creation or recorder start failed
    ConfigurationError,
    /// The recorder reported an error while recording
    EncoderError,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::PermissionDenied => write!(f, "permission denied"),
            FailureReason::ConfigurationError => write!(f, "configuration error"),
            FailureReason::EncoderError => write!(f, "encoder error"),
        }
    }
}

/// Why a recording ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "limit", rename_all = "snake_case")]
pub enum StopReason {
    CallerRequested,
    GrantRevoked,
    LimitReached(LimitKind),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::CallerRequested => write!(f, "stopped by caller"),
            StopReason::GrantRevoked => write!(f, "capture grant revoked"),
            StopReason::LimitReached(LimitKind::MaxDuration) => write!(f, "max duration reached"),
            StopReason::LimitReached(LimitKind::MaxFileSize) => write!(f, "max file size reached"),
        }
    }
}

/// Lifecycle state of the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingGrant,
    Configuring,
    Recording,
    Stopping,
    Failed(FailureReason),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::AwaitingGrant => write!(f, "awaiting grant"),
            SessionState::Configuring => write!(f, "configuring"),
            SessionState::Recording => write!(f, "recording"),
            SessionState::Stopping => write!(f, "stopping"),
            SessionState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Returned by a successful `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    pub output_path: PathBuf,
    /// Resolved video geometry, None for audio-only sessions
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub density_dpi: Option<u32>,
}

/// Returned by `stop` and carried by the stop event.
#[derive(Debug, Clone, PartialEq)]
pub struct Stopped {
    pub reason: StopReason,
    pub output_path: PathBuf,
    pub duration: Duration,
    /// Number of teardown steps that reported an error
    pub release_failures: usize,
}

/// Details of the most recent failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub reason: FailureReason,
    pub detail: String,
}

/// Events broadcast to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    Started { output_path: PathBuf },
    Stopped(Stopped),
    Failed { reason: FailureReason, detail: String },
}

/// Error returned by session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A session is already active or starting
    AlreadyRecording,
    /// No session is active
    NotRecording,
    PermissionDenied(String),
    Configuration(String),
    Encoder(String),
}

impl SessionError {
    /// Failure reason published for this error, if it ended a session.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            SessionError::PermissionDenied(_) => Some(FailureReason::PermissionDenied),
            SessionError::Configuration(_) => Some(FailureReason::ConfigurationError),
            SessionError::Encoder(_) => Some(FailureReason::EncoderError),
            SessionError::AlreadyRecording | SessionError::NotRecording => None,
        }
    }

    pub(crate) fn from_failure(reason: FailureReason, detail: String) -> Self {
        match reason {
            FailureReason::PermissionDenied => SessionError::PermissionDenied(detail),
            FailureReason::ConfigurationError => SessionError::Configuration(detail),
            FailureReason::EncoderError => SessionError::Encoder(detail),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyRecording => write!(f, "Already recording"),
            SessionError::NotRecording => write!(f, "Not recording"),
            SessionError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            SessionError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            SessionError::Encoder(msg) => write!(f, "Encoder error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}
