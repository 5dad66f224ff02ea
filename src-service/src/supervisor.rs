//! Ownership and ordered teardown of a session's platform handles.

use crate::capture::{CaptureError, MediaRecorder, ProjectionGrant, VirtualDisplay};
use std::fmt;
use tracing::{debug, warn};

/// One step of the teardown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    StopRecorder,
    ReleaseRecorder,
    ReleaseDisplay,
    ReleaseGrant,
}

impl fmt::Display for ReleaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseStep::StopRecorder => "stop recorder",
            ReleaseStep::ReleaseRecorder => "release recorder",
            ReleaseStep::ReleaseDisplay => "release virtual display",
            ReleaseStep::ReleaseGrant => "release projection grant",
        };
        f.write_str(name)
    }
}

/// Outcome of a teardown pass.
#[derive(Debug, Default)]
pub struct ReleaseReport {
    /// Steps that were attempted, in order
    pub attempted: Vec<ReleaseStep>,
    /// Steps that reported an error
    pub failures: Vec<(ReleaseStep, CaptureError)>,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when the recorder stop itself failed, meaning the output file
    /// may be truncated.
    pub fn recorder_stop_failed(&self) -> bool {
        self.failures
            .iter()
            .any(|(step, _)| *step == ReleaseStep::StopRecorder)
    }

    fn run(&mut self, step: ReleaseStep, result: Result<(), CaptureError>) {
        self.attempted.push(step);
        match result {
            Ok(()) => debug!("Teardown: {} ok", step),
            Err(e) => {
                warn!("Teardown: {} failed: {}", step, e);
                self.failures.push((step, e));
            }
        }
    }
}

/// Holds every platform handle acquired by a session.
///
/// Handles are taken out as they are released, so [`release_all`] is safe
/// to call any number of times.
///
/// [`release_all`]: ResourceSupervisor::release_all
#[derive(Default)]
pub struct ResourceSupervisor {
    grant: Option<Box<dyn ProjectionGrant>>,
    recorder: Option<Box<dyn MediaRecorder>>,
    recorder_started: bool,
    display: Option<Box<dyn VirtualDisplay>>,
}

impl ResourceSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_grant(&mut self, grant: Box<dyn ProjectionGrant>) {
        self.grant = Some(grant);
    }

    pub fn attach_recorder(&mut self, recorder: Box<dyn MediaRecorder>) {
        self.recorder = Some(recorder);
        self.recorder_started = false;
    }

    pub fn attach_display(&mut self, display: Box<dyn VirtualDisplay>) {
        self.display = Some(display);
    }

    pub fn grant_mut(&mut self) -> Option<&mut (dyn ProjectionGrant + 'static)> {
        self.grant.as_deref_mut()
    }

    pub fn recorder_mut(&mut self) -> Option<&mut (dyn MediaRecorder + 'static)> {
        self.recorder.as_deref_mut()
    }

    /// Mark the recorder as started so teardown stops it before release.
    pub fn mark_recorder_started(&mut self) {
        self.recorder_started = true;
    }

    pub fn holds_resources(&self) -> bool {
        self.grant.is_some() || self.recorder.is_some() || self.display.is_some()
    }

    /// Release everything in fixed order: stop recorder (only if started),
    /// release recorder, release display, release grant.
    ///
    /// Every step runs even if an earlier one failed.
    pub fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();

        if let Some(mut recorder) = self.recorder.take() {
            if std::mem::take(&mut self.recorder_started) {
                report.run(ReleaseStep::StopRecorder, recorder.stop());
            }
            report.run(ReleaseStep::ReleaseRecorder, recorder.release());
        }
        if let Some(mut display) = self.display.take() {
            report.run(ReleaseStep::ReleaseDisplay, display.release());
        }
        if let Some(mut grant) = self.grant.take() {
            report.run(ReleaseStep::ReleaseGrant, grant.release());
        }

        report
    }
}

impl Drop for ResourceSupervisor {
    fn drop(&mut self) {
        if self.holds_resources() {
            warn!("Resource supervisor dropped while holding handles, releasing");
            self.release_all();
        }
    }
}
