//! Capture session state machine.
//!
//! A [`SessionManager`] owns at most one capture session. Every transition
//! runs under one async mutex: `start`, `stop`, and the per-session signal
//! pump that funnels recorder errors, grant revocation and limit triggers
//! into the same `finish` path.

use crate::capture::{
    DisplayMetrics, GrantToken, ProjectionPlatform, RecorderSettings, SessionSignal, SignalSender,
    VirtualDisplaySpec,
};
use crate::config::default_cache_dir;
use crate::output::resolve_output_path;
use crate::state::{
    FailureReason, FailureRecord, SessionError, SessionEvent, SessionState, Started, StopReason,
    Stopped,
};
use crate::supervisor::ResourceSupervisor;
use crate::triggers::LimitTriggers;
use castkit_common::NormalizedRequest;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

/// Name given to the virtual display backing a capture.
pub const VIRTUAL_DISPLAY_NAME: &str = "castkit-capture";

/// Runtime settings for the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory for captures whose request names none
    pub cache_directory: PathBuf,
    /// Poll interval of the max-file-size trigger
    pub file_size_poll: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_directory: default_cache_dir(),
            file_size_poll: Duration::from_millis(500),
        }
    }
}

/// The live session held in the manager's slot.
struct ActiveSession {
    generation: u64,
    output_path: PathBuf,
    supervisor: ResourceSupervisor,
    triggers: LimitTriggers,
    started_at: Instant,
    pump_shutdown: Option<oneshot::Sender<()>>,
}

/// How a session ends.
enum Ending {
    Stop(StopReason),
    Fail(FailureReason, String),
}

struct Inner {
    platform: Arc<dyn ProjectionPlatform>,
    config: SessionConfig,
    /// Held for the whole of a start; a second start fails fast on it
    start_gate: Mutex<()>,
    /// Transition lock and session slot
    slot: Mutex<Option<ActiveSession>>,
    state_tx: watch::Sender<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
    generation: AtomicU64,
    last_failure: RwLock<Option<FailureRecord>>,
    recording_start: RwLock<Option<Instant>>,
}

/// Drives the capture lifecycle against a projection platform.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(platform: Arc<dyn ProjectionPlatform>, config: SessionConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (event_tx, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(Inner {
                platform,
                config,
                start_gate: Mutex::new(()),
                slot: Mutex::new(None),
                state_tx,
                event_tx,
                generation: AtomicU64::new(0),
                last_failure: RwLock::new(None),
                recording_start: RwLock::new(None),
            }),
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.inner.state_tx.borrow()
    }

    /// Watch state changes. The receiver always holds the latest state.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Reason and detail of the most recent failure, if any.
    pub async fn last_failure(&self) -> Option<FailureRecord> {
        self.inner.last_failure.read().await.clone()
    }

    /// Time since the active recording started.
    pub async fn elapsed(&self) -> Option<Duration> {
        self.inner.recording_start.read().await.map(|t| t.elapsed())
    }

    /// Start a capture.
    ///
    /// Fails with [`SessionError::AlreadyRecording`] without touching the
    /// active session if one exists or another start is in flight. A start
    /// issued while a session is being torn down waits for the teardown to
    /// finish. Any other failure releases everything acquired so far and
    /// leaves the manager idle.
    pub async fn start(
        &self,
        request: NormalizedRequest,
        token: GrantToken,
    ) -> Result<Started, SessionError> {
        let inner = &self.inner;
        let gate = inner
            .start_gate
            .try_lock()
            .map_err(|_| SessionError::AlreadyRecording)?;
        let mut slot = inner.slot.lock().await;
        if slot.is_some() {
            return Err(SessionError::AlreadyRecording);
        }

        for warning in request.warnings() {
            warn!("Capture request warning: {}", warning);
        }

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let signals = SignalSender::new(generation, signal_tx);
        let mut supervisor = ResourceSupervisor::new();

        info!("Starting capture session {}", generation);
        inner.set_state(SessionState::AwaitingGrant);
        match inner.platform.redeem_grant(&token, signals.clone()) {
            Ok(grant) => supervisor.attach_grant(grant),
            Err(e) => {
                return Err(inner
                    .fail_start(gate, &mut supervisor, FailureReason::PermissionDenied, e.to_string())
                    .await)
            }
        }

        inner.set_state(SessionState::Configuring);
        let (output_path, display) =
            match inner.configure(&request, &mut supervisor, signals.clone()) {
                Ok(configured) => configured,
                Err(detail) => {
                    return Err(inner
                        .fail_start(gate, &mut supervisor, FailureReason::ConfigurationError, detail)
                        .await)
                }
            };

        let triggers = LimitTriggers::arm(
            request.max_duration(),
            request.max_file_size().map(|limit| (output_path.clone(), limit)),
            inner.config.file_size_poll,
            signals,
        );

        let started = match supervisor.recorder_mut() {
            Some(recorder) => recorder.start().map_err(|e| e.to_string()),
            None => Err("Recorder missing".to_string()),
        };
        if let Err(detail) = started {
            drop(triggers);
            return Err(inner
                .fail_start(
                    gate,
                    &mut supervisor,
                    FailureReason::ConfigurationError,
                    format!("Failed to start recorder: {}", detail),
                )
                .await);
        }
        supervisor.mark_recorder_started();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(pump_signals(
            Arc::downgrade(inner),
            generation,
            signal_rx,
            shutdown_rx,
        ));

        let started_at = Instant::now();
        *slot = Some(ActiveSession {
            generation,
            output_path: output_path.clone(),
            supervisor,
            triggers,
            started_at,
            pump_shutdown: Some(shutdown_tx),
        });
        // Later starts now queue on the slot and see it occupied
        drop(gate);
        *inner.recording_start.write().await = Some(started_at);

        info!("Recording to {:?}", output_path);
        inner.set_state(SessionState::Recording);
        inner.broadcast(SessionEvent::Started {
            output_path: output_path.clone(),
        });

        Ok(Started {
            output_path,
            width: display.map(|d| d.width),
            height: display.map(|d| d.height),
            density_dpi: display.map(|d| d.density_dpi),
        })
    }

    /// Stop the active capture and release every resource.
    ///
    /// Waits for an in-flight `start` to finish, then stops what it produced.
    pub async fn stop(&self) -> Result<Stopped, SessionError> {
        self.inner
            .finish(None, Ending::Stop(StopReason::CallerRequested))
            .await
    }
}

impl Inner {
    fn broadcast(&self, event: SessionEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.event_tx.send(event);
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
        debug!("Session state: {}", state);
        self.broadcast(SessionEvent::StateChanged(state));
    }

    async fn record_failure(&self, reason: FailureReason, detail: &str) {
        *self.last_failure.write().await = Some(FailureRecord {
            reason,
            detail: detail.to_string(),
        });
    }

    /// Publish a failure after teardown, then reset to idle.
    async fn publish_failure(&self, reason: FailureReason, detail: String) -> SessionError {
        self.record_failure(reason, &detail).await;
        self.set_state(SessionState::Failed(reason));
        self.broadcast(SessionEvent::Failed {
            reason,
            detail: detail.clone(),
        });
        self.set_state(SessionState::Idle);
        SessionError::from_failure(reason, detail)
    }

    async fn fail_start(
        &self,
        gate: MutexGuard<'_, ()>,
        supervisor: &mut ResourceSupervisor,
        reason: FailureReason,
        detail: String,
    ) -> SessionError {
        error!("Capture start failed ({}): {}", reason, detail);
        let report = supervisor.release_all();
        if !report.is_clean() {
            warn!("{} teardown step(s) failed during rollback", report.failures.len());
        }
        // Open the gate before Idle is visible; the slot is still held, so a
        // start woken by Idle queues behind this one
        drop(gate);
        self.publish_failure(reason, detail).await
    }

    /// Resolve geometry and output path, then create, configure and prepare
    /// the recorder and bind the virtual display to its surface.
    fn configure(
        &self,
        request: &NormalizedRequest,
        supervisor: &mut ResourceSupervisor,
        signals: SignalSender,
    ) -> Result<(PathBuf, Option<DisplayMetrics>), String> {
        let display = match request.video() {
            Some(video) => {
                let resolved = match (video.width(), video.height(), video.density_dpi()) {
                    (Some(width), Some(height), Some(density_dpi)) => DisplayMetrics {
                        width,
                        height,
                        density_dpi,
                    },
                    (width, height, density_dpi) => {
                        let live = self
                            .platform
                            .display_metrics()
                            .map_err(|e| format!("Failed to read display metrics: {}", e))?;
                        DisplayMetrics {
                            width: width.unwrap_or(live.width),
                            height: height.unwrap_or(live.height),
                            density_dpi: density_dpi.unwrap_or(live.density_dpi),
                        }
                    }
                };
                Some(resolved)
            }
            None => None,
        };

        let output_path = resolve_output_path(
            request.output_directory(),
            request.file_name(),
            request.format(),
            &self.config.cache_directory,
        )
        .map_err(|e| e.to_string())?;

        let recorder = self
            .platform
            .create_recorder(signals)
            .map_err(|e| format!("Failed to create recorder: {}", e))?;
        supervisor.attach_recorder(recorder);

        let settings = RecorderSettings::new(request, display.as_ref(), output_path.clone());
        let surface = {
            let recorder = supervisor.recorder_mut().ok_or("Recorder missing")?;
            recorder
                .configure(&settings)
                .map_err(|e| format!("Failed to configure recorder: {}", e))?;
            recorder
                .prepare()
                .map_err(|e| format!("Failed to prepare recorder: {}", e))?;
            match (request.video(), display) {
                (Some(_), Some(_)) => Some(
                    recorder
                        .surface()
                        .map_err(|e| format!("Recorder surface unavailable: {}", e))?,
                ),
                _ => None,
            }
        };

        if let (Some(video), Some(metrics), Some(surface)) = (request.video(), display, surface) {
            let spec = VirtualDisplaySpec {
                name: VIRTUAL_DISPLAY_NAME.to_string(),
                width: metrics.width,
                height: metrics.height,
                density_dpi: metrics.density_dpi,
                flags: video.display_flags(),
            };
            let grant = supervisor.grant_mut().ok_or("Projection grant missing")?;
            let virtual_display = grant
                .create_virtual_display(&spec, surface)
                .map_err(|e| format!("Failed to create virtual display: {}", e))?;
            supervisor.attach_display(virtual_display);
        }

        Ok((output_path, display))
    }

    /// Serialized teardown. `expected_generation` is set for platform and
    /// trigger signals; a mismatch means the signal belongs to an earlier
    /// session and is ignored.
    ///
    /// Idle is published under the slot lock, so a start racing it waits
    /// here instead of overlapping the next session's states.
    async fn finish(
        &self,
        expected_generation: Option<u64>,
        ending: Ending,
    ) -> Result<Stopped, SessionError> {
        let mut slot = self.slot.lock().await;
        let is_current = match (slot.as_ref(), expected_generation) {
            (None, _) => false,
            (Some(active), Some(generation)) => active.generation == generation,
            (Some(_), None) => true,
        };
        if !is_current {
            if let Some(generation) = expected_generation {
                debug!("Ignoring signal from stale session {}", generation);
            }
            return Err(SessionError::NotRecording);
        }
        let Some(mut active) = slot.take() else {
            return Err(SessionError::NotRecording);
        };

        if let Ending::Stop(reason) = &ending {
            info!("Stopping capture session {}: {}", active.generation, reason);
            self.set_state(SessionState::Stopping);
        }
        active.triggers.disarm();
        drop(active.pump_shutdown.take());

        let report = active.supervisor.release_all();
        if report.recorder_stop_failed() {
            warn!("Recorder stop failed, {:?} may be truncated", active.output_path);
        }
        let duration = active.started_at.elapsed();
        *self.recording_start.write().await = None;

        match ending {
            Ending::Stop(reason) => {
                let stopped = Stopped {
                    reason,
                    output_path: active.output_path,
                    duration,
                    release_failures: report.failures.len(),
                };
                info!(
                    "Capture session {} stopped after {:.1}s",
                    active.generation,
                    duration.as_secs_f64()
                );
                self.broadcast(SessionEvent::Stopped(stopped.clone()));
                self.set_state(SessionState::Idle);
                Ok(stopped)
            }
            Ending::Fail(reason, detail) => {
                error!("Capture session {} failed ({}): {}", active.generation, reason, detail);
                Err(self.publish_failure(reason, detail).await)
            }
        }
    }
}

/// Forward the first signal of a session into `finish`.
async fn pump_signals(
    inner: Weak<Inner>,
    generation: u64,
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let signal = tokio::select! {
        _ = &mut shutdown => return,
        signal = signals.recv() => match signal {
            Some(signal) => signal,
            None => return,
        },
    };
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let ending = match signal {
        SessionSignal::GrantRevoked => Ending::Stop(StopReason::GrantRevoked),
        SessionSignal::LimitReached(kind) => Ending::Stop(StopReason::LimitReached(kind)),
        SessionSignal::RecorderError { code, detail } => Ending::Fail(
            FailureReason::EncoderError,
            format!("Recorder error {}: {}", code, detail),
        ),
    };
    // Outcome is published through events
    let _ = inner.finish(Some(generation), ending).await;
}

static SESSION_MANAGER: OnceLock<SessionManager> = OnceLock::new();

/// Install the process-wide session manager.
///
/// The first call wins; later calls return the existing manager and drop
/// their arguments.
pub fn init_session_manager(
    platform: Arc<dyn ProjectionPlatform>,
    config: SessionConfig,
) -> &'static SessionManager {
    SESSION_MANAGER.get_or_init(|| SessionManager::new(platform, config))
}

/// The process-wide session manager, if installed.
pub fn session_manager() -> Option<&'static SessionManager> {
    SESSION_MANAGER.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        CaptureError, LimitKind, MediaRecorder, ProjectionGrant, SurfaceHandle, VirtualDisplay,
    };
    use castkit_common::{validate, MediaProjectionRequest, OutputFormat, VideoRecordingProps};
    use std::sync::Mutex as StdMutex;

    #[derive(Default, Clone)]
    struct Script {
        deny_grant: bool,
        fail_prepare: bool,
        fail_display: bool,
        fail_start: bool,
        fail_stop: bool,
        write_on_start: Option<usize>,
    }

    #[derive(Default)]
    struct Shared {
        script: Script,
        log: StdMutex<Vec<&'static str>>,
        settings: StdMutex<Option<RecorderSettings>>,
        display_spec: StdMutex<Option<VirtualDisplaySpec>>,
        grant_signals: StdMutex<Option<SignalSender>>,
        recorder_signals: StdMutex<Option<SignalSender>>,
    }

    impl Shared {
        fn push(&self, call: &'static str) {
            self.log.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls().iter().filter(|c| **c == call).count()
        }
    }

    struct MockPlatform(Arc<Shared>);
    struct MockGrant(Arc<Shared>);
    struct MockRecorder(Arc<Shared>);
    struct MockDisplay(Arc<Shared>);

    fn platform_error(message: &str) -> CaptureError {
        CaptureError::PlatformError {
            code: -1,
            message: message.to_string(),
        }
    }

    impl ProjectionPlatform for MockPlatform {
        fn redeem_grant(
            &self,
            _token: &GrantToken,
            signals: SignalSender,
        ) -> Result<Box<dyn ProjectionGrant>, CaptureError> {
            self.0.push("redeem_grant");
            if self.0.script.deny_grant {
                return Err(CaptureError::PermissionDenied("user declined".into()));
            }
            *self.0.grant_signals.lock().unwrap() = Some(signals);
            Ok(Box::new(MockGrant(self.0.clone())))
        }

        fn display_metrics(&self) -> Result<DisplayMetrics, CaptureError> {
            self.0.push("display_metrics");
            Ok(DisplayMetrics {
                width: 1080,
                height: 2340,
                density_dpi: 420,
            })
        }

        fn create_recorder(
            &self,
            signals: SignalSender,
        ) -> Result<Box<dyn MediaRecorder>, CaptureError> {
            self.0.push("create_recorder");
            *self.0.recorder_signals.lock().unwrap() = Some(signals);
            Ok(Box::new(MockRecorder(self.0.clone())))
        }
    }

    impl ProjectionGrant for MockGrant {
        fn create_virtual_display(
            &mut self,
            spec: &VirtualDisplaySpec,
            _surface: SurfaceHandle,
        ) -> Result<Box<dyn VirtualDisplay>, CaptureError> {
            self.0.push("create_virtual_display");
            if self.0.script.fail_display {
                return Err(platform_error("display refused"));
            }
            *self.0.display_spec.lock().unwrap() = Some(spec.clone());
            Ok(Box::new(MockDisplay(self.0.clone())))
        }

        fn release(&mut self) -> Result<(), CaptureError> {
            self.0.push("grant.release");
            Ok(())
        }
    }

    impl MediaRecorder for MockRecorder {
        fn configure(&mut self, settings: &RecorderSettings) -> Result<(), CaptureError> {
            self.0.push("configure");
            *self.0.settings.lock().unwrap() = Some(settings.clone());
            Ok(())
        }

        fn prepare(&mut self) -> Result<(), CaptureError> {
            self.0.push("prepare");
            if self.0.script.fail_prepare {
                return Err(platform_error("prepare failed"));
            }
            Ok(())
        }

        fn surface(&self) -> Result<SurfaceHandle, CaptureError> {
            self.0.push("surface");
            Ok(SurfaceHandle(7))
        }

        fn start(&mut self) -> Result<(), CaptureError> {
            self.0.push("start");
            if self.0.script.fail_start {
                return Err(platform_error("start failed"));
            }
            if let Some(bytes) = self.0.script.write_on_start {
                let path = self
                    .0
                    .settings
                    .lock()
                    .unwrap()
                    .as_ref()
                    .map(|s| s.output_path.clone())
                    .unwrap();
                std::fs::write(path, vec![0u8; bytes]).unwrap();
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), CaptureError> {
            self.0.push("recorder.stop");
            if self.0.script.fail_stop {
                return Err(platform_error("stop failed"));
            }
            Ok(())
        }

        fn release(&mut self) -> Result<(), CaptureError> {
            self.0.push("recorder.release");
            Ok(())
        }
    }

    impl VirtualDisplay for MockDisplay {
        fn release(&mut self) -> Result<(), CaptureError> {
            self.0.push("display.release");
            Ok(())
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("castkit-session-{}-{}", tag, std::process::id()))
    }

    fn manager(script: Script, tag: &str) -> (SessionManager, Arc<Shared>) {
        let shared = Arc::new(Shared {
            script,
            ..Default::default()
        });
        let config = SessionConfig {
            cache_directory: temp_dir(tag),
            file_size_poll: Duration::from_millis(10),
        };
        let manager = SessionManager::new(Arc::new(MockPlatform(shared.clone())), config);
        (manager, shared)
    }

    fn base_request(tag: &str) -> MediaProjectionRequest {
        MediaProjectionRequest::default()
            .with_output_directory(temp_dir(tag))
            .with_file_name(format!("{}.mp4", tag))
    }

    fn token() -> GrantToken {
        GrantToken::new(-1, serde_json::json!({"grant": "ok"}))
    }

    async fn next_outcome(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                match rx.recv().await.unwrap() {
                    SessionEvent::StateChanged(_) | SessionEvent::Started { .. } => continue,
                    other => return other,
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let (manager, mock) = manager(Script::default(), "lifecycle");
        let request = validate(&base_request("lifecycle")).unwrap();

        let started = manager.start(request, token()).await.unwrap();
        assert_eq!(started.output_path, temp_dir("lifecycle").join("lifecycle.mp4"));
        assert_eq!(started.width, Some(1080));
        assert_eq!(started.density_dpi, Some(420));
        assert_eq!(manager.state(), SessionState::Recording);
        assert!(manager.elapsed().await.is_some());
        assert_eq!(
            mock.calls(),
            vec![
                "redeem_grant",
                "display_metrics",
                "create_recorder",
                "configure",
                "prepare",
                "surface",
                "create_virtual_display",
                "start"
            ]
        );

        let spec = mock.display_spec.lock().unwrap().clone().unwrap();
        assert_eq!(spec.name, VIRTUAL_DISPLAY_NAME);
        assert_eq!((spec.width, spec.height), (1080, 2340));
        assert!(spec.flags.auto_mirror);

        let stopped = manager.stop().await.unwrap();
        assert_eq!(stopped.reason, StopReason::CallerRequested);
        assert_eq!(stopped.output_path, started.output_path);
        assert_eq!(stopped.release_failures, 0);
        assert_eq!(manager.state(), SessionState::Idle);
        assert!(manager.elapsed().await.is_none());
        assert_eq!(
            mock.calls()[8..],
            [
                "recorder.stop",
                "recorder.release",
                "display.release",
                "grant.release"
            ]
        );
        let _ = std::fs::remove_dir_all(temp_dir("lifecycle"));
    }

    #[tokio::test]
    async fn test_recorder_receives_every_field() {
        let (manager, mock) = manager(Script::default(), "settings");
        let request = base_request("settings").with_max_duration_ms(60_000);
        let request = validate(&request).unwrap();

        manager.start(request, token()).await.unwrap();
        let settings = mock.settings.lock().unwrap().clone().unwrap();
        let video = settings.video.unwrap();
        assert_eq!(settings.format, OutputFormat::Mpeg4);
        assert_eq!(video.fps, 30);
        assert_eq!(video.bitrate, 8_000_000);
        assert_eq!(settings.audio_sample_rate, 44_100);
        assert_eq!(settings.max_duration, Some(Duration::from_secs(60)));

        manager.stop().await.unwrap();
        let _ = std::fs::remove_dir_all(temp_dir("settings"));
    }

    #[tokio::test]
    async fn test_stop_when_idle() {
        let (manager, mock) = manager(Script::default(), "idle");
        assert_eq!(manager.stop().await.unwrap_err(), SessionError::NotRecording);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_while_recording_is_rejected() {
        let (manager, mock) = manager(Script::default(), "busy");
        let request = validate(&base_request("busy")).unwrap();

        manager.start(request.clone(), token()).await.unwrap();
        let err = manager.start(request, token()).await.unwrap_err();
        assert_eq!(err, SessionError::AlreadyRecording);
        assert_eq!(manager.state(), SessionState::Recording);
        assert_eq!(mock.count("redeem_grant"), 1);

        manager.stop().await.unwrap();
        let _ = std::fs::remove_dir_all(temp_dir("busy"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_admit_one() {
        let (manager, mock) = manager(Script::default(), "race");
        let mut events = manager.subscribe();
        let request = validate(&base_request("race")).unwrap();
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let manager = manager.clone();
                let request = request.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    manager.start(request, token()).await
                })
            })
            .collect();
        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(SessionError::AlreadyRecording))));
        assert_eq!(mock.count("redeem_grant"), 1);

        let mut started = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::Started { .. }) {
                started += 1;
            }
        }
        assert_eq!(started, 1);

        manager.stop().await.unwrap();
        let _ = std::fs::remove_dir_all(temp_dir("race"));
    }

    /// A start issued the moment Idle is observed after a limit stop must be
    /// admitted.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_admitted_once_idle_after_limit_stop() {
        let (manager, _mock) = manager(Script::default(), "reidle");
        let request = validate(&base_request("reidle").with_max_duration_ms(1)).unwrap();
        let mut state = manager.watch_state();

        let mut refused = 0;
        for _ in 0..50 {
            match manager.start(request.clone(), token()).await {
                Ok(_) => {}
                Err(SessionError::AlreadyRecording) => refused += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
            tokio::time::timeout(
                Duration::from_secs(30),
                state.wait_for(|s| *s == SessionState::Idle),
            )
            .await
            .unwrap()
            .unwrap();
        }
        assert_eq!(refused, 0);
        let _ = std::fs::remove_dir_all(temp_dir("reidle"));
    }

    /// Same as above, for the Idle published by a failed start.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_admitted_once_idle_after_failed_start() {
        let script = Script {
            deny_grant: true,
            ..Default::default()
        };
        let (manager, _mock) = manager(script, "refail");
        let request = validate(&base_request("refail")).unwrap();

        for _ in 0..50 {
            let mut state = manager.watch_state();
            state.borrow_and_update();
            let follower = {
                let manager = manager.clone();
                let request = request.clone();
                tokio::spawn(async move {
                    loop {
                        state.changed().await.unwrap();
                        if *state.borrow_and_update() == SessionState::Idle {
                            break;
                        }
                    }
                    manager.start(request, token()).await
                })
            };

            let first = manager.start(request.clone(), token()).await;
            assert!(matches!(first, Err(SessionError::PermissionDenied(_))));
            let second = tokio::time::timeout(Duration::from_secs(30), follower)
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(second, Err(SessionError::PermissionDenied(_))));
        }
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let script = Script {
            deny_grant: true,
            ..Default::default()
        };
        let (manager, mock) = manager(script, "denied");
        let mut events = manager.subscribe();
        let request = validate(&base_request("denied")).unwrap();

        let err = manager.start(request, token()).await.unwrap_err();
        assert!(matches!(err, SessionError::PermissionDenied(_)));
        assert_eq!(manager.state(), SessionState::Idle);
        assert_eq!(mock.calls(), vec!["redeem_grant"]);

        let failure = manager.last_failure().await.unwrap();
        assert_eq!(failure.reason, FailureReason::PermissionDenied);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen[0],
            SessionEvent::StateChanged(SessionState::AwaitingGrant)
        );
        assert_eq!(
            seen[1],
            SessionEvent::StateChanged(SessionState::Failed(FailureReason::PermissionDenied))
        );
        assert!(matches!(seen[2], SessionEvent::Failed { reason: FailureReason::PermissionDenied, .. }));
        assert_eq!(seen[3], SessionEvent::StateChanged(SessionState::Idle));
    }

    #[tokio::test]
    async fn test_prepare_failure_rolls_back() {
        let script = Script {
            fail_prepare: true,
            ..Default::default()
        };
        let (manager, mock) = manager(script, "prepare");
        let request = validate(&base_request("prepare")).unwrap();

        let err = manager.start(request, token()).await.unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
        assert_eq!(manager.state(), SessionState::Idle);
        assert_eq!(mock.count("grant.release"), 1);
        assert_eq!(mock.count("recorder.release"), 1);
        assert_eq!(mock.count("recorder.stop"), 0);
        assert_eq!(
            manager.last_failure().await.unwrap().reason,
            FailureReason::ConfigurationError
        );
        let _ = std::fs::remove_dir_all(temp_dir("prepare"));
    }

    #[tokio::test]
    async fn test_display_failure_rolls_back() {
        let script = Script {
            fail_display: true,
            ..Default::default()
        };
        let (manager, mock) = manager(script, "display");
        let request = validate(&base_request("display")).unwrap();

        let err = manager.start(request, token()).await.unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
        assert_eq!(mock.count("start"), 0);
        assert_eq!(mock.count("grant.release"), 1);
        assert_eq!(mock.count("display.release"), 0);
        let _ = std::fs::remove_dir_all(temp_dir("display"));
    }

    #[tokio::test]
    async fn test_recorder_start_failure_rolls_back() {
        let script = Script {
            fail_start: true,
            ..Default::default()
        };
        let (manager, mock) = manager(script, "startfail");
        let request = validate(&base_request("startfail")).unwrap();

        let err = manager.start(request, token()).await.unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
        assert_eq!(mock.count("recorder.stop"), 0);
        assert_eq!(mock.count("display.release"), 1);
        assert_eq!(mock.count("grant.release"), 1);

        // The manager is reusable afterwards
        assert_eq!(manager.stop().await.unwrap_err(), SessionError::NotRecording);
        let _ = std::fs::remove_dir_all(temp_dir("startfail"));
    }

    #[tokio::test]
    async fn test_invalid_file_name_is_configuration_error() {
        let (manager, mock) = manager(Script::default(), "badname");
        let request = base_request("badname").with_file_name("nested/out.mp4");
        let request = validate(&request).unwrap();

        let err = manager.start(request, token()).await.unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
        assert_eq!(mock.count("create_recorder"), 0);
        assert_eq!(mock.count("grant.release"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_duration_stops_once() {
        let (manager, mock) = manager(Script::default(), "duration");
        let mut events = manager.subscribe();
        let request = validate(&base_request("duration").with_max_duration_ms(5_000)).unwrap();

        manager.start(request, token()).await.unwrap();
        match next_outcome(&mut events).await {
            SessionEvent::Stopped(stopped) => {
                assert_eq!(stopped.reason, StopReason::LimitReached(LimitKind::MaxDuration));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(manager.state(), SessionState::Idle);
        assert_eq!(mock.count("recorder.stop"), 1);
        assert_eq!(mock.count("recorder.release"), 1);
        assert_eq!(mock.count("display.release"), 1);
        assert_eq!(mock.count("grant.release"), 1);

        // A late caller stop finds nothing to do
        assert_eq!(manager.stop().await.unwrap_err(), SessionError::NotRecording);
        assert_eq!(mock.count("recorder.stop"), 1);
        assert_eq!(mock.count("recorder.release"), 1);
        assert_eq!(mock.count("display.release"), 1);
        assert_eq!(mock.count("grant.release"), 1);
        let _ = std::fs::remove_dir_all(temp_dir("duration"));
    }

    #[tokio::test]
    async fn test_max_file_size_stops() {
        let script = Script {
            write_on_start: Some(4096),
            ..Default::default()
        };
        let (manager, mock) = manager(script, "filesize");
        let mut events = manager.subscribe();
        let request =
            validate(&base_request("filesize").with_max_file_size_bytes(1024)).unwrap();

        manager.start(request, token()).await.unwrap();
        match next_outcome(&mut events).await {
            SessionEvent::Stopped(stopped) => {
                assert_eq!(stopped.reason, StopReason::LimitReached(LimitKind::MaxFileSize));
                assert!(stopped.output_path.exists());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(mock.count("grant.release"), 1);
        let _ = std::fs::remove_dir_all(temp_dir("filesize"));
    }

    #[tokio::test]
    async fn test_recorder_error_fails_session() {
        let (manager, mock) = manager(Script::default(), "encoder");
        let mut events = manager.subscribe();
        let request = validate(&base_request("encoder")).unwrap();

        manager.start(request, token()).await.unwrap();
        let signals = mock.recorder_signals.lock().unwrap().clone().unwrap();
        assert!(signals.send(SessionSignal::RecorderError {
            code: 100,
            detail: "server died".into(),
        }));

        match next_outcome(&mut events).await {
            SessionEvent::Failed { reason, detail } => {
                assert_eq!(reason, FailureReason::EncoderError);
                assert!(detail.contains("server died"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(manager.state(), SessionState::Idle);
        assert_eq!(mock.count("grant.release"), 1);
        assert_eq!(
            manager.last_failure().await.unwrap().reason,
            FailureReason::EncoderError
        );
        let _ = std::fs::remove_dir_all(temp_dir("encoder"));
    }

    #[tokio::test]
    async fn test_grant_revocation_stops_session() {
        let (manager, mock) = manager(Script::default(), "revoked");
        let mut events = manager.subscribe();
        let request = validate(&base_request("revoked")).unwrap();

        manager.start(request, token()).await.unwrap();
        let signals = mock.grant_signals.lock().unwrap().clone().unwrap();
        signals.send(SessionSignal::GrantRevoked);

        match next_outcome(&mut events).await {
            SessionEvent::Stopped(stopped) => {
                assert_eq!(stopped.reason, StopReason::GrantRevoked)
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(mock.count("recorder.stop"), 1);
        let _ = std::fs::remove_dir_all(temp_dir("revoked"));
    }

    #[tokio::test]
    async fn test_stop_failure_still_releases() {
        let script = Script {
            fail_stop: true,
            ..Default::default()
        };
        let (manager, mock) = manager(script, "stopfail");
        let request = validate(&base_request("stopfail")).unwrap();

        manager.start(request, token()).await.unwrap();
        let stopped = manager.stop().await.unwrap();
        assert_eq!(stopped.release_failures, 1);
        assert_eq!(mock.count("recorder.release"), 1);
        assert_eq!(mock.count("display.release"), 1);
        assert_eq!(mock.count("grant.release"), 1);
        assert_eq!(manager.state(), SessionState::Idle);
        let _ = std::fs::remove_dir_all(temp_dir("stopfail"));
    }

    #[tokio::test]
    async fn test_stale_signal_is_ignored() {
        let (manager, mock) = manager(Script::default(), "stale");
        let request = validate(&base_request("stale")).unwrap();

        manager.start(request.clone(), token()).await.unwrap();
        let old_signals = mock.grant_signals.lock().unwrap().clone().unwrap();
        manager.stop().await.unwrap();

        manager.start(request, token()).await.unwrap();
        old_signals.send(SessionSignal::GrantRevoked);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(manager.state(), SessionState::Recording);

        manager.stop().await.unwrap();
        let _ = std::fs::remove_dir_all(temp_dir("stale"));
    }

    #[tokio::test]
    async fn test_double_stop() {
        let (manager, mock) = manager(Script::default(), "double");
        let request = validate(&base_request("double")).unwrap();

        manager.start(request, token()).await.unwrap();
        manager.stop().await.unwrap();
        assert_eq!(manager.stop().await.unwrap_err(), SessionError::NotRecording);
        assert_eq!(mock.count("grant.release"), 1);
        assert_eq!(mock.count("recorder.release"), 1);
        let _ = std::fs::remove_dir_all(temp_dir("double"));
    }

    #[tokio::test]
    async fn test_explicit_geometry_skips_metrics() {
        let (manager, mock) = manager(Script::default(), "geometry");
        let video = VideoRecordingProps {
            width: Some(1280),
            height: Some(720),
            density_dpi: Some(160),
            ..Default::default()
        };
        let request = validate(&base_request("geometry").with_video(video)).unwrap();

        let started = manager.start(request, token()).await.unwrap();
        assert_eq!((started.width, started.height), (Some(1280), Some(720)));
        assert_eq!(mock.count("display_metrics"), 0);

        manager.stop().await.unwrap();
        let _ = std::fs::remove_dir_all(temp_dir("geometry"));
    }

    #[tokio::test]
    async fn test_partial_geometry_fills_from_display() {
        let (manager, _mock) = manager(Script::default(), "partial");
        let video = VideoRecordingProps {
            width: Some(720),
            ..Default::default()
        };
        let request = validate(&base_request("partial").with_video(video)).unwrap();

        let started = manager.start(request, token()).await.unwrap();
        assert_eq!(started.width, Some(720));
        assert_eq!(started.height, Some(2340));
        assert_eq!(started.density_dpi, Some(420));

        manager.stop().await.unwrap();
        let _ = std::fs::remove_dir_all(temp_dir("partial"));
    }

    #[tokio::test]
    async fn test_audio_only_has_no_display() {
        let (manager, mock) = manager(Script::default(), "audio");
        let request = base_request("audio").with_audio_only(true);
        let request = validate(&request).unwrap();

        let started = manager.start(request, token()).await.unwrap();
        assert!(started.width.is_none());
        assert_eq!(mock.count("create_virtual_display"), 0);
        assert_eq!(mock.count("surface"), 0);
        assert_eq!(mock.count("display_metrics"), 0);
        assert!(mock.settings.lock().unwrap().as_ref().unwrap().video.is_none());

        manager.stop().await.unwrap();
        assert_eq!(mock.count("display.release"), 0);
        assert_eq!(mock.count("grant.release"), 1);
        let _ = std::fs::remove_dir_all(temp_dir("audio"));
    }

    #[tokio::test]
    async fn test_watch_state_follows_lifecycle() {
        let (manager, _mock) = manager(Script::default(), "watch");
        let mut rx = manager.watch_state();
        assert_eq!(*rx.borrow(), SessionState::Idle);

        let request = validate(&base_request("watch")).unwrap();
        manager.start(request, token()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Recording);

        manager.stop().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Idle);
        let _ = std::fs::remove_dir_all(temp_dir("watch"));
    }

    #[tokio::test]
    async fn test_global_manager_installs_once() {
        let (first, _) = manager(Script::default(), "global");
        let platform: Arc<dyn ProjectionPlatform> =
            Arc::new(MockPlatform(Arc::new(Shared::default())));
        let installed = init_session_manager(platform.clone(), SessionConfig::default());
        let again = init_session_manager(platform, SessionConfig::default());
        assert!(std::ptr::eq(installed, again));
        assert!(session_manager().is_some());
        drop(first);
    }
}
