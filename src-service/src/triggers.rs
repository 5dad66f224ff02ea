//! Max-duration and max-file-size triggers.
//!
//! Both triggers run as tokio tasks and report through the session's
//! [`SignalSender`]. They fire at most once and are aborted on disarm.

use crate::capture::{LimitKind, SessionSignal, SignalSender};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Floor for the file-size poll interval; a zero period would panic.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Live limit watchers for one session.
#[derive(Default)]
pub struct LimitTriggers {
    tasks: Vec<JoinHandle<()>>,
}

impl LimitTriggers {
    /// Arm the configured triggers. Must be called inside a tokio runtime.
    ///
    /// `file_size` is the output path to watch and the byte limit.
    /// `poll_interval` is raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub fn arm(
        max_duration: Option<Duration>,
        file_size: Option<(PathBuf, u64)>,
        poll_interval: Duration,
        signals: SignalSender,
    ) -> Self {
        let mut tasks = Vec::new();

        if let Some(limit) = max_duration {
            let signals = signals.clone();
            debug!("Arming max-duration trigger: {:?}", limit);
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                info!("Max duration of {:?} reached", limit);
                signals.send(SessionSignal::LimitReached(LimitKind::MaxDuration));
            }));
        }

        if let Some((path, limit)) = file_size {
            let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
            debug!("Arming max-file-size trigger: {} bytes on {:?}", limit, path);
            tasks.push(tokio::spawn(watch_file_size(
                path,
                limit,
                poll_interval,
                signals,
            )));
        }

        Self { tasks }
    }

    pub fn is_armed(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Cancel every pending trigger.
    pub fn disarm(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for LimitTriggers {
    fn drop(&mut self) {
        self.disarm();
    }
}

async fn watch_file_size(path: PathBuf, limit: u64, poll: Duration, signals: SignalSender) {
    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        // The recorder may not have created the file yet
        let Ok(meta) = tokio::fs::metadata(&path).await else {
            continue;
        };
        if meta.len() >= limit {
            info!("Max file size reached: {} >= {} bytes", meta.len(), limit);
            signals.send(SessionSignal::LimitReached(LimitKind::MaxFileSize));
            return;
        }
    }
}
