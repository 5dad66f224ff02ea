//! castkit capture service
//!
//! Loads the service configuration, installs logging and the process-wide
//! session manager, then runs until interrupted. An active capture is
//! stopped on shutdown so its output file is finalized.

use castkit_service::capture::host_platform;
use castkit_service::config::{load_config, ServiceConfig};
use castkit_service::logging::init_logging;
use castkit_service::{init_session_manager, SessionEvent, SessionManager, SessionState};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

fn main() {
    let config = load_config();

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    };

    info!("castkit service starting (pid: {})...", std::process::id());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    runtime.block_on(run(config));
    info!("castkit service stopped");
}

async fn run(config: ServiceConfig) {
    let manager = init_session_manager(Arc::new(host_platform()), config.session_config());
    info!(
        "Session manager ready, captures default to {:?}",
        config.cache_directory()
    );

    let mut events = manager.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event log lagged, {} event(s) skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    wait_for_shutdown().await;
    cleanup_on_shutdown(manager).await;
    event_log.abort();
}

fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::StateChanged(state) => debug!("Session state: {}", state),
        SessionEvent::Started { output_path } => info!("Recording to {:?}", output_path),
        SessionEvent::Stopped(stopped) => info!(
            "Capture saved to {:?} ({}, {:.1}s)",
            stopped.output_path,
            stopped.reason,
            stopped.duration.as_secs_f64()
        ),
        SessionEvent::Failed { reason, detail } => {
            error!("Capture failed ({}): {}", reason, detail)
        }
    }
}

/// Wait for SIGINT, or SIGTERM/SIGHUP on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::hangup()),
        ) {
            (Ok(mut sigterm), Ok(mut sighup)) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sighup.recv() => info!("Received SIGHUP"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers: {}", e);
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    } else {
        info!("Received Ctrl+C");
    }
}

/// Stop an active capture before exiting.
async fn cleanup_on_shutdown(manager: &SessionManager) {
    info!("Cleaning up...");
    if manager.state() == SessionState::Idle {
        return;
    }
    info!("Stopping active capture before shutdown...");
    match manager.stop().await {
        Ok(stopped) => info!("Capture saved to {:?}", stopped.output_path),
        Err(e) => error!("Failed to stop capture: {}", e),
    }
}
