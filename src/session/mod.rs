//! Scrape session lifecycle: start, cooperative stop, status.
//!
//! ```text
//! Idle ──start──▶ Running ──catalog exhausted / stop──▶ Stopped
//!                    │  ▲
//!                    │  └── transient failure, budget left (re-navigate)
//!                    ├──stop()──▶ Stopping ──next checkpoint──▶ Stopped
//!                    └──budget spent──▶ Failed ──▶ Stopped
//! ```
//!
//! Checkpoints where a stop is noticed: top of the page loop, before each
//! container extraction, and inside every settle or backoff delay.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::browser::BrowserLauncher;
use crate::config::ScraperConfig;
use crate::models::{SessionState, SessionStatus, Snapshot};
use crate::profiles::ProfileRegistry;
use crate::sink::PublishSink;
use crate::utils::error::{AppError, Result};

mod runner;

pub struct ScrapeSession {
    launcher: Arc<dyn BrowserLauncher>,
    registry: Arc<ProfileRegistry>,
    config: ScraperConfig,
    status: Arc<watch::Sender<SessionStatus>>,
    /// Token of the current run. Locked across the status change in both
    /// `start` and `stop`, so a stop never lands on the previous run's token.
    cancel: Mutex<CancellationToken>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScrapeSession {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        registry: Arc<ProfileRegistry>,
        config: ScraperConfig,
    ) -> Self {
        let (status, _rx) = watch::channel(SessionStatus::idle());
        Self {
            launcher,
            registry,
            config,
            status: Arc::new(status),
            cancel: Mutex::new(CancellationToken::new()),
            handle: Mutex::new(None),
        }
    }

    /// Starts a run in the background and returns right away.
    ///
    /// `Ok(false)` when a run is already in flight; the call is then a
    /// no-op. Fails only when `url` is not an http(s) URL.
    pub fn start(
        &self,
        url: &str,
        keywords: Option<&str>,
        sink: Arc<dyn PublishSink>,
    ) -> Result<bool> {
        let parsed = Url::parse(url.trim())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }
        let url = url.trim().to_string();

        let target = self.registry.plan_target(&url, keywords);
        let run_id = Uuid::new_v4();

        let mut current = lock(&self.cancel);
        let claimed = self.status.send_if_modified(|status| {
            if status.state.is_active() {
                return false;
            }
            *status = SessionStatus {
                state: SessionState::Running,
                indicator: SessionState::Running.indicator().to_string(),
                run_id: Some(run_id),
                target_url: Some(url.clone()),
                profile: Some(target.profile.name.to_string()),
                item_count: 0,
                attempts: 0,
                outcome: None,
                started_at: Some(Utc::now()),
                finished_at: None,
            };
            true
        });

        if !claimed {
            tracing::debug!(url = %url, "Session already running, start ignored");
            return Ok(false);
        }

        let cancel = CancellationToken::new();
        *current = cancel.clone();
        drop(current);

        // A new run starts from an empty result set.
        sink.publish(Snapshot::empty());

        tracing::info!(
            run_id = %run_id,
            url = %url,
            profile = target.profile.name,
            "Starting scrape session"
        );

        let run = runner::Run {
            run_id,
            launcher: Arc::clone(&self.launcher),
            target,
            config: self.config.clone(),
            sink,
            cancel,
            status: Arc::clone(&self.status),
        };
        let handle = tokio::spawn(run.execute());
        *lock(&self.handle) = Some(handle);

        Ok(true)
    }

    /// Asks the running session to wind down at its next checkpoint.
    /// Returns immediately; calling it on an idle or stopped session does
    /// nothing.
    pub fn stop(&self) {
        let current = lock(&self.cancel);
        let mut pending = false;
        let requested = self.status.send_if_modified(|status| match status.state {
            SessionState::Running => {
                status.state = SessionState::Stopping;
                true
            }
            SessionState::Stopping => {
                pending = true;
                false
            }
            _ => false,
        });

        if requested {
            tracing::info!("Stop requested");
        }
        if requested || pending {
            current.cancel();
        }
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Receiver woken on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Resolves once no run is in flight.
    pub async fn wait_until_stopped(&self) -> SessionStatus {
        let mut rx = self.status.subscribe();
        let ready = rx
            .wait_for(|s| matches!(s.state, SessionState::Idle | SessionState::Stopped))
            .await
            .map(|s| s.clone());
        match ready {
            Ok(status) => status,
            // The sender lives in `self`, so this only happens mid-drop.
            Err(_) => self.status(),
        }
    }
}

impl Drop for ScrapeSession {
    fn drop(&mut self) {
        lock(&self.cancel).cancel();
    }
}

impl SessionStatus {
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            indicator: SessionState::Idle.indicator().to_string(),
            run_id: None,
            target_url: None,
            profile: None,
            item_count: 0,
            attempts: 0,
            outcome: None,
            started_at: None,
            finished_at: None,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
