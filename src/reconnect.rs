use crate::session::Session;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use sfcore::types::events::Event;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconnectState {
    Idle,
    Retrying,
    GivenUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReconnectDecision {
    Disabled,
    Retry { attempt: u32 },
    GiveUp,
}

/// Bookkeeping for automatic reconnection after unexpected disconnects.
///
/// Mutated from the dispatcher task and from the reconnect attempts it
/// spawns; reconnection stays disarmed until a login flow succeeds.
pub(crate) struct ReconnectController {
    enabled: AtomicBool,
    retry_count: Arc<AtomicU32>,
    /// Set from a retry decision until its reconnect-then-relogin settles.
    attempt_in_flight: AtomicBool,
    max_attempts: u32,
    window: Duration,
    state: Arc<Mutex<ReconnectState>>,
    window_timer: Mutex<Option<AbortHandle>>,
    last_successful_connect: Mutex<Option<DateTime<Utc>>>,
}

impl ReconnectController {
    pub(crate) fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            retry_count: Arc::new(AtomicU32::new(0)),
            attempt_in_flight: AtomicBool::new(false),
            max_attempts,
            window,
            state: Arc::new(Mutex::new(ReconnectState::Idle)),
            window_timer: Mutex::new(None),
            last_successful_connect: Mutex::new(None),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Arms reconnection with a fresh retry budget.
    pub(crate) fn enable(&self) {
        self.retry_count.store(0, Ordering::Relaxed);
        self.attempt_in_flight.store(false, Ordering::Relaxed);
        self.set_state(ReconnectState::Idle);
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub(crate) fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub(crate) fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::Relaxed)
    }

    pub(crate) fn state(&self) -> ReconnectState {
        *self.state.lock().expect("Mutex should not be poisoned")
    }

    pub(crate) fn last_successful_connect(&self) -> Option<DateTime<Utc>> {
        *self
            .last_successful_connect
            .lock()
            .expect("Mutex should not be poisoned")
    }

    fn set_state(&self, state: ReconnectState) {
        *self.state.lock().expect("Mutex should not be poisoned") = state;
    }

    fn cancel_window(&self) {
        if let Some(timer) = self
            .window_timer
            .lock()
            .expect("Mutex should not be poisoned")
            .take()
        {
            timer.abort();
        }
    }

    /// A connection came up. Outside of a reconnect attempt this arms the
    /// retry window; during one the window waits for the relogin.
    pub(crate) fn on_connected(&self) {
        *self
            .last_successful_connect
            .lock()
            .expect("Mutex should not be poisoned") = Some(Utc::now());

        if !self.attempt_in_flight.load(Ordering::Relaxed) {
            self.arm_window();
        }
    }

    /// The reconnect attempt logged in again. If the session stays up for
    /// the retry window, earlier attempts are forgiven.
    pub(crate) fn on_attempt_succeeded(&self) {
        self.attempt_in_flight.store(false, Ordering::Relaxed);
        self.arm_window();
    }

    /// The reconnect attempt ended without another retry being scheduled.
    pub(crate) fn on_attempt_abandoned(&self) {
        self.attempt_in_flight.store(false, Ordering::Relaxed);
    }

    fn arm_window(&self) {
        self.cancel_window();
        let retry_count = self.retry_count.clone();
        let state = self.state.clone();
        let window = self.window;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let forgiven = retry_count.swap(0, Ordering::Relaxed);
            let mut state = state.lock().expect("Mutex should not be poisoned");
            if *state == ReconnectState::Retrying {
                *state = ReconnectState::Idle;
            }
            if forgiven > 0 {
                debug!(
                    target: "Session/Reconnect",
                    "Connection stable for {window:?}, forgiving {forgiven} reconnect attempt(s)"
                );
            }
        });
        *self
            .window_timer
            .lock()
            .expect("Mutex should not be poisoned") = Some(timer.abort_handle());
    }

    /// Accounts for an unexpected disconnect and decides what to do about it.
    pub(crate) fn on_unexpected_disconnect(&self) -> ReconnectDecision {
        if !self.is_enabled() {
            return ReconnectDecision::Disabled;
        }

        self.cancel_window();
        let max = self.max_attempts;
        let count = self
            .retry_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| {
                Some(if count < max { count + 1 } else { 0 })
            })
            .unwrap_or_else(|count| count);

        if count < max {
            self.attempt_in_flight.store(true, Ordering::Relaxed);
            self.set_state(ReconnectState::Retrying);
            ReconnectDecision::Retry { attempt: count + 1 }
        } else {
            self.attempt_in_flight.store(false, Ordering::Relaxed);
            self.disable();
            self.set_state(ReconnectState::GivenUp);
            ReconnectDecision::GiveUp
        }
    }
}

impl Session {
    pub(crate) fn handle_unexpected_disconnect(self: &Arc<Self>) {
        match self.reconnect.on_unexpected_disconnect() {
            ReconnectDecision::Disabled => {
                debug!(target: "Session/Reconnect", "Auto-reconnect disabled, staying offline.");
            }
            ReconnectDecision::Retry { attempt } => {
                info!(
                    target: "Session/Reconnect",
                    "Unexpected disconnect, reconnecting (attempt {attempt}/{})",
                    self.config.max_reconnect_attempts
                );
                let session = self.clone();
                tokio::spawn(async move { session.reconnect_attempt().await });
            }
            ReconnectDecision::GiveUp => {
                warn!(
                    target: "Session/Reconnect",
                    "Giving up after {} reconnect attempts.",
                    self.config.max_reconnect_attempts
                );
                self.event_bus.dispatch(&Event::ReconnectFailed);
            }
        }
    }

    async fn reconnect_attempt(self: Arc<Self>) {
        let result = async {
            self.connect().await?;
            if let Some(details) = self.last_login_details() {
                let logged_on = self.login(details).await?;
                if !logged_on.result.is_ok() {
                    warn!(
                        target: "Session/Reconnect",
                        "Re-login after reconnect returned {}", logged_on.result
                    );
                }
            }
            Ok::<(), crate::error::SessionError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(target: "Session/Reconnect", "Reconnected.");
                self.reconnect.on_attempt_succeeded();
            }
            Err(e) if e.is_timeout() && self.reconnect.is_enabled() => {
                warn!(target: "Session/Reconnect", "Reconnect attempt failed: {e}");
                // Counts as another unexpected disconnect, under the same budget.
                self.handle_unexpected_disconnect();
            }
            Err(e) => {
                warn!(target: "Session/Reconnect", "Reconnect attempt aborted: {e}");
                self.reconnect.on_attempt_abandoned();
            }
        }
    }
}
