//! The session facade.
//!
//! A [`Session`] owns one protocol client and serializes request/response
//! exchanges over it. Operations that expect a callback register a pending
//! completion and return it right away; the protocol call itself runs on a
//! short-lived task, and the dispatcher loop settles the completion when the
//! matching callback arrives.

use crate::config::SessionConfig;
use crate::error::{OperationKind, SessionError};
use crate::handlers::create_callback_router;
use crate::handlers::router::CallbackRouter;
use crate::pending::{PendingOperation, PendingRegistry, run_bounded};
use crate::protocol::ProtocolClient;
use crate::reconnect::{ReconnectController, ReconnectState};
use crate::roster::{FriendRoster, RosterExecutor};
use crate::settings::SettingsService;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::seq::IndexedRandom;
use sfcore::types::callbacks::{Connected, Disconnected, LoggedOn};
use sfcore::types::credentials::LoginDetails;
use sfcore::types::events::{EventBus, EventHandler};
use sfcore::{AccountId, PersonaState};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub struct Session {
    pub(crate) protocol: Arc<dyn ProtocolClient>,
    pub(crate) settings: Arc<SettingsService>,
    pub(crate) config: SessionConfig,

    pub(crate) pending: PendingRegistry,
    pub(crate) reconnect: ReconnectController,
    pub(crate) roster: FriendRoster,
    pub(crate) event_bus: EventBus,
    pub(crate) router: CallbackRouter,

    pub(crate) is_connected: AtomicBool,
    pub(crate) is_running: AtomicBool,
    pub(crate) shutdown_notifier: Notify,

    /// Replayed after an unexpected disconnect.
    last_login: Mutex<Option<LoginDetails>>,
}

impl Session {
    pub(crate) fn new(
        protocol: Arc<dyn ProtocolClient>,
        settings: Arc<SettingsService>,
        config: SessionConfig,
        event_bus: EventBus,
        executor: Arc<dyn RosterExecutor>,
    ) -> Self {
        Self {
            protocol,
            settings,
            pending: PendingRegistry::new(),
            reconnect: ReconnectController::new(config.max_reconnect_attempts, config.retry_window),
            roster: FriendRoster::new(event_bus.clone(), executor),
            event_bus,
            router: create_callback_router(),
            is_connected: AtomicBool::new(false),
            is_running: AtomicBool::new(false),
            shutdown_notifier: Notify::new(),
            last_login: Mutex::new(None),
            config,
        }
    }

    /// Launches the dispatcher loop. Returns `None` if it is already running.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!(target: "Session", "Session `start` called while already running.");
            return None;
        }
        Some(tokio::spawn(self.clone().dispatch_loop()))
    }

    /// Connects to a randomly picked preferred server, or to the protocol
    /// client's default endpoint when none is stored.
    pub fn connect(self: &Arc<Self>) -> PendingOperation<Connected> {
        let operation = self.pending.connect.begin(self.config.default_timeout, None);
        let session = self.clone();
        tokio::spawn(async move {
            let servers = session.settings.preferred_servers().await;
            let server = servers.choose(&mut rand::rng()).copied();
            match server {
                Some(addr) => info!(target: "Session", "Connecting to {addr}..."),
                None => info!(target: "Session", "Connecting..."),
            }
            session.protocol.connect(server).await;
        });
        operation
    }

    pub fn disconnect(self: &Arc<Self>) -> PendingOperation<Disconnected> {
        let operation = self.pending.disconnect.begin(self.config.default_timeout, None);
        let protocol = self.protocol.clone();
        tokio::spawn(async move { protocol.disconnect().await });
        operation
    }

    /// Logs in and remembers `details` for replay after connection loss. A
    /// machine-auth hash stored for the username is attached.
    pub fn login(self: &Arc<Self>, details: LoginDetails) -> PendingOperation<LoggedOn> {
        let operation = self.pending.login.begin(self.config.default_timeout, None);
        *self.last_login.lock().expect("Mutex should not be poisoned") = Some(details.clone());

        let session = self.clone();
        tokio::spawn(async move {
            let mut details = details;
            if details.sentry_hash.is_none() {
                details.sentry_hash = session.settings.sentry_hash(&details.username).await;
            }
            debug!(target: "Session", "Logging in with {details:?}");
            session.protocol.login(details).await;
        });
        operation
    }

    /// Completes when the protocol client has issued the logout.
    pub fn logout(self: &Arc<Self>) -> impl Future<Output = Result<(), SessionError>> + Send + 'static {
        let protocol = self.protocol.clone();
        run_bounded(OperationKind::Logout, self.config.default_timeout, async move {
            protocol.logout().await
        })
    }

    /// Logs out and disconnects until the connection is gone, then stops the
    /// dispatcher loop. Reconnection is disarmed first.
    pub async fn stop(self: &Arc<Self>) {
        info!(target: "Session", "Stopping session...");
        self.reconnect.disable();

        while self.protocol.is_connected() {
            if let Err(e) = self.logout().await {
                debug!(target: "Session", "Ignoring during stop: {e}");
            }
            match self.disconnect().await {
                Ok(_) => break,
                Err(e) => debug!(target: "Session", "Ignoring during stop: {e}"),
            }
        }

        self.is_running.store(false, Ordering::Relaxed);
        self.shutdown_notifier.notify_waiters();
        info!(target: "Session", "Session stopped.");
    }

    /// Connectivity as last reported through the dispatcher.
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn self_id(&self) -> Option<AccountId> {
        self.protocol.self_id()
    }

    pub fn persona_name(&self) -> Option<String> {
        self.protocol.persona_name()
    }

    pub fn persona_state(&self) -> PersonaState {
        self.protocol.persona_state()
    }

    pub fn roster(&self) -> &FriendRoster {
        &self.roster
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn settings(&self) -> &Arc<SettingsService> {
        &self.settings
    }

    pub fn add_event_handler(&self, handler: Arc<dyn EventHandler>) {
        self.event_bus.add_handler(handler);
    }

    pub fn reconnect_state(&self) -> ReconnectState {
        self.reconnect.state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect.retry_count()
    }

    pub fn is_reconnect_enabled(&self) -> bool {
        self.reconnect.is_enabled()
    }

    /// Arms automatic reconnection with a fresh attempt budget.
    pub fn enable_reconnect(&self) {
        self.reconnect.enable();
    }

    pub fn disable_reconnect(&self) {
        self.reconnect.disable();
    }

    pub fn last_successful_connect(&self) -> Option<DateTime<Utc>> {
        self.reconnect.last_successful_connect()
    }

    pub(crate) fn last_login_details(&self) -> Option<LoginDetails> {
        self.last_login
            .lock()
            .expect("Mutex should not be poisoned")
            .clone()
    }
}
