use super::traits::CallbackHandler;
use crate::session::Session;
use async_trait::async_trait;
use log::{debug, info, warn};
use sfcore::types::callbacks::{
    CallbackKind, Connected, Disconnected, LoggedOff, ProtocolEvent,
};
use sfcore::types::events::Event;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Handler for `Connected` callbacks.
#[derive(Default)]
pub struct ConnectedHandler;

#[async_trait]
impl CallbackHandler for ConnectedHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::Connected
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::Connected(cb) = event else {
            return false;
        };
        session.handle_connected(cb);
        true
    }
}

/// Handler for `Disconnected` callbacks.
///
/// Tells apart disconnects a caller was waiting for from connection loss.
#[derive(Default)]
pub struct DisconnectedHandler;

#[async_trait]
impl CallbackHandler for DisconnectedHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::Disconnected
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::Disconnected(cb) = event else {
            return false;
        };
        session.handle_disconnected(cb);
        true
    }
}

/// Handler for `LoggedOn` callbacks.
#[derive(Default)]
pub struct LoggedOnHandler;

#[async_trait]
impl CallbackHandler for LoggedOnHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::LoggedOn
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::LoggedOn(cb) = event else {
            return false;
        };
        if cb.result.is_ok() {
            info!(target: "Session", "Logged on as {:?}", cb.account_id);
        } else {
            warn!(target: "Session", "Logon rejected: {}", cb.result);
        }
        session.pending.login.resolve(cb);
        true
    }
}

/// Handler for `LoggedOff` callbacks.
#[derive(Default)]
pub struct LoggedOffHandler;

#[async_trait]
impl CallbackHandler for LoggedOffHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::LoggedOff
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::LoggedOff(cb) = event else {
            return false;
        };
        session.handle_logged_off(cb);
        true
    }
}

impl Session {
    fn handle_connected(self: &Arc<Self>, cb: Connected) {
        info!(target: "Session", "Connected.");
        self.is_connected.store(true, Ordering::Relaxed);
        self.pending.connect.resolve(cb);
        self.reconnect.on_connected();
        self.event_bus.dispatch(&Event::Connected);
    }

    fn handle_disconnected(self: &Arc<Self>, cb: Disconnected) {
        self.is_connected.store(false, Ordering::Relaxed);
        let expected = self.pending.disconnect.resolve(cb);
        if expected {
            info!(target: "Session", "Disconnected.");
        } else {
            warn!(target: "Session", "Connection lost.");
        }
        self.event_bus.dispatch(&Event::Disconnected { expected });

        if !expected && self.reconnect.is_enabled() {
            self.handle_unexpected_disconnect();
        }
    }

    fn handle_logged_off(self: &Arc<Self>, cb: LoggedOff) {
        debug!(target: "Session", "Logged off: {}", cb.result);
        self.event_bus.dispatch(&Event::LoggedOff(cb));
    }
}
