use crate::types::account::AccountId;
use crate::types::callbacks::LoggedOff;
use crate::types::friend::FriendField;
use crate::types::persona::PersonaState;
use serde::Serialize;
use std::sync::{Arc, RwLock};

/// Notifications a session publishes to its consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Event {
    Connected,
    Disconnected {
        /// True when a caller was awaiting this disconnect.
        expected: bool,
    },
    LoggedOff(LoggedOff),
    PersonaNameChanged {
        name: String,
    },
    PersonaStateChanged {
        state: PersonaState,
    },
    /// Automatic reconnection gave up. The session stays disconnected until
    /// the next explicit login.
    ReconnectFailed,

    /// The roster was cleared ahead of a full snapshot.
    RosterReset,
    FriendAdded(AccountId),
    FriendRemoved(AccountId),
    FriendChanged {
        id: AccountId,
        fields: Vec<FriendField>,
    },
}

pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: &Event);
}

impl<F> EventHandler for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn handle_event(&self, event: &Event) {
        self(event)
    }
}

#[derive(Default, Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .expect("RwLock should not be poisoned")
            .push(handler);
    }

    /// Returns true if there are any event handlers registered.
    pub fn has_handlers(&self) -> bool {
        !self
            .handlers
            .read()
            .expect("RwLock should not be poisoned")
            .is_empty()
    }

    pub fn dispatch(&self, event: &Event) {
        log::trace!(target: "EventBus", "dispatching {event:?}");
        // Handlers may register further handlers; don't hold the lock while calling out.
        let handlers = self
            .handlers
            .read()
            .expect("RwLock should not be poisoned")
            .clone();
        for handler in handlers.iter() {
            handler.handle_event(event);
        }
    }
}
