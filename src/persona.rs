use crate::pending::{PendingOperation, Rollback};
use crate::session::Session;
use log::info;
use sfcore::types::callbacks::{AccountInfo, PersonaUpdate};
use sfcore::types::events::Event;
use sfcore::PersonaState;
use std::sync::Arc;

impl Session {
    /// Changes the persona name.
    ///
    /// Observers are told about the new name as soon as the request is sent.
    /// If the backend does not confirm in time, the previous name is sent
    /// again and observers are told about it too.
    pub fn set_persona_name(self: &Arc<Self>, name: impl Into<String>) -> PendingOperation<AccountInfo> {
        let name = name.into();
        let rollback = self.persona_name().map(|previous| -> Rollback {
            let protocol = self.protocol.clone();
            let events = self.event_bus.clone();
            Box::new(move || {
                info!(target: "Session", "Restoring persona name '{previous}'");
                tokio::spawn(async move {
                    protocol.set_persona_name(previous.clone()).await;
                    events.dispatch(&Event::PersonaNameChanged { name: previous });
                });
            })
        });

        let operation = self
            .pending
            .set_persona_name
            .begin(self.config.default_timeout, rollback);
        let protocol = self.protocol.clone();
        let events = self.event_bus.clone();
        tokio::spawn(async move {
            protocol.set_persona_name(name.clone()).await;
            events.dispatch(&Event::PersonaNameChanged { name });
        });
        operation
    }

    /// Changes the persona state, with the same optimistic notification and
    /// restore-on-timeout behaviour as [`set_persona_name`](Self::set_persona_name).
    pub fn set_persona_state(self: &Arc<Self>, state: PersonaState) -> PendingOperation<PersonaUpdate> {
        let previous = self.persona_state();
        let protocol = self.protocol.clone();
        let events = self.event_bus.clone();
        let rollback: Rollback = Box::new(move || {
            info!(target: "Session", "Restoring persona state {previous}");
            tokio::spawn(async move {
                protocol.set_persona_state(previous).await;
                events.dispatch(&Event::PersonaStateChanged { state: previous });
            });
        });

        let operation = self
            .pending
            .set_persona_state
            .begin(self.config.default_timeout, Some(rollback));
        let protocol = self.protocol.clone();
        let events = self.event_bus.clone();
        tokio::spawn(async move {
            protocol.set_persona_state(state).await;
            events.dispatch(&Event::PersonaStateChanged { state });
        });
        operation
    }
}
