use super::traits::CallbackHandler;
use crate::session::Session;
use async_trait::async_trait;
use log::{debug, info, warn};
use sfcore::types::callbacks::{
    AccountInfo, CallbackKind, MachineAuthChallenge, MachineAuthResponse, PersonaUpdate,
    ProtocolEvent,
};
use sfcore::types::events::Event;
use sha1::{Digest, Sha1};
use std::sync::Arc;

/// Handler for `AccountInfo` callbacks, which carry the persona name.
#[derive(Default)]
pub struct AccountInfoHandler;

#[async_trait]
impl CallbackHandler for AccountInfoHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::AccountInfo
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::AccountInfo(cb) = event else {
            return false;
        };
        session.handle_account_info(cb);
        true
    }
}

/// Handler for `PersonaState` callbacks.
///
/// Updates about the logged-in account settle a pending persona state
/// change; everything else goes to the roster.
#[derive(Default)]
pub struct PersonaStateHandler;

#[async_trait]
impl CallbackHandler for PersonaStateHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::PersonaState
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::PersonaState(cb) = event else {
            return false;
        };
        session.handle_persona_state(cb);
        true
    }
}

/// Handler for machine-auth challenges.
#[derive(Default)]
pub struct MachineAuthHandler;

#[async_trait]
impl CallbackHandler for MachineAuthHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::MachineAuth
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::MachineAuth(challenge) = event else {
            return false;
        };
        let session_clone = session.clone();
        tokio::spawn(async move {
            session_clone.answer_machine_auth(challenge).await;
        });
        true
    }
}

impl Session {
    fn handle_account_info(&self, cb: AccountInfo) {
        let name = cb.persona_name.clone();
        self.pending.set_persona_name.resolve(cb);
        self.event_bus.dispatch(&Event::PersonaNameChanged { name });
    }

    fn handle_persona_state(&self, cb: PersonaUpdate) {
        if self.protocol.self_id() == Some(cb.account_id) {
            self.pending.set_persona_state.resolve(cb);
            return;
        }
        self.roster.on_presence_changed(cb);
    }

    /// Stores the hash of the issued machine-auth file for the user that
    /// last logged in, then confirms the write to the backend.
    async fn answer_machine_auth(&self, challenge: MachineAuthChallenge) {
        // The backend verifies the file with SHA-1.
        let hash = Sha1::digest(&challenge.data).to_vec();
        let Some(username) = self.last_login_details().map(|d| d.username) else {
            warn!(target: "Session", "Machine-auth challenge without a login, ignoring");
            return;
        };
        info!(
            target: "Session",
            "Accepting machine-auth file '{}' for {username} ({})",
            challenge.file_name,
            hex::encode(&hash)
        );

        self.settings
            .update(|s| s.sentry_hashes.insert(username, hash.clone()))
            .await;
        if let Err(e) = self.settings.save().await {
            warn!(target: "Session/Settings", "Failed to save machine-auth hash: {e}");
        }

        let response = MachineAuthResponse::accept(&challenge, hash);
        self.protocol.send_machine_auth_response(response).await;
        debug!(target: "Session", "Machine-auth response sent for job {}", challenge.job_id);
    }
}
