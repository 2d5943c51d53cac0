use super::traits::CallbackHandler;
use crate::session::Session;
use async_trait::async_trait;
use log::{debug, warn};
use sfcore::types::callbacks::{CallbackKind, ProtocolEvent, ServerList};
use std::sync::Arc;

/// Handler for `ServerList` callbacks.
///
/// Remembers the first servers the backend suggests so the next connect can
/// pick one of them.
#[derive(Default)]
pub struct ServerListHandler;

#[async_trait]
impl CallbackHandler for ServerListHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::ServerList
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::ServerList(cb) = event else {
            return false;
        };
        let session_clone = session.clone();
        tokio::spawn(async move {
            session_clone.store_preferred_servers(cb).await;
        });
        true
    }
}

impl Session {
    async fn store_preferred_servers(&self, cb: ServerList) {
        let limit = self.config.max_preferred_endpoints;
        let servers: Vec<String> = cb
            .servers
            .iter()
            .take(limit)
            .map(|addr| addr.to_string())
            .collect();
        debug!(
            target: "Session/Settings",
            "Storing {} of {} suggested servers", servers.len(), cb.servers.len()
        );

        self.settings.update(|s| s.preferred_servers = servers).await;
        if let Err(e) = self.settings.save().await {
            warn!(target: "Session/Settings", "Failed to save preferred servers: {e}");
        }
    }
}
