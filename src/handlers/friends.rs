use super::traits::CallbackHandler;
use crate::session::Session;
use async_trait::async_trait;
use log::debug;
use sfcore::types::callbacks::{CallbackKind, ProtocolEvent};
use std::sync::Arc;

/// Handler for roster pushes, full or incremental.
#[derive(Default)]
pub struct FriendsListHandler;

#[async_trait]
impl CallbackHandler for FriendsListHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::FriendsList
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::FriendsList(cb) = event else {
            return false;
        };
        session.roster.apply_snapshot(cb);
        true
    }
}

/// Handler for `FriendAdded` callbacks.
#[derive(Default)]
pub struct FriendAddedHandler;

#[async_trait]
impl CallbackHandler for FriendAddedHandler {
    fn kind(&self) -> CallbackKind {
        CallbackKind::FriendAdded
    }

    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        let ProtocolEvent::FriendAdded(cb) = event else {
            return false;
        };
        debug!(
            target: "Session",
            "Friend request to {} ({:?}): {}", cb.persona_name, cb.account_id, cb.result
        );
        session.pending.add_friend.resolve(cb);
        true
    }
}
