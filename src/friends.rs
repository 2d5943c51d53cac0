use crate::error::{OperationKind, SessionError};
use crate::pending::{PendingOperation, run_bounded};
use crate::session::Session;
use sfcore::types::callbacks::FriendAdded;
use sfcore::{AccountId, ChatEntryType, FriendTarget};
use std::future::Future;
use std::sync::Arc;

impl Session {
    /// Sends a friend request, by account or by account name / e-mail.
    pub fn add_friend(self: &Arc<Self>, target: impl Into<FriendTarget>) -> PendingOperation<FriendAdded> {
        let target = target.into();
        let operation = self.pending.add_friend.begin(self.config.default_timeout, None);
        let protocol = self.protocol.clone();
        tokio::spawn(async move { protocol.add_friend(target).await });
        operation
    }

    /// Completes once the protocol client has accepted the request; the
    /// roster update arrives later as an incremental list.
    pub fn remove_friend(
        self: &Arc<Self>,
        id: AccountId,
    ) -> impl Future<Output = Result<(), SessionError>> + Send + 'static {
        let protocol = self.protocol.clone();
        run_bounded(OperationKind::RemoveFriend, self.config.default_timeout, async move {
            protocol.remove_friend(id).await
        })
    }

    pub fn send_chat_message(
        self: &Arc<Self>,
        to: AccountId,
        entry_type: ChatEntryType,
        message: impl Into<String>,
    ) -> impl Future<Output = Result<(), SessionError>> + Send + 'static {
        let protocol = self.protocol.clone();
        let message = message.into();
        run_bounded(OperationKind::SendChatMessage, self.config.default_timeout, async move {
            protocol.send_chat_message(to, entry_type, message).await
        })
    }
}
