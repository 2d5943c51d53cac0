//! Seam between the session and the backend's protocol client.

pub mod loopback;

use async_trait::async_trait;
use sfcore::types::callbacks::{MachineAuthResponse, ProtocolEvent};
use sfcore::types::credentials::LoginDetails;
use sfcore::{AccountId, ChatEntryType, FriendTarget, PersonaState};
use std::net::SocketAddr;
use std::time::Duration;

/// A client for the backend's wire protocol.
///
/// Commands only start an exchange; their outcome arrives later as a
/// [`ProtocolEvent`] pulled through [`wait_for_event`](Self::wait_for_event).
/// Implementations serialize their own internal access, the session calls
/// them concurrently from short-lived tasks.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Opens a connection, to `server` if given, otherwise to an endpoint of
    /// the client's choosing.
    async fn connect(&self, server: Option<SocketAddr>);

    async fn disconnect(&self);

    async fn login(&self, details: LoginDetails);

    async fn logout(&self);

    async fn set_persona_name(&self, name: String);

    async fn set_persona_state(&self, state: PersonaState);

    async fn send_chat_message(&self, to: AccountId, entry_type: ChatEntryType, message: String);

    async fn add_friend(&self, target: FriendTarget);

    async fn remove_friend(&self, id: AccountId);

    async fn send_machine_auth_response(&self, response: MachineAuthResponse);

    /// Waits at most `timeout` for the next callback.
    async fn wait_for_event(&self, timeout: Duration) -> Option<ProtocolEvent>;

    fn is_connected(&self) -> bool;

    /// Account of the logged-in user, if any.
    fn self_id(&self) -> Option<AccountId>;

    fn persona_name(&self) -> Option<String>;

    fn persona_state(&self) -> PersonaState;
}
