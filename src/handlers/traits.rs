use crate::session::Session;
use async_trait::async_trait;
use sfcore::types::callbacks::{CallbackKind, ProtocolEvent};
use std::sync::Arc;

/// Handles one kind of protocol callback.
///
/// Each handler owns a single [`CallbackKind`]; the dispatcher routes every
/// event to the handler registered for its kind.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    /// The callback kind this handler is responsible for.
    fn kind(&self) -> CallbackKind;

    /// Handles the event. Runs inline on the dispatcher task, so anything
    /// slow must be spawned.
    ///
    /// Returns `true` if the event was handled, `false` if it did not match
    /// the handler's kind.
    async fn handle(&self, session: Arc<Session>, event: ProtocolEvent) -> bool;
}
