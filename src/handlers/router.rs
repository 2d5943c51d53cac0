use super::traits::CallbackHandler;
use crate::session::Session;
use sfcore::types::callbacks::{CallbackKind, ProtocolEvent};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes protocol callbacks to the handler registered for their kind.
pub struct CallbackRouter {
    handlers: HashMap<CallbackKind, Arc<dyn CallbackHandler>>,
}

impl CallbackRouter {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for its callback kind.
    ///
    /// # Panics
    /// Panics if a handler is already registered for the same kind.
    pub fn register(&mut self, handler: Arc<dyn CallbackHandler>) {
        let kind = handler.kind();
        if self.handlers.insert(kind, handler).is_some() {
            panic!("Handler for {kind:?} already registered");
        }
    }

    /// Returns `false` when no handler is registered for the event's kind or
    /// the handler declined it.
    pub async fn dispatch(&self, session: Arc<Session>, event: ProtocolEvent) -> bool {
        match self.handlers.get(&event.kind()) {
            Some(handler) => handler.handle(session, event).await,
            None => false,
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for CallbackRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SessionBuilder;
    use crate::protocol::loopback::LoopbackProtocol;
    use sfcore::types::callbacks::ServerList;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MockHandler {
        kind: CallbackKind,
        handled: AtomicBool,
    }

    impl MockHandler {
        fn new(kind: CallbackKind) -> Self {
            Self {
                kind,
                handled: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl CallbackHandler for MockHandler {
        fn kind(&self) -> CallbackKind {
            self.kind
        }

        async fn handle(&self, _session: Arc<Session>, _event: ProtocolEvent) -> bool {
            self.handled.store(true, Ordering::SeqCst);
            true
        }
    }

    async fn session() -> Arc<Session> {
        SessionBuilder::new()
            .with_protocol(Arc::new(LoopbackProtocol::new()))
            .build()
            .await
            .unwrap()
    }

    #[test]
    fn test_router_registration() {
        let mut router = CallbackRouter::new();
        router.register(Arc::new(MockHandler::new(CallbackKind::ServerList)));
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    #[should_panic(expected = "Handler for ServerList already registered")]
    fn test_router_double_registration_panics() {
        let mut router = CallbackRouter::new();
        router.register(Arc::new(MockHandler::new(CallbackKind::ServerList)));
        router.register(Arc::new(MockHandler::new(CallbackKind::ServerList)));
    }

    #[tokio::test]
    async fn test_router_dispatch_found() {
        let mut router = CallbackRouter::new();
        let handler = Arc::new(MockHandler::new(CallbackKind::ServerList));
        router.register(handler.clone());

        let event = ProtocolEvent::ServerList(ServerList { servers: vec![] });
        assert!(router.dispatch(session().await, event).await);
        assert!(handler.handled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_router_dispatch_not_found() {
        let router = CallbackRouter::new();
        let event = ProtocolEvent::ServerList(ServerList { servers: vec![] });
        assert!(!router.dispatch(session().await, event).await);
    }
}
