pub mod connection;
pub mod friends;
pub mod router;
pub mod servers;
pub mod traits;
pub mod user;

use router::CallbackRouter;
use std::sync::Arc;

/// Router with a handler for every callback the session reacts to.
pub(crate) fn create_callback_router() -> CallbackRouter {
    let mut router = CallbackRouter::new();

    router.register(Arc::new(connection::ConnectedHandler));
    router.register(Arc::new(connection::DisconnectedHandler));
    router.register(Arc::new(connection::LoggedOnHandler));
    router.register(Arc::new(connection::LoggedOffHandler));
    router.register(Arc::new(user::AccountInfoHandler));
    router.register(Arc::new(user::PersonaStateHandler));
    router.register(Arc::new(user::MachineAuthHandler));
    router.register(Arc::new(friends::FriendsListHandler));
    router.register(Arc::new(friends::FriendAddedHandler));
    router.register(Arc::new(servers::ServerListHandler));

    router
}
