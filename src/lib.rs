//! Resilient session client for a friends-list backend.
//!
//! The [`Session`](session::Session) owns one protocol connection, correlates
//! requests with the callbacks that answer them under a timeout, keeps a
//! roster of friends current and reconnects on its own (a bounded number of
//! times) after the connection drops.

pub use sfcore;
pub use sfcore::types;

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod friends;
pub mod handlers;
pub mod login;
pub mod pending;
pub mod persona;
pub mod protocol;
pub mod reconnect;
pub mod roster;
pub mod session;
pub mod settings;

pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use error::{OperationKind, SessionError};
pub use login::{LoginFailure, LoginFlow, LoginState};
pub use session::Session;
