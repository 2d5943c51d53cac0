//! Runtime-agnostic building blocks for the friends-list session client.
//!
//! Nothing in here spawns tasks or touches the network: the types describe
//! identities, callback payloads coming out of a protocol client, the friend
//! model and the events a session publishes to its consumers.

pub mod types;

pub use types::account::{AccountId, AccountType, FriendTarget};
pub use types::events::{Event, EventBus, EventHandler};
pub use types::friend::{Friend, FriendField, FriendState};
pub use types::persona::{ChatEntryType, PersonaState, Relationship};
pub use types::result::ResultCode;
