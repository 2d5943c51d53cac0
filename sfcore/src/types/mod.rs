pub mod account;
pub mod callbacks;
pub mod credentials;
pub mod events;
pub mod friend;
pub mod persona;
pub mod result;
