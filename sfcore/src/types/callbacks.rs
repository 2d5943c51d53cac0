//! Payloads surfaced by a protocol client.
//!
//! Each variant of [`ProtocolEvent`] corresponds to one asynchronous callback
//! of the backend. The session routes them by [`CallbackKind`].

use crate::types::account::{AccountId, AccountType};
use crate::types::persona::{PersonaState, Relationship};
use crate::types::result::ResultCode;
use bytes::Bytes;
use serde::Serialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connected;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disconnected {
    /// Set by the protocol client when the disconnect was requested locally.
    pub user_initiated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedOn {
    pub result: ResultCode,
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedOff {
    pub result: ResultCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub persona_name: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GamePlayed {
    pub id: u64,
    pub name: String,
}

/// Presence change for one account (the logged-in account or a friend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaUpdate {
    pub account_id: AccountId,
    pub persona_name: String,
    pub state: PersonaState,
    pub avatar_hash: Option<Vec<u8>>,
    pub game: Option<GamePlayed>,
}

impl PersonaUpdate {
    pub fn new(account_id: AccountId, persona_name: impl Into<String>, state: PersonaState) -> Self {
        Self {
            account_id,
            persona_name: persona_name.into(),
            state,
            avatar_hash: None,
            game: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub account_id: AccountId,
    pub account_type: AccountType,
    pub relationship: Relationship,
}

impl RosterEntry {
    pub fn friend(account_id: AccountId) -> Self {
        Self {
            account_id,
            account_type: AccountType::Individual,
            relationship: Relationship::Friend,
        }
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationship = relationship;
        self
    }
}

/// Full list or delta of the friend roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendsList {
    pub incremental: bool,
    pub entries: Vec<RosterEntry>,
}

/// Collecting entries yields a full (non-incremental) list.
impl FromIterator<RosterEntry> for FriendsList {
    fn from_iter<I: IntoIterator<Item = RosterEntry>>(iter: I) -> Self {
        FriendsList {
            incremental: false,
            entries: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendAdded {
    pub result: ResultCode,
    pub account_id: Option<AccountId>,
    pub persona_name: String,
}

/// Request from the backend to store a machine-auth ("sentry") file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineAuthChallenge {
    pub job_id: u64,
    pub file_name: String,
    pub data: Bytes,
    pub offset: u32,
    pub bytes_to_write: u32,
    pub one_time_password: Option<String>,
}

/// Answer to a [`MachineAuthChallenge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineAuthResponse {
    pub job_id: u64,
    pub file_name: String,
    pub file_size: usize,
    pub offset: u32,
    pub bytes_written: u32,
    pub one_time_password: Option<String>,
    pub result: ResultCode,
    pub sentry_hash: Vec<u8>,
}

impl MachineAuthResponse {
    pub fn accept(challenge: &MachineAuthChallenge, sentry_hash: Vec<u8>) -> Self {
        Self {
            job_id: challenge.job_id,
            file_name: challenge.file_name.clone(),
            file_size: challenge.data.len(),
            offset: challenge.offset,
            bytes_written: challenge.bytes_to_write,
            one_time_password: challenge.one_time_password.clone(),
            result: ResultCode::Ok,
            sentry_hash,
        }
    }
}

/// Servers the backend suggests for future connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerList {
    pub servers: Vec<SocketAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProtocolEvent {
    Connected(Connected),
    Disconnected(Disconnected),
    LoggedOn(LoggedOn),
    LoggedOff(LoggedOff),
    AccountInfo(AccountInfo),
    PersonaState(PersonaUpdate),
    FriendsList(FriendsList),
    FriendAdded(FriendAdded),
    MachineAuth(MachineAuthChallenge),
    ServerList(ServerList),
}

/// Discriminant of a [`ProtocolEvent`], used as the routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CallbackKind {
    Connected,
    Disconnected,
    LoggedOn,
    LoggedOff,
    AccountInfo,
    PersonaState,
    FriendsList,
    FriendAdded,
    MachineAuth,
    ServerList,
}

impl ProtocolEvent {
    pub fn kind(&self) -> CallbackKind {
        match self {
            ProtocolEvent::Connected(_) => CallbackKind::Connected,
            ProtocolEvent::Disconnected(_) => CallbackKind::Disconnected,
            ProtocolEvent::LoggedOn(_) => CallbackKind::LoggedOn,
            ProtocolEvent::LoggedOff(_) => CallbackKind::LoggedOff,
            ProtocolEvent::AccountInfo(_) => CallbackKind::AccountInfo,
            ProtocolEvent::PersonaState(_) => CallbackKind::PersonaState,
            ProtocolEvent::FriendsList(_) => CallbackKind::FriendsList,
            ProtocolEvent::FriendAdded(_) => CallbackKind::FriendAdded,
            ProtocolEvent::MachineAuth(_) => CallbackKind::MachineAuth,
            ProtocolEvent::ServerList(_) => CallbackKind::ServerList,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_auth_response_echoes_challenge() {
        let challenge = MachineAuthChallenge {
            job_id: 7,
            file_name: "ssfn".into(),
            data: Bytes::from_static(b"sentry-bytes"),
            offset: 0,
            bytes_to_write: 12,
            one_time_password: Some("otp".into()),
        };
        let response = MachineAuthResponse::accept(&challenge, vec![1, 2, 3]);
        assert_eq!(response.job_id, 7);
        assert_eq!(response.file_size, 12);
        assert_eq!(response.bytes_written, 12);
        assert_eq!(response.one_time_password.as_deref(), Some("otp"));
        assert!(response.result.is_ok());
    }
}
