use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque, stable network identity of an account.
///
/// The value is handed out by the protocol client and never interpreted
/// beyond equality, ordering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u64);

impl AccountId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for AccountId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid account id '{0}'")]
pub struct ParseAccountIdError(String);

impl FromStr for AccountId {
    type Err = ParseAccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(AccountId)
            .map_err(|_| ParseAccountIdError(s.to_string()))
    }
}

/// Kind of account an identity refers to. Only individual accounts end up
/// in the friend roster; clans and chat rooms are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Individual,
    Clan,
    Chat,
    Other(u8),
}

impl AccountType {
    pub fn is_individual(&self) -> bool {
        matches!(self, AccountType::Individual)
    }
}

impl From<u8> for AccountType {
    fn from(code: u8) -> Self {
        match code {
            1 => AccountType::Individual,
            7 => AccountType::Clan,
            8 => AccountType::Chat,
            other => AccountType::Other(other),
        }
    }
}

impl AccountType {
    pub fn code(&self) -> u8 {
        match self {
            AccountType::Individual => 1,
            AccountType::Clan => 7,
            AccountType::Chat => 8,
            AccountType::Other(code) => *code,
        }
    }
}

/// Who to send a friend request to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FriendTarget {
    Account(AccountId),
    /// Account name or e-mail address, resolved by the backend.
    AccountName(String),
}

impl From<AccountId> for FriendTarget {
    fn from(id: AccountId) -> Self {
        FriendTarget::Account(id)
    }
}

impl From<String> for FriendTarget {
    fn from(name: String) -> Self {
        FriendTarget::AccountName(name)
    }
}

impl From<&str> for FriendTarget {
    fn from(name: &str) -> Self {
        FriendTarget::AccountName(name.to_string())
    }
}

impl fmt::Display for FriendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FriendTarget::Account(id) => write!(f, "{id}"),
            FriendTarget::AccountName(name) => f.write_str(name),
        }
    }
}
