use crate::login::LoginFlowError;
use crate::settings::SettingsError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Facade operation, used to label timeouts and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    Connect,
    Disconnect,
    Login,
    Logout,
    SetPersonaName,
    SetPersonaState,
    SendChatMessage,
    AddFriend,
    RemoveFriend,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Connect => "connect",
            OperationKind::Disconnect => "disconnect",
            OperationKind::Login => "login",
            OperationKind::Logout => "logout",
            OperationKind::SetPersonaName => "set-persona-name",
            OperationKind::SetPersonaState => "set-persona-state",
            OperationKind::SendChatMessage => "send-chat-message",
            OperationKind::AddFriend => "add-friend",
            OperationKind::RemoveFriend => "remove-friend",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} timed out")]
    Timeout(OperationKind),
    /// The waiter went away without an outcome, which only happens when the
    /// runtime is shutting down underneath the session.
    #[error("session stopped before {0} completed")]
    Stopped(OperationKind),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("login flow error: {0}")]
    LoginFlow(#[from] LoginFlowError),
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout(_))
    }
}
