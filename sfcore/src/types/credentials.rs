use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials for a single login attempt.
///
/// The session keeps the last details it was given so that it can replay
/// them after an unexpected disconnect.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginDetails {
    pub username: String,
    pub password: String,
    /// Code mailed to the account owner when the machine is not recognised.
    pub auth_code: Option<String>,
    /// Code from the mobile authenticator.
    pub two_factor_code: Option<String>,
    /// Hash of the machine-auth file previously issued for this username.
    pub sentry_hash: Option<Vec<u8>>,
}

impl LoginDetails {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_auth_code(mut self, code: impl Into<String>) -> Self {
        self.auth_code = Some(code.into());
        self
    }

    pub fn with_two_factor_code(mut self, code: impl Into<String>) -> Self {
        self.two_factor_code = Some(code.into());
        self
    }
}

impl fmt::Debug for LoginDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginDetails")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_code", &self.auth_code.as_ref().map(|_| "<redacted>"))
            .field(
                "two_factor_code",
                &self.two_factor_code.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "sentry_hash",
                &self.sentry_hash.as_ref().map(|h| hex::encode(h)),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let details = LoginDetails::new("alice", "hunter2").with_auth_code("ABCDE");
        let rendered = format!("{details:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("ABCDE"));
    }
}
