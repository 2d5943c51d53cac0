//! Interactive login as an explicit state machine.
//!
//! A login attempt may end waiting for a code the user has to type in (a
//! mailed auth code or a mobile authenticator code). Instead of blocking
//! until the code is available, the flow parks in an awaiting state and is
//! driven forward with [`LoginFlow::resume`].

use crate::error::SessionError;
use crate::session::Session;
use log::{debug, info, warn};
use serde::Serialize;
use sfcore::types::credentials::LoginDetails;
use sfcore::ResultCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoginState {
    Ready,
    /// The backend mailed an auth code; `retry` is set when the last code
    /// was rejected.
    AwaitingAuthCode { retry: bool },
    AwaitingTwoFactorCode { retry: bool },
    LoggedOn,
    Failed(LoginFailure),
}

impl LoginState {
    pub fn is_awaiting_code(&self) -> bool {
        matches!(
            self,
            LoginState::AwaitingAuthCode { .. } | LoginState::AwaitingTwoFactorCode { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
pub enum LoginFailure {
    #[error("username is required")]
    MissingUsername,
    #[error("password is required")]
    MissingPassword,
    #[error("account is logged in elsewhere")]
    AlreadyLoggedInElsewhere,
    #[error("invalid password")]
    InvalidPassword,
    #[error("cancelled by the user")]
    Cancelled,
    #[error("timed out")]
    TimedOut,
    #[error("rejected by the backend: {0}")]
    Rejected(ResultCode),
}

#[derive(Debug, Error)]
pub enum LoginFlowError {
    #[error("cannot {action} a login flow in state {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: LoginState,
    },
}

pub struct LoginFlow {
    session: Arc<Session>,
    details: LoginDetails,
    remember_account: bool,
    logout_first: bool,
    state: LoginState,
}

impl LoginFlow {
    pub fn new(session: Arc<Session>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            session,
            details: LoginDetails::new(username, password),
            remember_account: false,
            logout_first: false,
            state: LoginState::Ready,
        }
    }

    /// A flow for the account remembered in the settings, if any.
    pub async fn remembered(session: Arc<Session>) -> Option<Self> {
        let (username, password) = session.settings().remembered_credentials().await?;
        Some(Self::new(session, username, password).remember_account(true))
    }

    /// Persist the credentials after a successful login.
    pub fn remember_account(mut self, remember: bool) -> Self {
        self.remember_account = remember;
        self
    }

    /// Log the current account out before the first attempt.
    pub fn logout_first(mut self, logout_first: bool) -> Self {
        self.logout_first = logout_first;
        self
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    pub fn username(&self) -> &str {
        &self.details.username
    }

    /// Runs a login attempt from `Ready`, or again after a failure.
    pub async fn start(&mut self) -> Result<&LoginState, SessionError> {
        if !matches!(self.state, LoginState::Ready | LoginState::Failed(_)) {
            return Err(self.invalid("start").into());
        }

        if self.details.username.is_empty() {
            self.state = LoginState::Failed(LoginFailure::MissingUsername);
            return Ok(&self.state);
        }
        if self.details.password.is_empty() {
            self.state = LoginState::Failed(LoginFailure::MissingPassword);
            return Ok(&self.state);
        }

        self.details.auth_code = None;
        self.details.two_factor_code = None;
        self.attempt().await
    }

    /// Continues a flow waiting for a code. `None` means the user gave up.
    pub async fn resume(&mut self, code: Option<String>) -> Result<&LoginState, SessionError> {
        let awaiting_two_factor = match self.state {
            LoginState::AwaitingAuthCode { .. } => false,
            LoginState::AwaitingTwoFactorCode { .. } => true,
            _ => return Err(self.invalid("resume").into()),
        };

        let Some(code) = code else {
            info!(target: "Session/Login", "Login cancelled while waiting for a code");
            self.state = LoginState::Failed(LoginFailure::Cancelled);
            return Ok(&self.state);
        };

        if awaiting_two_factor {
            self.details.two_factor_code = Some(code);
        } else {
            self.details.auth_code = Some(code);
        }
        self.attempt().await
    }

    fn invalid(&self, action: &'static str) -> LoginFlowError {
        LoginFlowError::InvalidTransition {
            action,
            state: self.state.clone(),
        }
    }

    async fn attempt(&mut self) -> Result<&LoginState, SessionError> {
        let session = self.session.clone();
        // Tearing down the old connection must not look like connection loss.
        session.disable_reconnect();

        if std::mem::take(&mut self.logout_first)
            && let Err(e) = session.logout().await
        {
            debug!(target: "Session/Login", "Logout before login failed: {e}");
        }

        let result = async {
            if session.is_connected() {
                session.disconnect().await?;
                tokio::time::sleep(session.config().relogin_delay).await;
            }
            session.connect().await?;
            session.login(self.details.clone()).await
        }
        .await;

        let logged_on = match result {
            Ok(logged_on) => logged_on,
            Err(e) => {
                warn!(target: "Session/Login", "Login attempt for {} failed: {e}", self.details.username);
                self.state = LoginState::Failed(LoginFailure::TimedOut);
                return Err(e);
            }
        };

        self.state = match logged_on.result {
            ResultCode::Ok => LoginState::LoggedOn,
            ResultCode::AccountLogonDenied => LoginState::AwaitingAuthCode { retry: false },
            ResultCode::InvalidLoginAuthCode => LoginState::AwaitingAuthCode { retry: true },
            ResultCode::AccountLoginDeniedNeedTwoFactor => {
                LoginState::AwaitingTwoFactorCode { retry: false }
            }
            ResultCode::TwoFactorCodeMismatch => LoginState::AwaitingTwoFactorCode { retry: true },
            ResultCode::AlreadyLoggedInElsewhere => {
                LoginState::Failed(LoginFailure::AlreadyLoggedInElsewhere)
            }
            ResultCode::InvalidPassword => LoginState::Failed(LoginFailure::InvalidPassword),
            other => LoginState::Failed(LoginFailure::Rejected(other)),
        };
        info!(
            target: "Session/Login",
            "Login for {} returned {} -> {:?}", self.details.username, logged_on.result, self.state
        );

        match self.state {
            LoginState::LoggedOn => {
                session.enable_reconnect();
                self.persist_account().await?;
            }
            LoginState::Failed(_) => self.forget_account().await?,
            _ => {}
        }
        Ok(&self.state)
    }

    async fn persist_account(&self) -> Result<(), SessionError> {
        let settings = self.session.settings();
        let remember = self.remember_account;
        let username = self.details.username.clone();
        let password = self.details.password.clone();
        settings
            .update(|s| {
                s.should_remember_account = remember;
                if remember {
                    s.last_username = Some(username);
                    s.last_password = Some(password);
                } else {
                    s.last_username = None;
                    s.last_password = None;
                }
            })
            .await;
        settings.save().await?;
        Ok(())
    }

    async fn forget_account(&self) -> Result<(), SessionError> {
        let settings = self.session.settings();
        settings
            .update(|s| {
                s.should_remember_account = false;
                s.last_username = None;
                s.last_password = None;
            })
            .await;
        settings.save().await?;
        Ok(())
    }
}
