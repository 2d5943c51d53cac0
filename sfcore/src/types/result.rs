use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code carried inside callback payloads.
///
/// These are not errors from the session's point of view: a login that comes
/// back with `InvalidPassword` completed successfully as an operation, and it
/// is up to the caller to branch on the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Ok,
    Fail,
    InvalidPassword,
    AlreadyLoggedInElsewhere,
    ServiceUnavailable,
    Timeout,
    AccountLogonDenied,
    InvalidLoginAuthCode,
    AccountLoginDeniedNeedTwoFactor,
    TwoFactorCodeMismatch,
    Other(i32),
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        match code {
            1 => ResultCode::Ok,
            2 => ResultCode::Fail,
            5 => ResultCode::InvalidPassword,
            6 => ResultCode::AlreadyLoggedInElsewhere,
            20 => ResultCode::ServiceUnavailable,
            16 => ResultCode::Timeout,
            63 => ResultCode::AccountLogonDenied,
            65 => ResultCode::InvalidLoginAuthCode,
            85 => ResultCode::AccountLoginDeniedNeedTwoFactor,
            88 => ResultCode::TwoFactorCodeMismatch,
            other => ResultCode::Other(other),
        }
    }
}

impl ResultCode {
    pub fn code(&self) -> i32 {
        match self {
            ResultCode::Ok => 1,
            ResultCode::Fail => 2,
            ResultCode::InvalidPassword => 5,
            ResultCode::AlreadyLoggedInElsewhere => 6,
            ResultCode::ServiceUnavailable => 20,
            ResultCode::Timeout => 16,
            ResultCode::AccountLogonDenied => 63,
            ResultCode::InvalidLoginAuthCode => 65,
            ResultCode::AccountLoginDeniedNeedTwoFactor => 85,
            ResultCode::TwoFactorCodeMismatch => 88,
            ResultCode::Other(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResultCode::Ok)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Other(code) => write!(f, "Other({code})"),
            known => write!(f, "{known:?}"),
        }
    }
}
