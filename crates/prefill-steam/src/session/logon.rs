//! Classification of logon results.

use prefill_core::ResultCode;

/// What the login loop does next after a `LoggedOn` push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogonResult {
    Success,
    /// Prompt for a fresh authenticator code and resend.
    TwoFactorRequired,
    /// Prompt for the emailed guard code and resend.
    EmailCodeRequired,
    /// Re-prompt for the password, up to the attempt limit.
    InvalidPassword,
    /// The cached session key was rejected. Clear it and fall back to a password.
    SessionExpired,
    /// Not recoverable by prompting.
    Failed(ResultCode),
}

impl LogonResult {
    /// Map a result code to the next step.
    ///
    /// `InvalidPassword` on a session-key logon means the key went stale,
    /// not that a typed password was wrong.
    pub const fn classify(result: ResultCode, used_session_key: bool) -> Self {
        match result {
            ResultCode::Ok => Self::Success,
            ResultCode::AccountLoginDeniedNeedTwoFactor | ResultCode::TwoFactorCodeMismatch => {
                Self::TwoFactorRequired
            }
            ResultCode::AccountLogonDenied | ResultCode::InvalidLoginAuthCode => {
                Self::EmailCodeRequired
            }
            ResultCode::Expired => Self::SessionExpired,
            ResultCode::InvalidPassword if used_session_key => Self::SessionExpired,
            ResultCode::InvalidPassword => Self::InvalidPassword,
            other => Self::Failed(other),
        }
    }
}
