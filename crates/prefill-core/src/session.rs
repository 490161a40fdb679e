//! Session protocol types.
//!
//! The distribution network pushes results asynchronously. Those pushes are
//! modelled as [`SessionEvent`] values drained from the transport by the
//! session state machine in `prefill-steam`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::AppId;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Transport is up but no account is authenticated.
    Connected,
    LoggingOn,
    LoggedOn,
}

impl ConnectionState {
    /// Whether the transport is up (authenticated or not).
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::LoggingOn | Self::LoggedOn)
    }
}

/// Result codes carried by server pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Ok,
    /// Email guard: an emailed code is required.
    AccountLogonDenied,
    /// Mobile authenticator: a one-time code is required.
    AccountLoginDeniedNeedTwoFactor,
    /// The one-time code was wrong or stale.
    TwoFactorCodeMismatch,
    /// The emailed code was wrong or stale.
    InvalidLoginAuthCode,
    InvalidPassword,
    /// The cached session key is no longer accepted.
    Expired,
    ServiceUnavailable,
    TryAnotherCm,
    RateLimitExceeded,
    /// Any code this client does not know.
    Unknown(i32),
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Events pushed by the distribution network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Connected,
    Disconnected {
        #[serde(default)]
        user_initiated: bool,
    },
    LoggedOn {
        result: ResultCode,
        /// Content-server cell the account was assigned to.
        #[serde(default)]
        cell_id: Option<u32>,
    },
    LoggedOff {
        result: ResultCode,
    },
    /// A reusable session key for future logons without a password.
    SessionKey {
        key: String,
    },
    /// Machine-auth ("sentry") token to persist and acknowledge.
    MachineAuth {
        token: String,
    },
    LicenseList {
        result: ResultCode,
        #[serde(default)]
        apps: Vec<AppId>,
    },
}

/// Logon request. Exactly one of `password` or `session_key` is expected.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogonDetails {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_factor_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    /// Hash of the stored machine-auth token, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentry_hash: Option<String>,
    /// Ask the server to push a session key.
    pub remember: bool,
}

impl fmt::Debug for LogonDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("LogonDetails")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("session_key", &redact(&self.session_key))
            .field("two_factor_code", &redact(&self.two_factor_code))
            .field("auth_code", &redact(&self.auth_code))
            .field("sentry_hash", &self.sentry_hash.is_some())
            .field("remember", &self.remember)
            .finish()
    }
}

/// Acknowledgement of a machine-auth push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineAuthAck {
    pub username: String,
    pub token_hash: String,
}

impl MachineAuthAck {
    pub fn new(username: impl Into<String>, token: &str) -> Self {
        Self {
            username: username.into(),
            token_hash: sentry_hash(token),
        }
    }
}

/// Hex SHA-256 of a machine-auth token, as sent in logons and acks.
pub fn sentry_hash(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Persisted account credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub username: Option<String>,
    pub session_key: Option<String>,
    /// Username → machine-auth token.
    pub sentry_tokens: HashMap<String, String>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("session_key", &self.session_key.is_some())
            .field("sentry_tokens", &self.sentry_tokens.len())
            .finish()
    }
}

/// A CDN content server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CdnServer {
    pub host: String,
    /// Lower is preferred.
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub weighted_load: u32,
}

impl CdnServer {
    pub fn new(host: impl Into<String>, priority: u32) -> Self {
        Self {
            host: host.into(),
            priority,
            weighted_load: 0,
        }
    }
}

impl fmt::Display for CdnServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_tagged_json() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"type":"logged_on","result":"account_login_denied_need_two_factor"}"#)
                .unwrap();
        assert_eq!(
            event,
            SessionEvent::LoggedOn {
                result: ResultCode::AccountLoginDeniedNeedTwoFactor,
                cell_id: None,
            }
        );

        let unknown: SessionEvent =
            serde_json::from_str(r#"{"type":"logged_off","result":{"unknown":84}}"#).unwrap();
        assert_eq!(
            unknown,
            SessionEvent::LoggedOff {
                result: ResultCode::Unknown(84)
            }
        );
    }

    #[test]
    fn logon_details_debug_redacts_secrets() {
        let details = LogonDetails {
            username: "gordon".to_string(),
            password: Some("hunter2".to_string()),
            ..LogonDetails::default()
        };
        let debug = format!("{details:?}");
        assert!(debug.contains("gordon"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn sentry_hash_is_stable_hex() {
        let hash = sentry_hash("token");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, sentry_hash("token"));
        assert_ne!(hash, sentry_hash("other"));
    }

    #[test]
    fn connection_state_reports_connected() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::LoggingOn.is_connected());
    }
}
