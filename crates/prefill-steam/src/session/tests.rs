use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;

use prefill_core::Account;

use super::*;
use crate::testing::{MemoryCredentialStore, ScriptedTransport};

mock! {
    pub Prompt {}

    #[async_trait]
    impl InteractivePrompt for Prompt {
        async fn read_username(&self) -> Result<String, PrefillError>;
        async fn read_secret(&self, prompt: &str) -> Result<String, PrefillError>;
        async fn read_code(&self, prompt: &str) -> Result<String, PrefillError>;
    }
}

fn logged_on(result: ResultCode) -> SessionEvent {
    SessionEvent::LoggedOn {
        result,
        cell_id: Some(4),
    }
}

fn session_key(key: &str) -> SessionEvent {
    SessionEvent::SessionKey {
        key: key.to_string(),
    }
}

fn password_prompt(times: usize) -> MockPrompt {
    let mut prompt = MockPrompt::new();
    prompt
        .expect_read_username()
        .times(1)
        .returning(|| Ok("gordon".to_string()));
    prompt
        .expect_read_secret()
        .times(times)
        .returning(|_| Ok("crowbar".to_string()));
    prompt
}

fn client(
    transport: &Arc<ScriptedTransport>,
    credentials: &Arc<MemoryCredentialStore>,
    prompt: MockPrompt,
) -> SessionClient {
    SessionClient::new(transport.clone(), credentials.clone(), Arc::new(prompt))
}

#[tokio::test(start_paused = true)]
async fn two_factor_required_twice_then_logged_on() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_logon(vec![logged_on(ResultCode::AccountLoginDeniedNeedTwoFactor)])
            .on_logon(vec![logged_on(ResultCode::TwoFactorCodeMismatch)])
            .on_logon(vec![logged_on(ResultCode::Ok), session_key("fresh")]),
    );
    let credentials = Arc::new(MemoryCredentialStore::default());
    let mut prompt = password_prompt(1);
    prompt
        .expect_read_code()
        .times(2)
        .returning(|_| Ok("F4K3C".to_string()));

    let session = client(&transport, &credentials, prompt);
    session.log_on().await.unwrap();

    assert_eq!(session.state().await, ConnectionState::LoggedOn);
    let logons = transport.logons();
    assert_eq!(logons.len(), 3);
    assert!(logons[0].two_factor_code.is_none());
    assert_eq!(logons[2].two_factor_code.as_deref(), Some("F4K3C"));
    // Re-prompting keeps the same connection
    assert_eq!(transport.connect_calls(), 1);

    let saved = credentials.snapshot();
    assert_eq!(saved.username.as_deref(), Some("gordon"));
    assert_eq!(saved.session_key.as_deref(), Some("fresh"));
}

#[tokio::test(start_paused = true)]
async fn email_guard_code_is_sent_as_auth_code() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_logon(vec![logged_on(ResultCode::AccountLogonDenied)])
            .on_logon(vec![logged_on(ResultCode::Ok), session_key("k")]),
    );
    let credentials = Arc::new(MemoryCredentialStore::default());
    let mut prompt = password_prompt(1);
    prompt
        .expect_read_code()
        .times(1)
        .returning(|_| Ok("MAIL1".to_string()));

    client(&transport, &credentials, prompt)
        .log_on()
        .await
        .unwrap();

    let logons = transport.logons();
    assert_eq!(logons[1].auth_code.as_deref(), Some("MAIL1"));
    assert!(logons[1].two_factor_code.is_none());
}

#[tokio::test(start_paused = true)]
async fn third_invalid_password_is_fatal() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_logon(vec![logged_on(ResultCode::InvalidPassword)])
            .on_logon(vec![logged_on(ResultCode::InvalidPassword)])
            .on_logon(vec![logged_on(ResultCode::InvalidPassword)]),
    );
    let credentials = Arc::new(MemoryCredentialStore::default());

    let err = client(&transport, &credentials, password_prompt(3))
        .log_on()
        .await
        .unwrap_err();

    assert!(matches!(err, PrefillError::AuthenticationFailed(_)));
    assert!(err.is_run_fatal());
    assert_eq!(transport.logons().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn expired_session_key_is_cleared_and_password_requested() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on_logon(vec![logged_on(ResultCode::InvalidPassword)])
            .on_logon(vec![logged_on(ResultCode::Ok)]),
    );
    let credentials = Arc::new(MemoryCredentialStore::with_account(Account {
        username: Some("gordon".to_string()),
        session_key: Some("stale".to_string()),
        ..Account::default()
    }));
    let mut prompt = MockPrompt::new();
    prompt
        .expect_read_secret()
        .times(1)
        .returning(|_| Ok("crowbar".to_string()));

    let session = client(&transport, &credentials, prompt);
    session.log_on().await.unwrap();

    let logons = transport.logons();
    assert_eq!(logons[0].session_key.as_deref(), Some("stale"));
    assert!(logons[0].password.is_none());
    assert!(logons[1].session_key.is_none());
    assert_eq!(logons[1].password.as_deref(), Some("crowbar"));
    // No new key was pushed, so none is kept
    assert!(credentials.snapshot().session_key.is_none());
}

#[tokio::test(start_paused = true)]
async fn missing_session_key_is_not_fatal() {
    let transport =
        Arc::new(ScriptedTransport::new().on_logon(vec![logged_on(ResultCode::Ok)]));
    let credentials = Arc::new(MemoryCredentialStore::default());

    let session = client(&transport, &credentials, password_prompt(1));
    let started = Instant::now();
    session.log_on().await.unwrap();

    assert_eq!(session.state().await, ConnectionState::LoggedOn);
    assert!(started.elapsed() >= SessionTimeouts::default().session_key);
}

#[tokio::test(start_paused = true)]
async fn service_unavailable_fails_logon() {
    let transport = Arc::new(
        ScriptedTransport::new().on_logon(vec![logged_on(ResultCode::ServiceUnavailable)]),
    );
    let credentials = Arc::new(MemoryCredentialStore::default());

    let err = client(&transport, &credentials, password_prompt(1))
        .log_on()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PrefillError::LoginFailed {
            result: ResultCode::ServiceUnavailable
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn machine_auth_token_is_saved_acknowledged_and_replayed() {
    let transport = Arc::new(ScriptedTransport::new().on_logon(vec![
        SessionEvent::MachineAuth {
            token: "sentry-bytes".to_string(),
        },
        logged_on(ResultCode::Ok),
        session_key("k1"),
    ]));
    let credentials = Arc::new(MemoryCredentialStore::default());

    client(&transport, &credentials, password_prompt(1))
        .log_on()
        .await
        .unwrap();

    let acks = transport.acks();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].token_hash, sentry_hash("sentry-bytes"));
    assert_eq!(
        credentials.snapshot().sentry_tokens.get("gordon").map(String::as_str),
        Some("sentry-bytes")
    );

    // A later run sends the stored token's hash with the session key
    let second = Arc::new(
        ScriptedTransport::new().on_logon(vec![logged_on(ResultCode::Ok), session_key("k2")]),
    );
    client(&second, &credentials, MockPrompt::new())
        .log_on()
        .await
        .unwrap();
    let logon = &second.logons()[0];
    assert_eq!(logon.session_key.as_deref(), Some("k1"));
    assert_eq!(logon.sentry_hash, Some(sentry_hash("sentry-bytes")));
}

#[tokio::test(start_paused = true)]
async fn connect_gives_up_after_deadline() {
    let transport = Arc::new(ScriptedTransport::new().with_connect_events(Vec::new()));
    let credentials = Arc::new(MemoryCredentialStore::default());

    let session = client(&transport, &credentials, MockPrompt::new());
    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, PrefillError::ConnectionTimeout { seconds: 30 }));
    assert_eq!(session.state().await, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn refused_connects_are_retried_until_deadline() {
    let transport = Arc::new(ScriptedTransport::new().failing_connect());
    let credentials = Arc::new(MemoryCredentialStore::default());

    let err = client(&transport, &credentials, MockPrompt::new())
        .connect()
        .await
        .unwrap_err();

    assert!(matches!(err, PrefillError::ConnectionTimeout { .. }));
    assert!(transport.connect_calls() > 1);
}

#[tokio::test(start_paused = true)]
async fn licenses_arrive_after_logon() {
    let transport = Arc::new(ScriptedTransport::logged_on_owning(&[
        AppId(730),
        AppId(440),
    ]));
    let credentials = Arc::new(MemoryCredentialStore::default());

    let session = client(&transport, &credentials, password_prompt(1));
    session.log_on().await.unwrap();

    assert_eq!(session.wait_for_licenses().await.unwrap(), 2);
    assert!(session.is_owned(AppId(730)).await);
    assert!(!session.is_owned(AppId(570)).await);
    assert_eq!(session.owned_apps().await, vec![AppId(440), AppId(730)]);
}

#[tokio::test(start_paused = true)]
async fn failed_license_query_is_an_error() {
    let transport = Arc::new(ScriptedTransport::new().on_logon(vec![
        logged_on(ResultCode::Ok),
        session_key("k"),
        SessionEvent::LicenseList {
            result: ResultCode::ServiceUnavailable,
            apps: Vec::new(),
        },
    ]));
    let credentials = Arc::new(MemoryCredentialStore::default());

    let session = client(&transport, &credentials, password_prompt(1));
    session.log_on().await.unwrap();

    let err = session.wait_for_licenses().await.unwrap_err();
    assert!(matches!(err, PrefillError::LicenseQueryFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn missing_license_list_times_out() {
    let transport = Arc::new(
        ScriptedTransport::new().on_logon(vec![logged_on(ResultCode::Ok), session_key("k")]),
    );
    let credentials = Arc::new(MemoryCredentialStore::default());

    let session = client(&transport, &credentials, password_prompt(1));
    session.log_on().await.unwrap();

    assert!(matches!(
        session.wait_for_licenses().await,
        Err(PrefillError::LicenseQueryFailed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn queries_require_logon() {
    let transport = Arc::new(ScriptedTransport::new());
    let credentials = Arc::new(MemoryCredentialStore::default());
    let session = client(&transport, &credentials, MockPrompt::new());

    assert!(matches!(
        session.app_info(&[AppId(730)]).await,
        Err(PrefillError::NotLoggedOn)
    ));
    assert!(matches!(
        session.cdn_servers().await,
        Err(PrefillError::NotLoggedOn)
    ));
    assert_eq!(transport.app_info_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_is_idempotent() {
    let transport = Arc::new(ScriptedTransport::logged_on_owning(&[AppId(730)]));
    let credentials = Arc::new(MemoryCredentialStore::default());

    let session = client(&transport, &credentials, password_prompt(1));
    session.log_on().await.unwrap();

    session.disconnect().await.unwrap();
    session.disconnect().await.unwrap();

    assert_eq!(session.state().await, ConnectionState::Disconnected);
    assert_eq!(transport.disconnect_calls(), 1);
}
