//! Authenticated session with the distribution network.
//!
//! The network answers requests with asynchronous pushes. [`SessionClient`]
//! turns that into a state machine: every step sends a request, then drains
//! [`SessionEvent`]s in short polls until its terminal condition holds or its
//! deadline passes. Nothing waits unbounded.
//!
//! ```text
//! Disconnected → Connecting → Connected → LoggingOn → LoggedOn → Disconnected
//! ```

mod logon;

pub use logon::LogonResult;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use prefill_core::session::sentry_hash;
use prefill_core::{
    Account, AppId, AppMetadata, CdnServer, ConnectionState, CredentialStore, InteractivePrompt,
    LogonDetails, MachineAuthAck, PrefillError, PrefillResult, ResultCode, SessionEvent,
    SessionTransport, TransportError,
};

/// Password attempts before logon gives up.
pub const MAX_PASSWORD_ATTEMPTS: u32 = 3;

/// Pause between transport connect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Deadlines for each step of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub connect: Duration,
    pub logon: Duration,
    pub license: Duration,
    /// How long to wait for a session-key push after logon.
    pub session_key: Duration,
    pub disconnect: Duration,
    /// Upper bound for a single `pump_events` call.
    pub poll_interval: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            logon: Duration::from_secs(30),
            license: Duration::from_secs(30),
            session_key: Duration::from_secs(10),
            disconnect: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Mutable session state. Only [`SessionClient::dispatch`] and the step
/// methods touch it, and never across a transport call.
#[derive(Default)]
struct SessionState {
    connection: ConnectionState,
    account: Account,
    username: Option<String>,
    cell_id: Option<u32>,
    logon_result: Option<(ResultCode, Option<u32>)>,
    session_key_received: bool,
    license_result: Option<ResultCode>,
    licenses: HashSet<AppId>,
}

/// One authenticated session per run.
///
/// All methods take `&self`, so the client can be shared behind an `Arc`
/// with the catalog and the server pool.
pub struct SessionClient {
    transport: Arc<dyn SessionTransport>,
    credentials: Arc<dyn CredentialStore>,
    prompt: Arc<dyn InteractivePrompt>,
    timeouts: SessionTimeouts,
    cell_id_override: Option<u32>,
    state: Mutex<SessionState>,
}

impl SessionClient {
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        credentials: Arc<dyn CredentialStore>,
        prompt: Arc<dyn InteractivePrompt>,
    ) -> Self {
        Self {
            transport,
            credentials,
            prompt,
            timeouts: SessionTimeouts::default(),
            cell_id_override: None,
            state: Mutex::new(SessionState::default()),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: SessionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Use a fixed content cell instead of the one assigned at logon.
    #[must_use]
    pub fn with_cell_id(mut self, cell_id: Option<u32>) -> Self {
        self.cell_id_override = cell_id;
        self
    }

    pub async fn state(&self) -> ConnectionState {
        self.state.lock().await.connection
    }

    pub async fn username(&self) -> Option<String> {
        self.state.lock().await.username.clone()
    }

    /// Whether the logged-on account owns `app_id`.
    ///
    /// Always false before [`wait_for_licenses`](Self::wait_for_licenses) succeeds.
    pub async fn is_owned(&self, app_id: AppId) -> bool {
        self.state.lock().await.licenses.contains(&app_id)
    }

    /// Every owned app id, ascending.
    pub async fn owned_apps(&self) -> Vec<AppId> {
        let mut apps: Vec<AppId> = self.state.lock().await.licenses.iter().copied().collect();
        apps.sort_unstable();
        apps
    }

    /// Open the connection, retrying until it is up or the connect deadline passes.
    pub async fn connect(&self) -> PrefillResult<()> {
        {
            let mut state = self.state.lock().await;
            if state.connection.is_connected() {
                return Ok(());
            }
            state.connection = ConnectionState::Connecting;
        }

        info!(target: "prefill.session", "Connecting to Steam");
        let deadline = Instant::now() + self.timeouts.connect;

        while Instant::now() < deadline {
            if let Err(e) = self.transport.connect().await {
                debug!(target: "prefill.session", error = %e, "Connect attempt failed");
                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::sleep(RECONNECT_DELAY.min(remaining)).await;
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = self
                .pump_until(remaining, |state| match state.connection {
                    ConnectionState::Connected => Some(true),
                    ConnectionState::Disconnected => Some(false),
                    _ => None,
                })
                .await?;

            match outcome {
                Some(true) => {
                    info!(target: "prefill.session", "Connected");
                    return Ok(());
                }
                Some(false) => {
                    debug!(target: "prefill.session", "Connection dropped, retrying");
                    self.set_connection(ConnectionState::Connecting).await;
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    tokio::time::sleep(RECONNECT_DELAY.min(remaining)).await;
                }
                None => break,
            }
        }

        self.set_connection(ConnectionState::Disconnected).await;
        Err(PrefillError::ConnectionTimeout {
            seconds: self.timeouts.connect.as_secs(),
        })
    }

    /// Authenticate, prompting as the network demands.
    ///
    /// Uses the saved session key when there is one and a password
    /// otherwise. Guard codes and password retries are resent on the same
    /// connection.
    pub async fn log_on(&self) -> PrefillResult<()> {
        if self.state().await == ConnectionState::LoggedOn {
            return Ok(());
        }
        self.connect().await?;

        let mut account = self.credentials.load_account().await?;
        let username = match account.username.clone() {
            Some(username) => username,
            None => self.prompt.read_username().await?.trim().to_string(),
        };
        if account.username.as_deref() != Some(username.as_str()) {
            account.username = Some(username.clone());
            account.session_key = None;
        }

        let mut details = LogonDetails {
            username: username.clone(),
            sentry_hash: account.sentry_tokens.get(&username).map(|t| sentry_hash(t)),
            remember: true,
            ..LogonDetails::default()
        };
        match &account.session_key {
            Some(key) => details.session_key = Some(key.clone()),
            None => details.password = Some(self.read_password(&username).await?),
        }

        {
            let mut state = self.state.lock().await;
            state.account = account;
            state.username = Some(username.clone());
            state.session_key_received = false;
        }

        let mut invalid_passwords = 0;
        let cell_id = loop {
            let (result, cell_id) = self.send_logon_and_wait(&details).await?;

            match LogonResult::classify(result, details.session_key.is_some()) {
                LogonResult::Success => break cell_id,
                LogonResult::TwoFactorRequired => {
                    info!(target: "prefill.session", "Two-factor code required");
                    details.two_factor_code = Some(
                        self.prompt
                            .read_code("Enter the code from your Steam Guard mobile authenticator")
                            .await?,
                    );
                }
                LogonResult::EmailCodeRequired => {
                    info!(target: "prefill.session", "Email guard code required");
                    details.auth_code = Some(
                        self.prompt
                            .read_code("Enter the Steam Guard code sent to your email")
                            .await?,
                    );
                }
                LogonResult::InvalidPassword => {
                    invalid_passwords += 1;
                    if invalid_passwords >= MAX_PASSWORD_ATTEMPTS {
                        return Err(PrefillError::AuthenticationFailed(format!(
                            "invalid password for '{username}' after {invalid_passwords} attempts"
                        )));
                    }
                    warn!(
                        target: "prefill.session",
                        attempt = invalid_passwords,
                        "Invalid password"
                    );
                    details.password = Some(self.read_password(&username).await?);
                }
                LogonResult::SessionExpired => {
                    let expired = PrefillError::SessionExpired {
                        username: username.clone(),
                    };
                    warn!(target: "prefill.session", "{expired}, password required");
                    self.clear_session_key().await?;
                    details.session_key = None;
                    details.password = Some(self.read_password(&username).await?);
                }
                LogonResult::Failed(result) => {
                    return Err(PrefillError::LoginFailed { result });
                }
            }
        };

        let account = {
            let mut state = self.state.lock().await;
            state.connection = ConnectionState::LoggedOn;
            state.cell_id = cell_id;
            state.account.clone()
        };
        self.credentials.save(&account).await?;
        info!(target: "prefill.session", username = %username, "Logged on");

        let key = self
            .pump_until(self.timeouts.session_key, |state| {
                state.session_key_received.then_some(())
            })
            .await?;
        if key.is_none() {
            warn!(
                target: "prefill.session",
                "No session key received; the password will be needed next run"
            );
        }

        Ok(())
    }

    /// Wait for the owned-license push. Returns the number of owned apps.
    pub async fn wait_for_licenses(&self) -> PrefillResult<usize> {
        self.require_logged_on().await?;

        let result = self
            .pump_until(self.timeouts.license, |state| state.license_result)
            .await?;

        match result {
            Some(ResultCode::Ok) => {
                let count = self.state.lock().await.licenses.len();
                info!(target: "prefill.session", apps = count, "Licenses loaded");
                Ok(count)
            }
            Some(other) => Err(PrefillError::LicenseQueryFailed(other.to_string())),
            None => Err(PrefillError::LicenseQueryFailed(format!(
                "no license list within {}s",
                self.timeouts.license.as_secs()
            ))),
        }
    }

    /// Close the connection. Safe to call more than once or mid-run.
    pub async fn disconnect(&self) -> PrefillResult<()> {
        if self.state().await == ConnectionState::Disconnected {
            return Ok(());
        }

        if let Err(e) = self.transport.disconnect().await {
            warn!(target: "prefill.session", error = %e, "Disconnect request failed");
        }

        let done = self
            .pump_until(self.timeouts.disconnect, |state| {
                (state.connection == ConnectionState::Disconnected).then_some(())
            })
            .await;
        if !matches!(done, Ok(Some(()))) {
            debug!(target: "prefill.session", "No disconnect confirmation, closing anyway");
        }

        self.set_connection(ConnectionState::Disconnected).await;
        info!(target: "prefill.session", "Disconnected");
        Ok(())
    }

    /// Metadata for a batch of apps. Unknown ids are omitted.
    pub async fn app_info(&self, app_ids: &[AppId]) -> PrefillResult<Vec<AppMetadata>> {
        self.require_logged_on().await?;
        Ok(self.transport.app_info(app_ids).await?)
    }

    /// Content servers for the session's cell.
    pub async fn cdn_servers(&self) -> PrefillResult<Vec<CdnServer>> {
        self.require_logged_on().await?;
        let cell_id = match self.cell_id_override {
            Some(cell) => cell,
            None => self.state.lock().await.cell_id.unwrap_or(0),
        };
        Ok(self.transport.cdn_servers(cell_id).await?)
    }

    pub async fn recently_played(&self) -> PrefillResult<Vec<AppId>> {
        self.require_logged_on().await?;
        Ok(self.transport.recently_played().await?)
    }

    async fn require_logged_on(&self) -> PrefillResult<()> {
        if self.state().await == ConnectionState::LoggedOn {
            Ok(())
        } else {
            Err(PrefillError::NotLoggedOn)
        }
    }

    async fn set_connection(&self, connection: ConnectionState) {
        self.state.lock().await.connection = connection;
    }

    async fn read_password(&self, username: &str) -> PrefillResult<String> {
        self.prompt
            .read_secret(&format!("Enter the password for '{username}'"))
            .await
    }

    async fn clear_session_key(&self) -> PrefillResult<()> {
        let account = {
            let mut state = self.state.lock().await;
            state.account.session_key = None;
            state.account.clone()
        };
        self.credentials.save(&account).await?;
        Ok(())
    }

    /// Send one logon and wait for its result.
    async fn send_logon_and_wait(
        &self,
        details: &LogonDetails,
    ) -> PrefillResult<(ResultCode, Option<u32>)> {
        {
            let mut state = self.state.lock().await;
            state.connection = ConnectionState::LoggingOn;
            state.logon_result = None;
        }

        debug!(
            target: "prefill.session",
            with_session_key = details.session_key.is_some(),
            with_two_factor = details.two_factor_code.is_some(),
            with_auth_code = details.auth_code.is_some(),
            "Sending logon"
        );
        self.transport.send_logon(details).await?;

        let outcome = self
            .pump_until(self.timeouts.logon, |state| {
                if let Some(result) = state.logon_result.take() {
                    return Some(Ok(result));
                }
                (state.connection == ConnectionState::Disconnected).then_some(Err(()))
            })
            .await?;

        match outcome {
            Some(Ok((result, cell_id))) => {
                if result != ResultCode::Ok {
                    self.set_connection(ConnectionState::Connected).await;
                }
                Ok((result, cell_id))
            }
            Some(Err(())) => Err(TransportError::NotConnected.into()),
            None => {
                self.set_connection(ConnectionState::Connected).await;
                Err(PrefillError::ConnectionTimeout {
                    seconds: self.timeouts.logon.as_secs(),
                })
            }
        }
    }

    /// Drain events until `check` yields a value or `timeout` elapses.
    ///
    /// `check` runs against the state before the first poll and after every
    /// event, so a push that arrived during an earlier step is still seen.
    async fn pump_until<T>(
        &self,
        timeout: Duration,
        mut check: impl FnMut(&mut SessionState) -> Option<T>,
    ) -> PrefillResult<Option<T>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(value) = check(&mut state) {
                    return Ok(Some(value));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let wait = self.timeouts.poll_interval.min(deadline - now);
            if let Some(event) = self.transport.pump_events(wait).await {
                self.dispatch(event).await?;
            }
        }
    }

    /// Apply one pushed event to the session.
    async fn dispatch(&self, event: SessionEvent) -> PrefillResult<()> {
        match event {
            SessionEvent::Connected => {
                let mut state = self.state.lock().await;
                if !state.connection.is_connected() {
                    state.connection = ConnectionState::Connected;
                }
            }
            SessionEvent::Disconnected { user_initiated } => {
                self.set_connection(ConnectionState::Disconnected).await;
                if !user_initiated {
                    warn!(target: "prefill.session", "Connection closed by the server");
                }
            }
            SessionEvent::LoggedOn { result, cell_id } => {
                debug!(target: "prefill.session", %result, "Logon result");
                self.state.lock().await.logon_result = Some((result, cell_id));
            }
            SessionEvent::LoggedOff { result } => {
                warn!(target: "prefill.session", %result, "Logged off by the server");
                let mut state = self.state.lock().await;
                if state.connection == ConnectionState::LoggedOn {
                    state.connection = ConnectionState::Connected;
                }
            }
            SessionEvent::SessionKey { key } => {
                let account = {
                    let mut state = self.state.lock().await;
                    state.account.session_key = Some(key);
                    state.session_key_received = true;
                    state.account.clone()
                };
                self.credentials.save(&account).await?;
                debug!(target: "prefill.session", "Session key saved");
            }
            SessionEvent::MachineAuth { token } => {
                let saved = {
                    let mut state = self.state.lock().await;
                    match state.username.clone() {
                        Some(username) => {
                            state
                                .account
                                .sentry_tokens
                                .insert(username.clone(), token.clone());
                            Some((username, state.account.clone()))
                        }
                        None => None,
                    }
                };
                let Some((username, account)) = saved else {
                    warn!(target: "prefill.session", "Machine-auth push before logon, ignored");
                    return Ok(());
                };
                self.credentials.save(&account).await?;
                self.transport
                    .acknowledge_machine_auth(&MachineAuthAck::new(username, &token))
                    .await?;
                debug!(target: "prefill.session", "Machine-auth token saved and acknowledged");
            }
            SessionEvent::LicenseList { result, apps } => {
                let mut state = self.state.lock().await;
                state.license_result = Some(result);
                if result == ResultCode::Ok {
                    state.licenses = apps.into_iter().collect();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
