//! In-memory transports for tests.
//!
//! [`ScriptedTransport`] replays canned session pushes in reaction to
//! requests. [`FakeCdn`] serves manifests and chunk bytes from memory and can
//! be told to fail specific chunks or hosts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use prefill_core::{
    Account, AppId, AppMetadata, CdnServer, CdnTransport, ChunkFetchError, ChunkId,
    CredentialStore, DepotId, InteractivePrompt, LogonDetails, MachineAuthAck, Manifest,
    ManifestId, PrefillError, PrefillResult, QueuedRequest, ResultCode, SessionEvent,
    SessionTransport, StoreError, TransportError,
};

use crate::session::SessionClient;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Scripted session transport
// ============================================================================

#[derive(Default)]
struct Script {
    queue: VecDeque<SessionEvent>,
    connect_events: Vec<SessionEvent>,
    logon_replies: VecDeque<Vec<SessionEvent>>,
    apps: HashMap<AppId, AppMetadata>,
    servers: Vec<CdnServer>,
    recent: Vec<AppId>,
    fail_connect: bool,
    connect_calls: usize,
    disconnect_calls: usize,
    app_info_calls: usize,
    logons: Vec<LogonDetails>,
    acks: Vec<MachineAuthAck>,
}

/// A session transport driven by a script of pushes.
///
/// - `connect` queues the connect events (`Connected` by default)
/// - each `send_logon` queues the next scripted reply batch
/// - `disconnect` queues a user-initiated `Disconnected`
/// - `pump_events` pops the queue, or sleeps for the timeout when it is empty
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                connect_events: vec![SessionEvent::Connected],
                ..Script::default()
            }),
        }
    }

    /// A transport that accepts the first logon and owns `apps`.
    pub fn logged_on_owning(apps: &[AppId]) -> Self {
        Self::new().on_logon(vec![
            SessionEvent::LoggedOn {
                result: ResultCode::Ok,
                cell_id: Some(0),
            },
            SessionEvent::SessionKey {
                key: "session-key".to_string(),
            },
            SessionEvent::LicenseList {
                result: ResultCode::Ok,
                apps: apps.to_vec(),
            },
        ])
    }

    /// Replace the events queued on every `connect`.
    #[must_use]
    pub fn with_connect_events(self, events: Vec<SessionEvent>) -> Self {
        lock(&self.script).connect_events = events;
        self
    }

    /// Make every `connect` call fail.
    #[must_use]
    pub fn failing_connect(self) -> Self {
        lock(&self.script).fail_connect = true;
        self
    }

    /// Queue the reply batch for the next unanswered logon.
    #[must_use]
    pub fn on_logon(self, events: Vec<SessionEvent>) -> Self {
        lock(&self.script).logon_replies.push_back(events);
        self
    }

    #[must_use]
    pub fn with_app(self, app: AppMetadata) -> Self {
        lock(&self.script).apps.insert(app.id, app);
        self
    }

    #[must_use]
    pub fn with_servers(self, servers: Vec<CdnServer>) -> Self {
        lock(&self.script).servers = servers;
        self
    }

    #[must_use]
    pub fn with_recent(self, apps: Vec<AppId>) -> Self {
        lock(&self.script).recent = apps;
        self
    }

    /// Push an event as if the server sent it unprompted.
    pub fn push(&self, event: SessionEvent) {
        lock(&self.script).queue.push_back(event);
    }

    /// Logon requests sent so far.
    pub fn logons(&self) -> Vec<LogonDetails> {
        lock(&self.script).logons.clone()
    }

    pub fn acks(&self) -> Vec<MachineAuthAck> {
        lock(&self.script).acks.clone()
    }

    pub fn connect_calls(&self) -> usize {
        lock(&self.script).connect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        lock(&self.script).disconnect_calls
    }

    pub fn app_info_calls(&self) -> usize {
        lock(&self.script).app_info_calls
    }
}

#[async_trait]
impl SessionTransport for ScriptedTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut script = lock(&self.script);
        script.connect_calls += 1;
        if script.fail_connect {
            return Err(TransportError::Network("connection refused".to_string()));
        }
        let events = script.connect_events.clone();
        script.queue.extend(events);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut script = lock(&self.script);
        script.disconnect_calls += 1;
        script.queue.push_back(SessionEvent::Disconnected {
            user_initiated: true,
        });
        Ok(())
    }

    async fn send_logon(&self, details: &LogonDetails) -> Result<(), TransportError> {
        let mut script = lock(&self.script);
        script.logons.push(details.clone());
        if let Some(reply) = script.logon_replies.pop_front() {
            script.queue.extend(reply);
        }
        Ok(())
    }

    async fn acknowledge_machine_auth(&self, ack: &MachineAuthAck) -> Result<(), TransportError> {
        lock(&self.script).acks.push(ack.clone());
        Ok(())
    }

    async fn pump_events(&self, timeout: Duration) -> Option<SessionEvent> {
        let next = lock(&self.script).queue.pop_front();
        if next.is_none() {
            tokio::time::sleep(timeout).await;
        }
        next
    }

    async fn app_info(&self, app_ids: &[AppId]) -> Result<Vec<AppMetadata>, TransportError> {
        let mut script = lock(&self.script);
        script.app_info_calls += 1;
        Ok(app_ids
            .iter()
            .filter_map(|id| script.apps.get(id).cloned())
            .collect())
    }

    async fn cdn_servers(&self, _cell_id: u32) -> Result<Vec<CdnServer>, TransportError> {
        Ok(lock(&self.script).servers.clone())
    }

    async fn recently_played(&self) -> Result<Vec<AppId>, TransportError> {
        Ok(lock(&self.script).recent.clone())
    }
}

// ============================================================================
// Fake CDN
// ============================================================================

#[derive(Default)]
struct CdnState {
    manifests: HashMap<(DepotId, ManifestId), Manifest>,
    chunks: HashMap<ChunkId, Bytes>,
    /// Chunk → (remaining failures, error). `None` remaining means always.
    chunk_failures: HashMap<ChunkId, (Option<usize>, ChunkFetchError)>,
    failing_hosts: HashSet<String>,
    chunk_requests: Vec<(String, ChunkId)>,
    manifest_requests: Vec<(String, DepotId, ManifestId)>,
}

/// A CDN serving content from memory.
#[derive(Default)]
pub struct FakeCdn {
    state: Mutex<CdnState>,
}

impl FakeCdn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `manifest`, plus a payload of the right length for each of its chunks.
    #[must_use]
    pub fn with_manifest(self, manifest: Manifest) -> Self {
        {
            let mut state = lock(&self.state);
            for chunk in manifest.chunks() {
                let len = usize::try_from(chunk.compressed_length).unwrap_or(0);
                state
                    .chunks
                    .entry(chunk.id.clone())
                    .or_insert_with(|| Bytes::from(vec![0xA5; len]));
            }
            state
                .manifests
                .insert((manifest.depot_id, manifest.manifest_id), manifest);
        }
        self
    }

    /// Serve `bytes` for a chunk regardless of its declared length.
    #[must_use]
    pub fn with_chunk_bytes(self, chunk: ChunkId, bytes: Bytes) -> Self {
        lock(&self.state).chunks.insert(chunk, bytes);
        self
    }

    /// Fail every request for `chunk`.
    #[must_use]
    pub fn failing_chunk(self, chunk: ChunkId, error: ChunkFetchError) -> Self {
        lock(&self.state).chunk_failures.insert(chunk, (None, error));
        self
    }

    /// Fail the first `times` requests for `chunk`, then serve it.
    #[must_use]
    pub fn flaky_chunk(self, chunk: ChunkId, times: usize, error: ChunkFetchError) -> Self {
        lock(&self.state)
            .chunk_failures
            .insert(chunk, (Some(times), error));
        self
    }

    /// Fail every request routed to `host`.
    #[must_use]
    pub fn failing_host(self, host: impl Into<String>) -> Self {
        lock(&self.state).failing_hosts.insert(host.into());
        self
    }

    /// Number of fetches made for `chunk`.
    pub fn chunk_attempts(&self, chunk: &ChunkId) -> usize {
        lock(&self.state)
            .chunk_requests
            .iter()
            .filter(|(_, id)| id == chunk)
            .count()
    }

    pub fn total_chunk_requests(&self) -> usize {
        lock(&self.state).chunk_requests.len()
    }

    /// Hosts asked for manifests, in order.
    pub fn manifest_hosts(&self) -> Vec<String> {
        lock(&self.state)
            .manifest_requests
            .iter()
            .map(|(host, _, _)| host.clone())
            .collect()
    }
}

#[async_trait]
impl CdnTransport for FakeCdn {
    async fn fetch_manifest(
        &self,
        server: &CdnServer,
        depot_id: DepotId,
        manifest_id: ManifestId,
    ) -> Result<Manifest, TransportError> {
        let mut state = lock(&self.state);
        state
            .manifest_requests
            .push((server.host.clone(), depot_id, manifest_id));

        if state.failing_hosts.contains(&server.host) {
            return Err(TransportError::Network(format!("{} unreachable", server.host)));
        }

        state
            .manifests
            .get(&(depot_id, manifest_id))
            .cloned()
            .ok_or_else(|| TransportError::Status {
                status: 404,
                url: format!("/depot/{depot_id}/manifest/{manifest_id}"),
            })
    }

    async fn fetch_chunk(
        &self,
        server: &CdnServer,
        request: &QueuedRequest,
    ) -> Result<Bytes, ChunkFetchError> {
        let mut state = lock(&self.state);
        state
            .chunk_requests
            .push((server.host.clone(), request.chunk_id.clone()));

        if state.failing_hosts.contains(&server.host) {
            return Err(ChunkFetchError::Connection(format!(
                "{} unreachable",
                server.host
            )));
        }

        if let Some((remaining, error)) = state.chunk_failures.get_mut(&request.chunk_id) {
            match remaining {
                None => return Err(error.clone()),
                Some(0) => {}
                Some(n) => {
                    *n -= 1;
                    return Err(error.clone());
                }
            }
        }

        state
            .chunks
            .get(&request.chunk_id)
            .cloned()
            .ok_or(ChunkFetchError::Status(404))
    }
}

// ============================================================================
// Credentials and prompts
// ============================================================================

/// Credential store kept in memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    account: Mutex<Account>,
}

impl MemoryCredentialStore {
    pub fn with_account(account: Account) -> Self {
        Self {
            account: Mutex::new(account),
        }
    }

    /// The last saved account.
    pub fn snapshot(&self) -> Account {
        lock(&self.account).clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load_account(&self) -> Result<Account, StoreError> {
        Ok(self.snapshot())
    }

    async fn save(&self, account: &Account) -> Result<(), StoreError> {
        *lock(&self.account) = account.clone();
        Ok(())
    }
}

/// Answers every prompt with fixed values.
pub struct StaticPrompt {
    pub username: String,
    pub secret: String,
    pub code: String,
}

impl Default for StaticPrompt {
    fn default() -> Self {
        Self {
            username: "gordon".to_string(),
            secret: "crowbar".to_string(),
            code: "F4K3C".to_string(),
        }
    }
}

#[async_trait]
impl InteractivePrompt for StaticPrompt {
    async fn read_username(&self) -> Result<String, PrefillError> {
        Ok(self.username.clone())
    }

    async fn read_secret(&self, _prompt: &str) -> Result<String, PrefillError> {
        Ok(self.secret.clone())
    }

    async fn read_code(&self, _prompt: &str) -> Result<String, PrefillError> {
        Ok(self.code.clone())
    }
}

/// A session logged on through `transport`, with licenses loaded.
///
/// `transport` should be built with [`ScriptedTransport::logged_on_owning`].
pub async fn logged_on_session(transport: Arc<ScriptedTransport>) -> PrefillResult<SessionClient> {
    let session = SessionClient::new(
        transport,
        Arc::new(MemoryCredentialStore::default()),
        Arc::new(StaticPrompt::default()),
    );
    session.log_on().await?;
    session.wait_for_licenses().await?;
    Ok(session)
}
