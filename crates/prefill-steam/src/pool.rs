//! Ranked, rotating set of CDN endpoints.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use prefill_core::{CdnServer, PrefillError, PrefillResult};

use crate::session::SessionClient;

/// How long a failed endpoint is skipped.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15);

#[derive(Debug)]
struct Entry {
    server: CdnServer,
    penalty: u32,
    cooling_until: Option<Instant>,
}

impl Entry {
    fn is_available(&self, now: Instant) -> bool {
        self.cooling_until.is_none_or(|until| until <= now)
    }

    const fn rank(&self) -> (u32, u32, u32) {
        (self.penalty, self.server.priority, self.server.weighted_load)
    }
}

/// Hands out the best endpoint that is not cooling down.
///
/// Ranking is lowest penalty, then priority, then weighted load. A failure
/// raises the penalty and starts a cool-down; a success decays the penalty.
pub struct ServerPool {
    entries: Mutex<Vec<Entry>>,
    cooldown: Duration,
}

impl Default for ServerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerPool {
    pub fn new() -> Self {
        Self::with_cooldown(DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            cooldown,
        }
    }

    /// Replace the candidate set. Duplicate hosts keep their first entry.
    pub async fn populate(&self, servers: Vec<CdnServer>) {
        let mut entries: Vec<Entry> = Vec::with_capacity(servers.len());
        for server in servers {
            if entries.iter().any(|e| e.server.host == server.host) {
                continue;
            }
            entries.push(Entry {
                server,
                penalty: 0,
                cooling_until: None,
            });
        }
        debug!(target: "prefill.pool", servers = entries.len(), "Server pool populated");
        *self.entries.lock().await = entries;
    }

    /// Populate from the session's content servers unless already populated.
    ///
    /// Returns the pool size. An empty server list is `NoServersAvailable`.
    pub async fn ensure_populated(&self, session: &SessionClient) -> PrefillResult<usize> {
        let len = self.len().await;
        if len > 0 {
            return Ok(len);
        }

        let servers = session.cdn_servers().await?;
        if servers.is_empty() {
            return Err(PrefillError::NoServersAvailable);
        }
        self.populate(servers).await;
        Ok(self.len().await)
    }

    /// The best-ranked endpoint outside its cool-down.
    pub async fn acquire(&self) -> PrefillResult<CdnServer> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|e| e.is_available(now))
            .min_by_key(|e| e.rank())
            .map(|e| e.server.clone())
            .ok_or(PrefillError::NoServersAvailable)
    }

    /// Like [`acquire`](Self::acquire), but sleeps through a cool-down that
    /// ends within `max_wait`.
    pub async fn acquire_within(&self, max_wait: Duration) -> PrefillResult<CdnServer> {
        let deadline = Instant::now() + max_wait;
        loop {
            if let Ok(server) = self.acquire().await {
                return Ok(server);
            }
            match self.earliest_available().await {
                Some(resume_at) if resume_at <= deadline => {
                    tokio::time::sleep_until(resume_at).await;
                }
                _ => return Err(PrefillError::NoServersAvailable),
            }
        }
    }

    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// When the next endpoint leaves its cool-down, or now if one already has.
    ///
    /// `None` only for an empty pool.
    pub async fn earliest_available(&self) -> Option<Instant> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .iter()
            .map(|e| e.cooling_until.map_or(now, |until| until.max(now)))
            .min()
    }

    /// Demote `server` and start its cool-down.
    pub async fn report_failure(&self, server: &CdnServer) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.iter_mut().find(|e| e.server.host == server.host) {
            entry.penalty = entry.penalty.saturating_add(1);
            entry.cooling_until = Some(Instant::now() + self.cooldown);
            debug!(
                target: "prefill.pool",
                host = %server.host,
                penalty = entry.penalty,
                "Server demoted"
            );
        }
        let now = Instant::now();
        if !entries.iter().any(|e| e.is_available(now)) {
            warn!(target: "prefill.pool", "Every content server is cooling down");
        }
    }

    /// Halve the penalty of `server`.
    pub async fn report_success(&self, server: &CdnServer) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.iter_mut().find(|e| e.server.host == server.host) {
            entry.penalty /= 2;
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servers() -> Vec<CdnServer> {
        vec![
            CdnServer::new("cache1-fra.steamcontent.com", 2),
            CdnServer::new("cache2-fra.steamcontent.com", 1),
            CdnServer::new("cache3-ams.steamcontent.com", 3),
        ]
    }

    #[tokio::test]
    async fn acquire_prefers_lowest_priority() {
        let pool = ServerPool::new();
        pool.populate(servers()).await;

        assert_eq!(
            pool.acquire().await.unwrap().host,
            "cache2-fra.steamcontent.com"
        );
    }

    #[tokio::test]
    async fn weighted_load_breaks_priority_ties() {
        let pool = ServerPool::new();
        let mut busy = CdnServer::new("busy", 1);
        busy.weighted_load = 90;
        let mut idle = CdnServer::new("idle", 1);
        idle.weighted_load = 10;
        pool.populate(vec![busy, idle]).await;

        assert_eq!(pool.acquire().await.unwrap().host, "idle");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_server_is_skipped_while_cooling() {
        let pool = ServerPool::new();
        pool.populate(servers()).await;

        let best = pool.acquire().await.unwrap();
        pool.report_failure(&best).await;

        for _ in 0..5 {
            assert_ne!(pool.acquire().await.unwrap(), best);
        }

        // Cool-down over, but the penalty still ranks it behind healthy servers
        tokio::time::advance(DEFAULT_COOLDOWN).await;
        assert_eq!(
            pool.acquire().await.unwrap().host,
            "cache1-fra.steamcontent.com"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_servers_only_when_all_cooling() {
        let pool = ServerPool::new();
        pool.populate(servers()).await;

        for server in servers() {
            assert!(pool.acquire().await.is_ok());
            pool.report_failure(&server).await;
        }

        assert!(matches!(
            pool.acquire().await,
            Err(PrefillError::NoServersAvailable)
        ));

        tokio::time::advance(DEFAULT_COOLDOWN).await;
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn earliest_available_tracks_the_shortest_cool_down() {
        let pool = ServerPool::new();
        pool.populate(vec![CdnServer::new("a", 1), CdnServer::new("b", 2)])
            .await;
        let start = Instant::now();
        assert_eq!(pool.earliest_available().await, Some(start));

        pool.report_failure(&CdnServer::new("a", 1)).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        pool.report_failure(&CdnServer::new("b", 2)).await;

        assert_eq!(
            pool.earliest_available().await,
            Some(start + DEFAULT_COOLDOWN)
        );
        tokio::time::sleep_until(start + DEFAULT_COOLDOWN).await;
        assert_eq!(pool.acquire().await.unwrap().host, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_within_sleeps_through_a_short_cool_down() {
        let pool = ServerPool::new();
        pool.populate(vec![CdnServer::new("a", 1)]).await;
        pool.report_failure(&CdnServer::new("a", 1)).await;

        assert!(matches!(
            pool.acquire_within(Duration::from_secs(1)).await,
            Err(PrefillError::NoServersAvailable)
        ));

        let start = Instant::now();
        assert_eq!(
            pool.acquire_within(pool.cooldown()).await.unwrap().host,
            "a"
        );
        assert!(start.elapsed() >= DEFAULT_COOLDOWN - Duration::from_secs(1));
    }

    #[tokio::test]
    async fn empty_pool_has_no_servers() {
        let pool = ServerPool::new();
        assert!(pool.is_empty().await);
        assert_eq!(pool.earliest_available().await, None);
        assert!(matches!(
            pool.acquire_within(DEFAULT_COOLDOWN).await,
            Err(PrefillError::NoServersAvailable)
        ));
        assert!(matches!(
            pool.acquire().await,
            Err(PrefillError::NoServersAvailable)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn success_decays_penalty() {
        let pool = ServerPool::with_cooldown(Duration::ZERO);
        pool.populate(vec![CdnServer::new("a", 1), CdnServer::new("b", 2)])
            .await;

        let a = CdnServer::new("a", 1);
        pool.report_failure(&a).await;
        assert_eq!(pool.acquire().await.unwrap().host, "b");

        pool.report_success(&a).await;
        assert_eq!(pool.acquire().await.unwrap().host, "a");
    }

    #[tokio::test]
    async fn duplicate_hosts_are_collapsed() {
        let pool = ServerPool::new();
        pool.populate(vec![CdnServer::new("a", 1), CdnServer::new("a", 5)])
            .await;
        assert_eq!(pool.len().await, 1);
    }
}
