//! The session registry: token-keyed ownership of live connections.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sluice_store::{ResultCache, ResultCacheConfig};
use sluice_types::connection::SharedConnection;

use crate::config::RegistryConfig;
use crate::error::Result;
use crate::session::{Session, SessionMeta, SessionSummary};

/// State shared between registry handles and the reaper task.
struct RegistryInner {
    /// Active sessions by token. This lock is the registry's single
    /// mutual-exclusion domain; it is never held across an await.
    sessions: Mutex<HashMap<String, Arc<Session>>>,

    config: RegistryConfig,

    /// Template for each session's private result cache.
    cache_config: ResultCacheConfig,

    /// Shutdown signal observed by the reaper.
    shutdown: watch::Sender<bool>,

    /// Handle of the running reaper task, if any.
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl RegistryInner {
    /// Remove and tear down one session.
    ///
    /// This is the only removal path: lazy expiry in `get`, explicit
    /// `remove`, the reaper sweep, and `shutdown` all funnel through it.
    /// The map `remove` under the lock is the exactly-once step; whoever
    /// pops the session closes it, so duplicate evictions cannot
    /// double-close a connection.
    async fn evict(&self, token: &str) -> bool {
        let session = self.sessions.lock().remove(token);
        match session {
            Some(session) => {
                session.teardown().await;
                debug!(session = %token, "session closed");
                true
            }
            None => false,
        }
    }

    /// Evict every session whose idle timeout has elapsed.
    async fn sweep_idle(&self) -> usize {
        let idle_timeout = self.config.idle_timeout;
        let expired: Vec<String> = self
            .sessions
            .lock()
            .iter()
            .filter(|(_, session)| session.idle_for() > idle_timeout)
            .map(|(token, _)| token.clone())
            .collect();

        let mut reaped = 0;
        for token in &expired {
            if self.evict(token).await {
                reaped += 1;
            }
        }
        if reaped > 0 {
            info!(count = reaped, "idle sessions reaped");
        }
        reaped
    }
}

/// Registry of active sessions with idle expiry and liveness checks.
///
/// Cheap to clone; all clones share one session map. Construct one per
/// service instance and inject it — sessions do not survive a restart.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    /// Create a registry with default per-session result caches.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        Self::with_cache_config(config, ResultCacheConfig::default())
    }

    /// Create a registry with an explicit per-session cache policy.
    pub fn with_cache_config(
        config: RegistryConfig,
        cache_config: ResultCacheConfig,
    ) -> Result<Self> {
        config.validate()?;
        cache_config.validate()?;

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(RegistryInner {
                sessions: Mutex::new(HashMap::new()),
                config,
                cache_config,
                shutdown,
                reaper: Mutex::new(None),
            }),
        })
    }

    /// Register an authenticated connection under a freshly minted token.
    ///
    /// Never fails on capacity — admission control on the creation path
    /// is the rate limiter's job.
    pub fn create(&self, connection: SharedConnection, meta: SessionMeta) -> String {
        let token = Uuid::new_v4().to_string();
        // Cache config was validated when the registry was constructed.
        let results = ResultCache::with_config(self.inner.cache_config.clone())
            .expect("cache config validated at registry construction");
        let session = Arc::new(Session::new(token.clone(), connection, meta, results));

        self.inner
            .sessions
            .lock()
            .insert(token.clone(), Arc::clone(&session));
        info!(session = %token, user = %session.meta().user, "session created");
        token
    }

    /// Look up a live session, verifying idle state and liveness.
    ///
    /// Returns `None` for unknown tokens, idle-expired sessions, and
    /// sessions whose probe failed — all three mean "reconnect" to the
    /// caller. The probe runs outside the map lock so one slow or dead
    /// connection cannot stall other lookups.
    pub async fn get(&self, token: &str) -> Option<Arc<Session>> {
        let session = self.inner.sessions.lock().get(token).cloned()?;

        if session.idle_for() > self.inner.config.idle_timeout {
            debug!(session = %token, "session idle-expired on lookup");
            self.inner.evict(token).await;
            return None;
        }

        if !session.connection().probe().await {
            warn!(session = %token, "liveness probe failed, evicting session");
            self.inner.evict(token).await;
            return None;
        }

        session.touch();
        Some(session)
    }

    /// Explicitly close a session. Idempotent: safe to call twice, and
    /// the connection is closed at most once.
    pub async fn remove(&self, token: &str) -> bool {
        self.inner.evict(token).await
    }

    /// Run one reaper sweep immediately. The background reaper calls this
    /// on its interval; tests call it directly for determinism.
    pub async fn sweep_idle(&self) -> usize {
        self.inner.sweep_idle().await
    }

    /// Number of registered sessions, including any idle ones the reaper
    /// has not reached yet.
    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.lock().is_empty()
    }

    /// Snapshot of the registry and its sessions.
    pub fn stats(&self) -> RegistryStats {
        let sessions = self.inner.sessions.lock();
        RegistryStats {
            active_sessions: sessions.len(),
            idle_timeout_secs: self.inner.config.idle_timeout.as_secs(),
            sessions: sessions.values().map(|session| session.summary()).collect(),
        }
    }

    /// Start the background reaper. Idempotent; must be called from
    /// within a tokio runtime. The task holds only a weak reference, so
    /// dropping every registry handle also stops it.
    pub fn start_reaper(&self) {
        let mut guard = self.inner.reaper.lock();
        if guard.is_some() {
            return;
        }

        self.inner.shutdown.send_replace(false);
        let mut shutdown = self.inner.shutdown.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.config.reap_interval;

        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        inner.sweep_idle().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("session reaper stopped");
        }));
        info!(
            interval_secs = interval.as_secs(),
            "session reaper started"
        );
    }

    /// Stop the reaper deterministically, then close every session.
    ///
    /// The registry remains usable afterwards: `create` and `get` keep
    /// working against the now-empty map.
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        let reaper = self.inner.reaper.lock().take();
        if let Some(handle) = reaper {
            let _ = handle.await;
        }

        let tokens: Vec<String> = self.inner.sessions.lock().keys().cloned().collect();
        let mut closed = 0;
        for token in &tokens {
            if self.inner.evict(token).await {
                closed += 1;
            }
        }
        info!(closed, "session registry shut down");
    }
}

/// Registry-wide statistics.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub active_sessions: usize,
    pub idle_timeout_secs: u64,
    pub sessions: Vec<SessionSummary>,
}
