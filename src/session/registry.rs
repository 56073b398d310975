//! Session registry.
//!
//! Holds every live session behind a single mutex. Each public operation is
//! one short critical section; the idle sweep is the only O(n) one.

use super::cleanup::CleanupScheduler;
use super::identity::SessionIdentity;
use crate::consent::WriteAccess;
use crate::server::metrics;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-connection record of what a client may call.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub mode: String,
    pub enabled_tools: BTreeSet<String>,
    pub enabled_categories: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub client_info: Map<String, Value>,
    pub write_access: WriteAccess,
}

impl Session {
    fn new(identity: &SessionIdentity, essential_tools: &BTreeSet<String>) -> Self {
        let now = Utc::now();
        Self {
            id: identity.session_id(),
            mode: identity.mode.clone(),
            enabled_tools: essential_tools.clone(),
            enabled_categories: BTreeSet::new(),
            created_at: now,
            last_activity: now,
            client_info: Map::new(),
            write_access: WriteAccess::default(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn is_idle(&self, now: DateTime<Utc>, timeout: ChronoDuration) -> bool {
        now - self.last_activity > timeout
    }

    pub fn is_all_tools_mode(&self) -> bool {
        self.mode == super::identity::ALL_TOOLS_MODE
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub cleanup_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60 * 60),
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    essential_tools: BTreeSet<String>,
    idle_timeout: ChronoDuration,
    cleanup: CleanupScheduler,
}

impl SessionRegistry {
    pub fn new(
        settings: &SessionSettings,
        essential_tools: &BTreeSet<String>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            essential_tools: essential_tools.clone(),
            idle_timeout: ChronoDuration::from_std(settings.idle_timeout)
                .unwrap_or_else(|_| ChronoDuration::minutes(60)),
            cleanup: CleanupScheduler::new(settings.cleanup_interval, shutdown),
        })
    }

    pub fn essential_tools(&self) -> &BTreeSet<String> {
        &self.essential_tools
    }

    pub fn idle_timeout(&self) -> ChronoDuration {
        self.idle_timeout
    }

    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    /// Returns the session for `identity`, creating it on first sight.
    /// Existing sessions are touched.
    pub async fn get_or_create(self: &Arc<Self>, identity: &SessionIdentity) -> Session {
        self.get_or_restore(identity, WriteAccess::default()).await
    }

    /// Like [`get_or_create`](Self::get_or_create), but a session created
    /// here starts with `write_access` instead of the locked default. An
    /// existing session keeps the access it has.
    pub async fn get_or_restore(
        self: &Arc<Self>,
        identity: &SessionIdentity,
        write_access: WriteAccess,
    ) -> Session {
        let session_id = identity.session_id();
        let (session, active) = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get_mut(&session_id) {
                Some(session) => {
                    session.touch();
                    (session.clone(), None)
                }
                None => {
                    let mut session = Session::new(identity, &self.essential_tools);
                    session.write_access = write_access;
                    sessions.insert(session_id.clone(), session.clone());
                    (session, Some(sessions.len()))
                }
            }
        };

        if let Some(active) = active {
            info!(
                "Created session {} for {}:{} (mode {}, write access {:?})",
                session_id, identity.host, identity.port, identity.mode, write_access
            );
            metrics::set_active_sessions(active);
            self.cleanup.ensure_started(Arc::downgrade(self));
        }
        session
    }

    /// Replaces the enabled sets of the session. Essentials are always kept.
    pub async fn update_tools(
        self: &Arc<Self>,
        identity: &SessionIdentity,
        tools: BTreeSet<String>,
        categories: BTreeSet<String>,
    ) -> Session {
        self.modify(identity, |session| {
            session.enabled_tools = tools;
            session.enabled_categories = categories;
        })
        .await
        .0
    }

    /// Grows the enabled sets of the session in one critical section.
    ///
    /// `change` sees the current session under the registry lock, so
    /// concurrent enables on the same session cannot drop each other's
    /// additions. Returns the updated session and the output of `change`.
    pub async fn enable<F, R>(
        self: &Arc<Self>,
        identity: &SessionIdentity,
        change: F,
    ) -> (Session, R)
    where
        F: FnOnce(&mut Session) -> R,
    {
        self.modify(identity, change).await
    }

    pub async fn set_write_access(
        self: &Arc<Self>,
        identity: &SessionIdentity,
        write_access: WriteAccess,
    ) -> Session {
        self.modify(identity, |session| session.write_access = write_access)
            .await
            .0
    }

    pub async fn set_client_info(
        self: &Arc<Self>,
        identity: &SessionIdentity,
        client_info: Map<String, Value>,
    ) -> Session {
        self.modify(identity, |session| session.client_info = client_info)
            .await
            .0
    }

    /// Applies `change` to the session under the lock, creating it first if
    /// it was evicted in the meantime. Essentials are re-added afterwards.
    async fn modify<F, R>(
        self: &Arc<Self>,
        identity: &SessionIdentity,
        change: F,
    ) -> (Session, R)
    where
        F: FnOnce(&mut Session) -> R,
    {
        let session_id = identity.session_id();
        let (session, output, active) = {
            let mut sessions = self.sessions.lock().await;
            let created = !sessions.contains_key(&session_id);
            let session = sessions
                .entry(session_id)
                .or_insert_with(|| Session::new(identity, &self.essential_tools));
            let output = change(session);
            session
                .enabled_tools
                .extend(self.essential_tools.iter().cloned());
            session.touch();
            let session = session.clone();
            (session, output, created.then(|| sessions.len()))
        };

        if let Some(active) = active {
            metrics::set_active_sessions(active);
            self.cleanup.ensure_started(Arc::downgrade(self));
        }
        (session, output)
    }

    /// Whether `tool_name` is callable for the resolved session. Without a
    /// session only essentials are.
    pub async fn is_enabled(
        self: &Arc<Self>,
        identity: Option<&SessionIdentity>,
        tool_name: &str,
    ) -> bool {
        match identity {
            Some(identity) => self
                .get_or_create(identity)
                .await
                .enabled_tools
                .contains(tool_name),
            None => self.essential_tools.contains(tool_name),
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        let (removed, active) = {
            let mut sessions = self.sessions.lock().await;
            (sessions.remove(session_id).is_some(), sessions.len())
        };
        if removed {
            info!("Removed session {}", session_id);
            metrics::set_active_sessions(active);
        }
        removed
    }

    pub async fn list_all(&self) -> HashMap<String, Session> {
        self.sessions.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Drops every session idle for longer than the timeout as of `now`.
    /// Returns the ids of the evicted sessions.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<String> = sessions
            .values()
            .filter(|session| session.is_idle(now, self.idle_timeout))
            .map(|session| session.id.clone())
            .collect();
        for session_id in &expired {
            sessions.remove(session_id);
            debug!("Evicted idle session {}", session_id);
        }
        expired
    }

    /// Stops the background cleanup task.
    pub fn shutdown(&self) {
        self.cleanup.shutdown();
    }

    #[cfg(test)]
    pub(crate) async fn backdate(&self, session_id: &str, idle_for: ChronoDuration) {
        if let Some(session) = self.sessions.lock().await.get_mut(session_id) {
            session.last_activity = Utc::now() - idle_for;
        }
    }
}
