//! Streamable HTTP session registry
//!
//! A session is created by an `initialize` request and lives until it is
//! deleted, its standalone SSE stream disconnects, it idles out or the
//! process shuts down. Session ids are random v4 UUIDs and are never reused.
//!
//! Each session carries a routing lock: requests hold a shared guard while
//! they run, and closing a session takes the exclusive guard, so teardown
//! waits for in-flight requests. A request that looks a session up after
//! its removal gets `SessionNotFound`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::{OwnedRwLockReadGuard, RwLock as RouteLock};
use uuid::Uuid;

use crate::error::SessionError;
use crate::models::jsonrpc::JsonRpcNotification;

const STREAM_BUFFER: usize = 64;

/// Delivers server-to-client notifications for one session
pub type Notifier = Arc<dyn Fn(JsonRpcNotification) + Send + Sync>;

struct StandaloneStream {
    id: u64,
    tx: mpsc::Sender<Value>,
}

pub struct McpSession {
    id: String,
    last_seen: Mutex<Instant>,
    api_key: RwLock<Option<String>>,
    client_initialized: AtomicBool,
    stream: Mutex<Option<StandaloneStream>>,
    next_stream_id: AtomicU64,
    routing: Arc<RouteLock<()>>,
    closed: AtomicBool,
}

/// Held while a request is being routed through a session
pub struct RouteGuard {
    session: Arc<McpSession>,
    _guard: OwnedRwLockReadGuard<()>,
}

impl RouteGuard {
    pub fn session(&self) -> &Arc<McpSession> {
        &self.session
    }
}

impl McpSession {
    fn new(id: String) -> Self {
        Self {
            id,
            last_seen: Mutex::new(Instant::now()),
            api_key: RwLock::new(None),
            client_initialized: AtomicBool::new(false),
            stream: Mutex::new(None),
            next_stream_id: AtomicU64::new(1),
            routing: Arc::new(RouteLock::new(())),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Bind the client-supplied upstream credential; last write wins
    pub fn bind_api_key(&self, api_key: String) {
        *self.api_key.write() = Some(api_key);
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key.read().clone()
    }

    pub fn mark_client_initialized(&self) {
        self.client_initialized.store(true, Ordering::Release);
    }

    pub fn is_client_initialized(&self) -> bool {
        self.client_initialized.load(Ordering::Acquire)
    }

    /// Enter the session for the duration of one request
    pub async fn begin_route(self: &Arc<Self>) -> Result<RouteGuard, SessionError> {
        let guard = self.routing.clone().read_owned().await;
        if self.is_closed() {
            return Err(SessionError::SessionNotFound(self.id.clone()));
        }
        self.touch();
        Ok(RouteGuard {
            session: self.clone(),
            _guard: guard,
        })
    }

    pub fn has_stream(&self) -> bool {
        self.stream
            .lock()
            .as_ref()
            .is_some_and(|s| !s.tx.is_closed())
    }

    /// Open the standalone server-to-client stream. Only one may be open.
    pub fn open_stream(&self) -> Result<(u64, mpsc::Receiver<Value>), SessionError> {
        if self.is_closed() {
            return Err(SessionError::SessionNotFound(self.id.clone()));
        }

        let mut stream = self.stream.lock();
        // close() may have taken the slot between the check above and the lock
        if self.is_closed() {
            return Err(SessionError::SessionNotFound(self.id.clone()));
        }
        if stream.as_ref().is_some_and(|s| !s.tx.is_closed()) {
            return Err(SessionError::StreamConflict);
        }

        let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        *stream = Some(StandaloneStream { id, tx });
        self.touch();
        Ok((id, rx))
    }

    fn is_current_stream(&self, stream_id: u64) -> bool {
        self.stream
            .lock()
            .as_ref()
            .is_some_and(|s| s.id == stream_id)
    }

    /// Push a notification onto the standalone stream, dropped when no
    /// stream is open or the client is not keeping up
    pub fn notify(&self, notification: JsonRpcNotification) -> bool {
        let stream = self.stream.lock();
        let Some(stream) = stream.as_ref() else {
            return false;
        };

        match serde_json::to_value(&notification) {
            Ok(value) => match stream.tx.try_send(value) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(session_id = %self.id, error = %e, "Dropped notification");
                    false
                }
            },
            Err(_) => false,
        }
    }

    /// Notification sink that does not keep the session alive
    pub fn notifier(self: &Arc<Self>) -> Notifier {
        let session: Weak<McpSession> = Arc::downgrade(self);
        Arc::new(move |notification| {
            if let Some(session) = session.upgrade() {
                session.notify(notification);
            }
        })
    }

    /// Wait for in-flight requests, then release the stream
    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let _exclusive = self.routing.write().await;
        self.stream.lock().take();
    }
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<McpSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under a fresh id
    pub fn create_session(&self) -> Arc<McpSession> {
        let mut sessions = self.sessions.write();
        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = Arc::new(McpSession::new(id.clone()));
        sessions.insert(id.clone(), session.clone());
        tracing::info!(session_id = %id, active_sessions = sessions.len(), "Session created");
        session
    }

    pub fn lookup(&self, session_id: &str) -> Result<Arc<McpSession>, SessionError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and close a session. A second call for the same id reports
    /// `SessionNotFound`.
    pub async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .remove(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;

        session.close().await;
        tracing::info!(session_id = %session_id, "Session destroyed");
        Ok(())
    }

    /// Remove `session` only if it is still the registered instance
    fn remove_instance(&self, session: &Arc<McpSession>) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get(session.id()) {
            Some(current) if Arc::ptr_eq(current, session) => {
                sessions.remove(session.id());
                true
            }
            _ => false,
        }
    }

    /// Close sessions idle for longer than `idle_timeout`. Sessions with an
    /// open standalone stream are considered live.
    pub async fn expire_idle(&self, idle_timeout: Duration) -> Vec<String> {
        let expired: Vec<Arc<McpSession>> = {
            let mut sessions = self.sessions.write();
            let ids: Vec<String> = sessions
                .values()
                .filter(|s| !s.has_stream() && s.idle_for() > idle_timeout)
                .map(|s| s.id().to_string())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        let mut ids = Vec::with_capacity(expired.len());
        for session in expired {
            session.close().await;
            tracing::info!(session_id = %session.id(), "Session expired after idle timeout");
            ids.push(session.id().to_string());
        }
        ids
    }

    /// Close every session, used on shutdown
    pub async fn close_all(&self) {
        let sessions: Vec<Arc<McpSession>> = self.sessions.write().drain().map(|(_, s)| s).collect();
        let count = sessions.len();
        for session in sessions {
            session.close().await;
        }
        tracing::info!(closed = count, "All sessions closed");
    }

    /// Guard tying a standalone stream to its session: dropping it (peer
    /// disconnect) destroys the session unless a newer stream replaced it
    pub fn stream_guard(&self, session: Arc<McpSession>, stream_id: u64) -> StreamGuard {
        StreamGuard {
            registry: self.clone(),
            session,
            stream_id,
        }
    }
}

pub struct StreamGuard {
    registry: SessionRegistry,
    session: Arc<McpSession>,
    stream_id: u64,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.session.is_closed() || !self.session.is_current_stream(self.stream_id) {
            return;
        }

        if !self.registry.remove_instance(&self.session) {
            return;
        }

        tracing::info!(session_id = %self.session.id(), "Stream disconnected, destroying session");
        let session = self.session.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { session.close().await });
            }
            Err(_) => {
                session.closed.store(true, Ordering::Release);
                session.stream.lock().take();
            }
        }
    }
}
