use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use murmur_types::events::GatewayEvent;
use murmur_types::models::Message;

/// Outbound frames queued per connection before new events start being dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Which live connections receive a message notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanoutScope {
    /// Every connected client.
    #[default]
    All,
    /// Only connections belonging to the sender or the receiver.
    Participants,
}

impl FromStr for FanoutScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "participants" => Ok(Self::Participants),
            other => Err(format!("unknown fan-out scope '{}' (expected 'all' or 'participants')", other)),
        }
    }
}

struct Outbound {
    user_id: Uuid,
    tx: mpsc::Sender<Arc<str>>,
}

/// Registry of connected clients. Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// conn_id -> outbound queue
    connections: RwLock<HashMap<Uuid, Outbound>>,
    scope: FanoutScope,
    queue_capacity: usize,
    closed: AtomicBool,
}

impl Dispatcher {
    pub fn new(scope: FanoutScope) -> Self {
        Self::with_queue_capacity(scope, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(scope: FanoutScope, queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                connections: RwLock::new(HashMap::new()),
                scope,
                queue_capacity: queue_capacity.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn scope(&self) -> FanoutScope {
        self.inner.scope
    }

    /// Register a connection. Returns `None` once the dispatcher is shut down.
    pub async fn register(&self, user_id: Uuid) -> Option<(Uuid, mpsc::Receiver<Arc<str>>)> {
        let mut connections = self.inner.connections.write().await;
        // Checked under the write lock so shutdown cannot race a late registration.
        if self.inner.closed.load(Ordering::Acquire) {
            return None;
        }

        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);
        connections.insert(conn_id, Outbound { user_id, tx });
        debug!("Registered connection {} for {} ({} live)", conn_id, user_id, connections.len());
        Some((conn_id, rx))
    }

    pub async fn unregister(&self, conn_id: Uuid) {
        let mut connections = self.inner.connections.write().await;
        if connections.remove(&conn_id).is_some() {
            debug!("Unregistered connection {} ({} live)", conn_id, connections.len());
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }

    /// Push a `message` event to every connection in scope without waiting on any
    /// of them. Returns how many connections accepted it.
    pub async fn broadcast_message(&self, message: &Message) -> usize {
        let event = GatewayEvent::Message {
            message: message.clone(),
        };
        let payload: Arc<str> = match serde_json::to_string(&event) {
            Ok(json) => json.into(),
            Err(e) => {
                error!("Failed to serialize gateway event for message {}: {}", message.id, e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let connections = self.inner.connections.read().await;
            for (conn_id, outbound) in connections.iter() {
                if self.inner.scope == FanoutScope::Participants
                    && outbound.user_id != message.sender_id
                    && outbound.user_id != message.receiver_id
                {
                    continue;
                }

                match outbound.tx.try_send(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("Connection {} is backed up, dropping notification for {}", conn_id, message.id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        warn!("Connection {} is gone, removing it", conn_id);
                        dead.push(*conn_id);
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut connections = self.inner.connections.write().await;
            for conn_id in dead {
                connections.remove(&conn_id);
            }
        }

        delivered
    }

    /// Refuse new registrations and drop every queue, which ends the connection loops.
    pub async fn shutdown(&self) {
        let mut connections = self.inner.connections.write().await;
        self.inner.closed.store(true, Ordering::Release);
        let count = connections.len();
        connections.clear();
        info!("Gateway shut down, released {} connections", count);
    }
}
