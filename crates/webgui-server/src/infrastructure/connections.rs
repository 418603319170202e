//! The set of open viewer connections and fan-out delivery.
//!
//! Each connection is represented by the sending half of a bounded
//! `tokio::sync::mpsc` channel; the session's writer task owns the receiving
//! half and forwards every queued string to the socket.  Delivery never
//! awaits: a full or closed queue marks the connection dead, and it is
//! removed from the set under the same lock the broadcast holds, so other
//! connections are unaffected and removal cannot race with iteration.
//!
//! Dropping a connection's sender (on removal or [`close_all`]) ends its
//! writer task, which closes the socket.
//!
//! [`close_all`]: ConnectionRegistry::close_all

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::events::to_envelope;
use crate::application::{ChangeEvent, ChangeSink};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("connection {0} is not registered")]
    Unknown(Uuid),

    #[error("connection {0} is closed")]
    Closed(Uuid),

    #[error("outbound queue of connection {0} is full")]
    Full(Uuid),
}

#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<Uuid, mpsc::Sender<String>>>,
    queue_depth: usize,
}

impl ConnectionRegistry {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Adds a connection whose queue already holds `initial`, so no
    /// broadcast can be delivered ahead of it.
    pub fn register_with_initial(&self, initial: String) -> (Uuid, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        let id = Uuid::new_v4();
        if let Err(e) = tx.try_send(initial) {
            error!("connection {id}: initial message not queued: {e}");
        }
        let total = {
            let mut connections = self.lock();
            connections.insert(id, tx);
            connections.len()
        };
        info!("connection {id} registered ({total} open)");
        (id, rx)
    }

    /// Queues `text` for one connection.  A connection that cannot accept
    /// it is removed.
    ///
    /// # Errors
    ///
    /// [`SendError`] describing why the message was not queued.
    pub fn send_to(&self, id: Uuid, text: String) -> Result<(), SendError> {
        let mut connections = self.lock();
        let tx = connections.get(&id).ok_or(SendError::Unknown(id))?;
        match tx.try_send(text) {
            Ok(()) => Ok(()),
            Err(e) => {
                connections.remove(&id);
                Err(match e {
                    TrySendError::Full(_) => SendError::Full(id),
                    TrySendError::Closed(_) => SendError::Closed(id),
                })
            }
        }
    }

    /// Queues `text` on every open connection and returns how many accepted
    /// it.  Connections that fail are removed.
    pub fn broadcast(&self, text: &str) -> usize {
        let mut connections = self.lock();
        let mut dead = Vec::new();
        for (id, tx) in connections.iter() {
            match tx.try_send(text.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("connection {id}: outbound queue full, dropping connection");
                    dead.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("connection {id}: closed during broadcast");
                    dead.push(*id);
                }
            }
        }
        for id in &dead {
            connections.remove(id);
        }
        connections.len()
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            info!("connection {id} removed");
        }
        removed
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every connection.  Their writer tasks drain what is already
    /// queued, then close the socket.
    pub fn close_all(&self) -> usize {
        let closed = {
            let mut connections = self.lock();
            let n = connections.len();
            connections.clear();
            n
        };
        info!("closed {closed} connections");
        closed
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::Sender<String>>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChangeSink for ConnectionRegistry {
    fn emit(&self, event: ChangeEvent) {
        match to_envelope(&event).to_text() {
            Ok(text) => {
                self.broadcast(&text);
            }
            Err(e) => error!("failed to serialize change event {event:?}: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
