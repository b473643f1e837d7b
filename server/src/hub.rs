//! Live viewer registry and broadcast fan-out.
//!
//! Each connected viewer is an entry mapping its id to the sending half of
//! its outbound message queue; the socket writer task on the other end drains
//! the queue. Delivery is best-effort: a viewer whose connection died but has
//! not been unregistered yet simply drops the message, and one dead viewer
//! never stops a broadcast from reaching the rest.

use dashmap::DashMap;
use log::{error, info};
use shared::ServerEvent;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;

pub type ViewerId = u32;

pub struct ConnectionHub {
    viewers: DashMap<ViewerId, UnboundedSender<Message>>,
    next_id: AtomicU32,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            viewers: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn register(&self, sender: UnboundedSender<Message>) -> ViewerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.viewers.insert(id, sender);
        info!("viewer {} registered", id);
        id
    }

    pub fn unregister(&self, id: ViewerId) -> bool {
        let removed = self.viewers.remove(&id).is_some();
        if removed {
            info!("viewer {} unregistered", id);
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.viewers.len()
    }

    /// Serializes once, then attempts delivery to every registered viewer.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        let text = match event.encode() {
            Ok(text) => text,
            Err(err) => {
                error!("failed to encode broadcast event: {}", err);
                return;
            }
        };

        for entry in self.viewers.iter() {
            let _ = entry.value().send(Message::Text(text.clone()));
        }
    }

    /// Unicast; returns `false` when the viewer is unknown or its queue is
    /// closed.
    pub fn send_to(&self, id: ViewerId, event: &ServerEvent) -> bool {
        let text = match event.encode() {
            Ok(text) => text,
            Err(err) => {
                error!("failed to encode event for viewer {}: {}", id, err);
                return false;
            }
        };

        match self.viewers.get(&id) {
            Some(entry) => entry.value().send(Message::Text(text)).is_ok(),
            None => false,
        }
    }

    /// Unicast binary frame; the canvas snapshot is the only payload that
    /// travels this way and it must never be broadcast.
    pub fn send_canvas(&self, id: ViewerId, bytes: Vec<u8>) -> bool {
        match self.viewers.get(&id) {
            Some(entry) => entry.value().send(Message::Binary(bytes)).is_ok(),
            None => false,
        }
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}
