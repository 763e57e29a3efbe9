//! Connection registry and broadcast hub.
//!
//! Tracks every live WebSocket connection together with its ephemeral
//! member identity and fans typed events out to all of them. Delivery is
//! best-effort: an event is serialized once, a connection that cannot be
//! written to is skipped, and failures never reach the caller.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::ServerEvent;
use crate::models::{truncate, Member, MAX_NAME_LEN};

/// Frames handed to a connection's socket task.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A serialized event frame to write to the socket.
    Event(Arc<String>),
    /// Ask the socket task to close the connection.
    Close,
}

struct Connection {
    member: Member,
    tx: UnboundedSender<Outbound>,
}

pub struct Hub {
    connections: RwLock<HashMap<Uuid, Connection>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection. Returns the minted member identity and
    /// the outbound frame receiver its socket task drains.
    pub fn connect(&self) -> (Member, UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let member = Member {
            id: Uuid::new_v4(),
            name: None,
        };
        self.connections.write().insert(
            member.id,
            Connection {
                member: member.clone(),
                tx,
            },
        );
        debug!("Connection {} registered", member.id);
        (member, rx)
    }

    /// Drop a connection and announce its departure to everyone left.
    pub fn disconnect(&self, id: Uuid) {
        let removed = self.connections.write().remove(&id);
        if let Some(conn) = removed {
            debug!("Connection {} removed", id);
            self.broadcast(
                &ServerEvent::UserLeft {
                    id,
                    username: conn.member.display_name().to_string(),
                },
                None,
            );
        }
    }

    /// Set a member's display name. Names are set-once and bounded; the
    /// join is announced to everyone but the sender.
    pub fn set_username(&self, id: Uuid, username: &str) -> Option<Member> {
        let name = truncate(username.trim(), MAX_NAME_LEN);
        if name.is_empty() {
            return None;
        }

        let member = {
            let mut connections = self.connections.write();
            let conn = connections.get_mut(&id)?;
            if conn.member.name.is_some() {
                return None;
            }
            conn.member.name = Some(name);
            conn.member.clone()
        };

        self.broadcast(
            &ServerEvent::UserJoined {
                id,
                username: member.display_name().to_string(),
            },
            Some(id),
        );
        Some(member)
    }

    pub fn member(&self, id: Uuid) -> Option<Member> {
        self.connections.read().get(&id).map(|c| c.member.clone())
    }

    /// Send one event to a single connection (connect-time sync).
    pub fn send_to(&self, id: Uuid, event: &ServerEvent) {
        let Some(frame) = encode(event) else { return };
        let connections = self.connections.read();
        if let Some(conn) = connections.get(&id) {
            let _ = conn.tx.send(Outbound::Event(frame));
        }
    }

    /// Serialize once and fan out to every connection except `exclude`.
    /// A dead connection never aborts delivery to the rest.
    pub fn broadcast(&self, event: &ServerEvent, exclude: Option<Uuid>) {
        let Some(frame) = encode(event) else { return };
        let connections = self.connections.read();
        let mut recipients = 0usize;
        for (id, conn) in connections.iter() {
            if Some(*id) == exclude {
                continue;
            }
            if conn.tx.send(Outbound::Event(Arc::clone(&frame))).is_err() {
                warn!("Dropping frame for dead connection {}", id);
                continue;
            }
            recipients += 1;
        }
        debug!("Broadcast {} to {} connections", event.name(), recipients);
    }

    /// Close every connection and clear the registry (hard evict).
    pub fn close_all(&self) {
        let drained: Vec<Connection> = {
            let mut connections = self.connections.write();
            connections.drain().map(|(_, conn)| conn).collect()
        };
        for conn in &drained {
            let _ = conn.tx.send(Outbound::Close);
        }
        info!("Evicted {} connections", drained.len());
    }

    pub fn count(&self) -> usize {
        self.connections.read().len()
    }

    pub fn members(&self) -> Vec<Member> {
        self.connections
            .read()
            .values()
            .map(|c| c.member.clone())
            .collect()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(event: &ServerEvent) -> Option<Arc<String>> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!("Failed to serialize {} event: {}", event.name(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recv_type(rx: &mut UnboundedReceiver<Outbound>) -> Option<String> {
        match rx.try_recv().ok()? {
            Outbound::Event(frame) => {
                let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
                Some(value["type"].as_str().unwrap().to_string())
            }
            Outbound::Close => Some("<close>".to_string()),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_all_but_excluded() {
        let hub = Hub::new();
        let (a, mut rx_a) = hub.connect();
        let (_b, mut rx_b) = hub.connect();
        let (_c, mut rx_c) = hub.connect();
        assert_eq!(hub.count(), 3);

        hub.broadcast(&ServerEvent::ClearAll, Some(a.id));

        assert!(recv_type(&mut rx_a).is_none());
        assert_eq!(recv_type(&mut rx_b).as_deref(), Some("clear-all"));
        assert_eq!(recv_type(&mut rx_c).as_deref(), Some("clear-all"));
    }

    #[tokio::test]
    async fn dead_connection_does_not_block_the_rest() {
        let hub = Hub::new();
        let (_a, rx_a) = hub.connect();
        let (_b, mut rx_b) = hub.connect();

        // Simulate a connection whose socket task died.
        drop(rx_a);

        hub.broadcast(&ServerEvent::ClearAll, None);
        assert_eq!(recv_type(&mut rx_b).as_deref(), Some("clear-all"));
    }

    #[tokio::test]
    async fn username_is_set_once_and_announced_to_others() {
        let hub = Hub::new();
        let (a, mut rx_a) = hub.connect();
        let (_b, mut rx_b) = hub.connect();

        let member = hub.set_username(a.id, "  alice  ").unwrap();
        assert_eq!(member.display_name(), "alice");

        // The sender is excluded from its own join announcement.
        assert!(recv_type(&mut rx_a).is_none());
        assert_eq!(recv_type(&mut rx_b).as_deref(), Some("user-joined"));

        // Second attempt is a no-op.
        assert!(hub.set_username(a.id, "mallory").is_none());
        assert_eq!(hub.member(a.id).unwrap().display_name(), "alice");
    }

    #[tokio::test]
    async fn disconnect_announces_departure() {
        let hub = Hub::new();
        let (a, _rx_a) = hub.connect();
        let (_b, mut rx_b) = hub.connect();
        hub.set_username(a.id, "alice");
        let _ = recv_type(&mut rx_b); // drain user-joined

        hub.disconnect(a.id);
        assert_eq!(hub.count(), 1);
        assert_eq!(recv_type(&mut rx_b).as_deref(), Some("user-left"));

        // Disconnecting an unknown id is silent.
        hub.disconnect(a.id);
        assert!(recv_type(&mut rx_b).is_none());
    }

    #[tokio::test]
    async fn close_all_evicts_every_connection() {
        let hub = Hub::new();
        let (_a, mut rx_a) = hub.connect();
        let (_b, mut rx_b) = hub.connect();

        hub.close_all();
        assert_eq!(hub.count(), 0);
        assert_eq!(recv_type(&mut rx_a).as_deref(), Some("<close>"));
        assert_eq!(recv_type(&mut rx_b).as_deref(), Some("<close>"));
    }
}
