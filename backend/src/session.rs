//! Who is connected to which game, and fan-out of messages to them

use core::fmt;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{
    error::TransportError,
    protocol::{GameId, ServerMessage},
};

/// Somewhere frames can be sent without blocking
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(&self, frame: &str) -> Result<(), TransportError>;
    fn is_open(&self) -> bool;
}

/// Distinguishes one physical connection from another
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeerId(u64);

impl PeerId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered user and where their messages go
#[derive(Clone, Debug)]
pub struct Connection {
    pub identity: String,
    pub game_id: GameId,
    pub peer: PeerId,
    pub transport: Arc<dyn Transport>,
}

impl Connection {
    fn deliver(&self, frame: &str) -> bool {
        if !self.transport.is_open() {
            debug!(user = %self.identity, peer = %self.peer, "skipping closed connection");
            return false;
        }
        match self.transport.send(frame) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    user = %self.identity,
                    game_id = %self.game_id,
                    peer = %self.peer,
                    error = %err,
                    "dropping message for unreachable connection",
                );
                false
            }
        }
    }
}

/// At most one connection per identity; connecting again replaces the earlier one
#[derive(Debug, Default)]
pub struct SessionRegistry {
    connections: DashMap<String, Connection>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, connection: Connection) {
        let identity = connection.identity.clone();
        if let Some(previous) = self.connections.insert(identity, connection) {
            debug!(
                user = %previous.identity,
                game_id = %previous.game_id,
                peer = %previous.peer,
                "replaced earlier connection",
            );
        }
    }

    pub fn disconnect(&self, identity: &str) -> Option<Connection> {
        self.connections.remove(identity).map(|(_, connection)| connection)
    }

    /// Deregister `identity` only if it is still registered from `peer`
    ///
    /// A connection that has since been replaced from elsewhere is left alone.
    pub fn disconnect_peer(&self, identity: &str, peer: PeerId) -> Option<Connection> {
        self.connections
            .remove_if(identity, |_, connection| connection.peer == peer)
            .map(|(_, connection)| connection)
    }

    pub fn connection(&self, identity: &str) -> Option<Connection> {
        self.connections.get(identity).map(|entry| entry.value().clone())
    }

    /// A snapshot, so that nothing stays locked while sending
    pub fn connections_in_game(&self, game_id: GameId) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|entry| entry.game_id == game_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send to everyone in the game, returning how many it reached
    pub fn broadcast(&self, game_id: GameId, message: &ServerMessage) -> usize {
        self.fan_out(game_id, None, message)
    }

    /// Send to everyone in the game except `excluded`
    pub fn broadcast_except(
        &self,
        game_id: GameId,
        excluded: &str,
        message: &ServerMessage,
    ) -> usize {
        self.fan_out(game_id, Some(excluded), message)
    }

    pub fn send_to(&self, identity: &str, message: &ServerMessage) -> bool {
        let Some(connection) = self.connection(identity) else {
            return false;
        };
        match message.encode() {
            Ok(frame) => connection.deliver(&frame),
            Err(err) => {
                warn!(error = %err, "could not encode message");
                false
            }
        }
    }

    fn fan_out(&self, game_id: GameId, excluded: Option<&str>, message: &ServerMessage) -> usize {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%game_id, error = %err, "could not encode message");
                return 0;
            }
        };
        self.connections_in_game(game_id)
            .iter()
            .filter(|connection| Some(connection.identity.as_str()) != excluded)
            .filter(|connection| connection.deliver(&frame))
            .count()
    }
}
