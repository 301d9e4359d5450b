//! A server hosting live chess games
//!
//! Clients send [`protocol::UserGameCommand`]s and receive [`protocol::ServerMessage`]s. The
//! [`handler::Handler`] validates each command against the rules in the `board` crate, applies
//! it while holding the game's lock from the [`registry::GameRegistry`], and announces the
//! result to everyone registered in the [`session::SessionRegistry`] for that game.

pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod store;

pub use handler::{Handler, Peer};
pub use protocol::{CommandType, GameId, ServerMessage, UserGameCommand};
