use core::{fmt, str::FromStr};
use std::net::SocketAddr;

use clap::Parser;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// A game to create at startup, written `NAME[:WHITE[:BLACK]]`
///
/// An empty name for a player leaves that seat open, so `casual::bob` seats only black.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSeed {
    pub name: String,
    pub white: Option<String>,
    pub black: Option<String>,
}

impl FromStr for GameSeed {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(ConfigError::Invalid {
                reason: format!("game {s:?} has no name"),
            });
        }
        let seat = |part: Option<&str>| part.filter(|user| !user.is_empty()).map(str::to_owned);
        let seed = Self {
            name: name.to_owned(),
            white: seat(parts.next()),
            black: seat(parts.next()),
        };
        if parts.next().is_some() {
            return Err(ConfigError::Invalid {
                reason: format!("game {s:?} has more than two players"),
            });
        }
        Ok(seed)
    }
}

impl fmt::Display for GameSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.name,
            self.white.as_deref().unwrap_or_default(),
            self.black.as_deref().unwrap_or_default()
        )
    }
}

/// Multiplayer chess server
#[derive(Clone, Debug, Parser)]
#[command(name = "chess-server")]
pub struct ServerConfig {
    /// Address to accept connections on
    #[arg(long, env = "CHESS_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Frames queued per connection before further sends to it fail
    #[arg(long, default_value_t = 64)]
    pub outbound_capacity: usize,

    /// Longest inbound frame accepted, in bytes
    #[arg(long, default_value_t = 16 * 1024)]
    pub max_frame_len: usize,

    /// Issue an auth token for this user at startup (repeatable)
    #[arg(long = "user", value_name = "NAME")]
    pub users: Vec<String>,

    /// Create a game at startup (repeatable)
    #[arg(long = "game", value_name = "NAME[:WHITE[:BLACK]]")]
    pub games: Vec<GameSeed>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            outbound_capacity: 64,
            max_frame_len: 16 * 1024,
            users: Vec::new(),
            games: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_capacity == 0 {
            return Err(ConfigError::Invalid {
                reason: "outbound_capacity must be >= 1".to_string(),
            });
        }
        if self.max_frame_len < 64 {
            return Err(ConfigError::Invalid {
                reason: format!("max_frame_len must be >= 64, got {}", self.max_frame_len),
            });
        }
        if let Some(user) = self.users.iter().find(|user| user.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                reason: format!("user name {user:?} is blank"),
            });
        }
        Ok(())
    }
}
