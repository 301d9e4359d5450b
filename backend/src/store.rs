//! The collaborators holding auth tokens and game records, and in-memory versions of them

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use board::{Color, Game};
use core::fmt;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{error::StoreError, protocol::GameId};

/// Resolves auth tokens to the username they were issued to
#[async_trait]
pub trait AuthLookup: Send + Sync {
    /// `Ok(None)` means the token is unknown
    async fn username(&self, token: &str) -> Result<Option<String>, StoreError>;
}

/// Loads and saves game records
///
/// Implementations need not be safe against concurrent writers to the same game: callers go
/// through [`crate::registry::GameRegistry`], which serializes them.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn load(&self, game_id: GameId) -> Result<Option<GameRecord>, StoreError>;
    async fn save(&self, record: &GameRecord) -> Result<(), StoreError>;
}

/// A stored game along with who is seated at it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    pub white_username: Option<String>,
    pub black_username: Option<String>,
    pub game_name: String,
    pub game: Game,
}

/// How a user takes part in a game
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Player(Color),
    Observer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Player(Color::White) => "White",
            Role::Player(Color::Black) => "Black",
            Role::Observer => "Observer",
        })
    }
}

impl GameRecord {
    pub fn new(game_id: GameId, game_name: impl Into<String>) -> Self {
        Self {
            game_id,
            white_username: None,
            black_username: None,
            game_name: game_name.into(),
            game: Game::new(),
        }
    }

    /// The user seated as `color`, if any
    pub fn seat(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.white_username.as_deref(),
            Color::Black => self.black_username.as_deref(),
        }
    }

    /// A user seated on both sides is reported as white
    pub fn role_of(&self, username: &str) -> Role {
        if self.seat(Color::White) == Some(username) {
            Role::Player(Color::White)
        } else if self.seat(Color::Black) == Some(username) {
            Role::Player(Color::Black)
        } else {
            Role::Observer
        }
    }

    /// Clear every seat held by `username`, returning whether any was
    pub fn vacate(&mut self, username: &str) -> bool {
        let mut vacated = false;
        for seat in [&mut self.white_username, &mut self.black_username] {
            if seat.as_deref() == Some(username) {
                *seat = None;
                vacated = true;
            }
        }
        vacated
    }
}

/// Auth tokens held in memory for the life of the process
#[derive(Debug, Default)]
pub struct MemoryAuth {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh random token for `username`
    pub fn issue(&self, username: impl Into<String>) -> String {
        let token = format!("{:032x}", rand::thread_rng().gen::<u128>());
        self.insert(token.clone(), username);
        token
    }

    /// Register a token chosen by the caller
    pub fn insert(&self, token: impl Into<String>, username: impl Into<String>) {
        self.tokens.lock().insert(token.into(), username.into());
    }

    pub fn revoke(&self, token: &str) -> Option<String> {
        self.tokens.lock().remove(token)
    }
}

#[async_trait]
impl AuthLookup for MemoryAuth {
    async fn username(&self, token: &str) -> Result<Option<String>, StoreError> {
        Ok(self.tokens.lock().get(token).cloned())
    }
}

#[derive(Debug)]
struct GameTable {
    games: BTreeMap<GameId, GameRecord>,
    next_id: u32,
}

/// Game records held in memory for the life of the process
#[derive(Debug)]
pub struct MemoryGameStore {
    inner: Mutex<GameTable>,
}

impl Default for MemoryGameStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(GameTable {
                games: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new game with the given players seated, numbering games from 1
    pub fn create(
        &self,
        game_name: impl Into<String>,
        white_username: Option<String>,
        black_username: Option<String>,
    ) -> GameId {
        let mut inner = self.inner.lock();
        let game_id = GameId(inner.next_id);
        inner.next_id += 1;
        let record = GameRecord {
            white_username,
            black_username,
            ..GameRecord::new(game_id, game_name)
        };
        inner.games.insert(game_id, record);
        game_id
    }

    /// A snapshot of every stored game, in id order
    pub fn records(&self) -> Vec<GameRecord> {
        self.inner.lock().games.values().cloned().collect()
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn load(&self, game_id: GameId) -> Result<Option<GameRecord>, StoreError> {
        Ok(self.inner.lock().games.get(&game_id).cloned())
    }

    async fn save(&self, record: &GameRecord) -> Result<(), StoreError> {
        self.inner
            .lock()
            .games
            .insert(record.game_id, record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issued_tokens_resolve() {
        let auth = MemoryAuth::new();
        let alice = auth.issue("alice");
        let bob = auth.issue("bob");
        assert_ne!(alice, bob);
        assert_eq!(alice.len(), 32);
        assert_eq!(auth.username(&alice).await.unwrap().as_deref(), Some("alice"));
        assert_eq!(auth.username(&bob).await.unwrap().as_deref(), Some("bob"));
        assert_eq!(auth.username("nope").await.unwrap(), None);

        assert_eq!(auth.revoke(&alice).as_deref(), Some("alice"));
        assert_eq!(auth.username(&alice).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_game_store() {
        let store = MemoryGameStore::new();
        let first = store.create("first", Some("alice".into()), None);
        let second = store.create("second", None, Some("bob".into()));
        assert_eq!((first, second), (GameId(1), GameId(2)));

        let mut record = store.load(first).await.unwrap().unwrap();
        assert_eq!(record.game_name, "first");
        assert_eq!(record.game, Game::new());
        assert_eq!(store.load(GameId(3)).await.unwrap(), None);

        record.black_username = Some("carol".into());
        store.save(&record).await.unwrap();
        assert_eq!(store.load(first).await.unwrap(), Some(record));
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn test_roles_and_seats() {
        let mut record = GameRecord {
            white_username: Some("alice".into()),
            black_username: Some("bob".into()),
            ..GameRecord::new(GameId(1), "game")
        };
        assert_eq!(record.role_of("alice"), Role::Player(Color::White));
        assert_eq!(record.role_of("bob"), Role::Player(Color::Black));
        assert_eq!(record.role_of("carol"), Role::Observer);
        assert_eq!(record.seat(Color::Black), Some("bob"));

        assert!(!record.vacate("carol"));
        assert!(record.vacate("bob"));
        assert_eq!(record.seat(Color::Black), None);
        assert_eq!(record.role_of("bob"), Role::Observer);
        assert_eq!(record.seat(Color::White), Some("alice"));
    }

    #[test]
    fn test_vacate_both_seats() {
        let mut record = GameRecord {
            white_username: Some("alice".into()),
            black_username: Some("alice".into()),
            ..GameRecord::new(GameId(1), "solo")
        };
        assert_eq!(record.role_of("alice").to_string(), "White");
        assert!(record.vacate("alice"));
        assert_eq!((record.seat(Color::White), record.seat(Color::Black)), (None, None));
    }

    #[test]
    fn test_record_wire_format() {
        let record = GameRecord::new(GameId(4), "friendly");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["gameID"], 4);
        assert_eq!(value["gameName"], "friendly");
        assert!(value["whiteUsername"].is_null());
    }
}
