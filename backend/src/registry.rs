//! Serialized access to stored games

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::StoreError,
    protocol::GameId,
    store::{GameRecord, GameStore},
};

/// Hands out one lock per game, and only lets the store be reached while holding it
///
/// Commands on different games never wait on each other. A game's lock only stays in the
/// registry while some guard holds it or some caller is waiting for it.
pub struct GameRegistry {
    store: Arc<dyn GameStore>,
    locks: DashMap<GameId, Arc<Mutex<()>>>,
}

/// Exclusive access to one game until dropped
pub struct GameGuard<'a> {
    registry: &'a GameRegistry,
    game_id: GameId,
    lock: Option<OwnedMutexGuard<()>>,
}

impl GameRegistry {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `game_id`
    ///
    /// The game need not exist; loading it through the guard reports that.
    pub async fn lock(&self, game_id: GameId) -> GameGuard<'_> {
        // Clone the Arc out so no map shard stays locked while waiting
        let lock = self.locks.entry(game_id).or_default().clone();
        GameGuard {
            registry: self,
            game_id,
            lock: Some(lock.lock_owned().await),
        }
    }

    /// How many games currently have a lock held or waited on
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}

impl GameGuard<'_> {
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub async fn load(&self) -> Result<Option<GameRecord>, StoreError> {
        self.registry.store.load(self.game_id).await
    }

    pub async fn save(&self, record: &GameRecord) -> Result<(), StoreError> {
        debug_assert_eq!(record.game_id, self.game_id, "saving another game's record");
        self.registry.store.save(record).await
    }
}

impl Drop for GameGuard<'_> {
    fn drop(&mut self) {
        // Release first; the entry goes only once nobody else holds or waits on the lock
        drop(self.lock.take());
        self.registry
            .locks
            .remove_if(&self.game_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
