//! Per-game lock table.
//!
//! Each game id maps to its own async mutex, created on first use. Operations
//! that mutate a game hold its lock from read to commit, so two callers can
//! never both act on the same pre-move state. An entry lives only while some
//! caller holds or waits on it: the last guard to drop removes it, so lookups
//! on unknown or finished games leave nothing behind.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::GameId;

#[derive(Debug, Default)]
pub struct GameLocks {
    locks: Mutex<HashMap<GameId, Arc<AsyncMutex<()>>>>,
}

/// Exclusive access to one game. Dropping it releases the lock.
pub struct GameLockGuard<'a> {
    table: &'a GameLocks,
    game_id: GameId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for GameLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.table.release(&self.game_id);
    }
}

impl GameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `game_id`.
    pub async fn acquire(&self, game_id: GameId) -> GameLockGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(game_id).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        GameLockGuard {
            table: self,
            game_id,
            guard: Some(guard),
        }
    }

    /// Drop the entry for `game_id` once nobody holds or waits on it.
    fn release(&self, game_id: &GameId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(game_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(game_id);
            tracing::debug!("Lock for game '{}' released", game_id);
        }
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
