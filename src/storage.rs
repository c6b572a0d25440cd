//! Persisted high score.
//!
//! A single integer under a fixed key. Any storage failure degrades to an
//! in-memory best of 0 and is only logged.

use tracing::{debug, warn};

use crate::error::StorageError;

pub const HIGH_SCORE_KEY: &str = "timber-chop.high-score";

pub trait ScoreStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Storage that lives only as long as the page.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: std::collections::HashMap<String, String>,
}

impl ScoreStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// `window.localStorage`. Construction fails when storage is disabled.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self, StorageError> {
        let window = web_sys::window().ok_or(StorageError::Unavailable)?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Access(format!("{e:?}")))?
            .ok_or(StorageError::Unavailable)?;
        Ok(Self { storage })
    }
}

impl ScoreStorage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Access(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Access(format!("{e:?}")))
    }
}

fn parse_score(raw: &str) -> Result<u32, StorageError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| StorageError::Corrupt(raw.to_owned()))
}

/// Best score so far, mirrored into storage when beaten.
pub struct HighScore {
    storage: Box<dyn ScoreStorage>,
    best: u32,
}

impl HighScore {
    /// Reads the stored best; unreadable or corrupt values count as 0.
    pub fn load(storage: impl ScoreStorage + 'static) -> Self {
        let stored = storage
            .get(HIGH_SCORE_KEY)
            .and_then(|raw| raw.map(|r| parse_score(&r)).transpose());
        let best = match stored {
            Ok(best) => best.unwrap_or(0),
            Err(err) => {
                warn!(%err, "high score unavailable, starting from 0");
                0
            }
        };
        debug!(best, "high score loaded");
        Self { storage: Box::new(storage), best }
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    /// Records `score`; returns true when it set a new best. The in-memory best
    /// is updated even if writing it back fails.
    pub fn record(&mut self, score: u32) -> bool {
        if score <= self.best {
            return false;
        }
        self.best = score;
        if let Err(err) = self.storage.set(HIGH_SCORE_KEY, &score.to_string()) {
            warn!(%err, score, "could not persist high score");
        }
        true
    }
}

impl std::fmt::Debug for HighScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighScore").field("best", &self.best).finish()
    }
}
