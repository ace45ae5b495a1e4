use tracing::{info, warn};

use super::store::ScoreStore;

/// Key the best score is stored under
pub const HIGH_SCORE_KEY: &str = "snakeHighScore";

/// Best score across games, read once and written on every new record
pub struct HighScore {
    value: u32,
    store: Box<dyn ScoreStore + Send>,
}

impl HighScore {
    /// Read the persisted value. Storage errors fall back to 0.
    pub fn load(store: Box<dyn ScoreStore + Send>) -> Self {
        let value = match store.load(HIGH_SCORE_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => 0,
            Err(err) => {
                warn!("Could not read high score, starting from 0: {:#}", err);
                0
            }
        };

        Self { value, store }
    }

    pub fn get(&self) -> u32 {
        self.value
    }

    /// Offer a score. Returns true if it beat the record.
    ///
    /// The in-memory value is updated even if persisting it fails.
    pub fn record(&mut self, score: u32) -> bool {
        if score <= self.value {
            return false;
        }

        self.value = score;
        info!(high_score = score, "New high score");

        if let Err(err) = self.store.save(HIGH_SCORE_KEY, score) {
            warn!("Could not save high score {}: {:#}", score, err);
        }

        true
    }
}

impl std::fmt::Debug for HighScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighScore").field("value", &self.value).finish()
    }
}
