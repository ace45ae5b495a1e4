//! High-score persistence
//!
//! The game only ever needs to store one named integer. `ScoreStore` is the
//! key-value seam, with a JSON file backend for real play and an in-memory
//! backend for tests and throwaway sessions. `HighScore` sits on top and
//! swallows storage failures so they never interrupt a game.

pub mod high_score;
pub mod store;

pub use high_score::{HighScore, HIGH_SCORE_KEY};
pub use store::{JsonFileStore, MemoryStore, ScoreStore};
