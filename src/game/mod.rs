//! Core game logic module for Snake
//!
//! This module contains all the game rules without any I/O or rendering
//! dependencies. Presentation layers drive it one tick at a time and read the
//! resulting `GameState`.

pub mod action;
pub mod config;
pub mod engine;
pub mod food;
pub mod state;

// Re-export commonly used types
pub use action::{Action, Direction};
pub use config::GameConfig;
pub use engine::{GameEngine, StepInfo, StepResult};
pub use state::{CollisionType, GameState, Phase, Position, Snake};
