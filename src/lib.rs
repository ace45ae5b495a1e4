//! Neon Snake - Snake with several apples on the board and a persisted best score
//!
//! This library provides:
//! - Core game rules (game module)
//! - High-score persistence (storage module)
//! - Terminal front end: input mapping, rendering and the interactive loop

pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod render;
pub mod storage;
