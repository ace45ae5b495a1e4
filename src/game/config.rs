use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::action::Direction;
use super::state::Position;

/// Configuration for the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Side length of the square grid, in cells
    pub grid_size: usize,
    /// Number of apples kept on the board at all times
    pub apple_count: usize,
    /// Milliseconds between two ticks of the game clock
    pub tick_interval_ms: u64,
    /// Points awarded per apple
    pub points_per_apple: u32,
    /// Starting body, head first
    pub initial_snake: Vec<Position>,
    /// Starting heading
    pub initial_direction: Direction,
    /// Whether moving into the cell the tail is about to leave ends the game.
    ///
    /// The body is checked before the tail moves, so with this set the tail
    /// cell counts as occupied even though it would be vacated this tick.
    pub tail_chase_is_fatal: bool,
    /// Fixed RNG seed for reproducible apple placement
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 25,
            apple_count: 3,
            tick_interval_ms: 120,
            points_per_apple: 10,
            initial_snake: vec![
                Position::new(12, 12),
                Position::new(12, 13),
                Position::new(12, 14),
            ],
            initial_direction: Direction::Up,
            tail_chase_is_fatal: true,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Create a configuration for a square grid, with the default snake
    /// re-centred so it fits
    pub fn new(grid_size: usize) -> Self {
        let center = (grid_size / 2) as i32;
        Self {
            grid_size,
            initial_snake: vec![
                Position::new(center, center),
                Position::new(center, center.saturating_add(1)),
                Position::new(center, center.saturating_add(2)),
            ],
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10)
    }

    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: GameConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that a game can actually be started with this configuration
    pub fn validate(&self) -> Result<()> {
        ensure!(self.grid_size >= 2, "grid_size must be at least 2");
        ensure!(self.apple_count >= 1, "apple_count must be at least 1");
        ensure!(self.tick_interval_ms > 0, "tick_interval_ms must be positive");
        ensure!(
            self.grid_size <= i32::MAX as usize,
            "grid_size {} does not fit grid coordinates",
            self.grid_size
        );
        let cell_count = self
            .grid_size
            .checked_mul(self.grid_size)
            .with_context(|| format!("grid_size {} is too large", self.grid_size))?;
        ensure!(
            !self.initial_snake.is_empty(),
            "initial_snake must have at least one segment"
        );
        ensure!(
            self.initial_snake.len().saturating_add(self.apple_count) <= cell_count,
            "{} snake segments and {} apples do not fit on a {}x{} grid",
            self.initial_snake.len(),
            self.apple_count,
            self.grid_size,
            self.grid_size
        );

        let size = self.grid_size as i32;
        for (i, pos) in self.initial_snake.iter().enumerate() {
            if !pos.is_within(size) {
                bail!("initial_snake segment {} at {:?} is off the grid", i, pos);
            }
            if self.initial_snake[..i].contains(pos) {
                bail!("initial_snake segment {} at {:?} overlaps the body", i, pos);
            }
        }

        for pair in self.initial_snake.windows(2) {
            ensure!(
                pair[0].manhattan_distance(pair[1]) == 1,
                "initial_snake segments {:?} and {:?} are not adjacent",
                pair[0],
                pair[1]
            );
        }

        if let [head, neck, ..] = self.initial_snake.as_slice() {
            ensure!(
                head.moved_in_direction(self.initial_direction) != *neck,
                "initial_direction {:?} points back into the body",
                self.initial_direction
            );
        }

        Ok(())
    }
}
