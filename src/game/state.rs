use serde::{Deserialize, Serialize};

use super::action::Direction;

/// A cell on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Move position in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }

    /// True if the cell lies in `[0, size) x [0, size)`
    pub fn is_within(&self, size: i32) -> bool {
        self.x >= 0 && self.x < size && self.y >= 0 && self.y < size
    }

    pub fn manhattan_distance(&self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// The snake in the game
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    /// Body segments, with head at index 0
    pub body: Vec<Position>,
    /// Heading committed on the last tick
    pub direction: Direction,
}

impl Snake {
    /// Create a snake from an explicit body, head first
    pub fn new(body: Vec<Position>, direction: Direction) -> Self {
        debug_assert!(!body.is_empty(), "snake needs at least one segment");
        Self { body, direction }
    }

    /// Create a straight snake trailing behind `head`
    pub fn straight(head: Position, direction: Direction, length: usize) -> Self {
        let (dx, dy) = direction.delta();
        let body = (0..length.max(1) as i32)
            .map(|i| head.moved_by(-dx * i, -dy * i))
            .collect();

        Self { body, direction }
    }

    /// Get the head position
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Get the tail position (last segment)
    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Check whether `pos` hits the current body.
    ///
    /// With `include_tail` unset the last segment is ignored, since it is
    /// vacated by a move that does not grow the snake.
    pub fn collides_with_body(&self, pos: Position, include_tail: bool) -> bool {
        let end = if include_tail || self.body.len() == 1 {
            self.body.len()
        } else {
            self.body.len() - 1
        };
        self.body[..end].contains(&pos)
    }

    /// Prepend `new_head`, dropping the tail unless the snake grows
    pub fn advance(&mut self, new_head: Position, grow: bool) {
        self.body.insert(0, new_head);

        if !grow {
            self.body.pop();
        }
    }

    /// Get the length of the snake
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if the snake is empty (should never happen in practice)
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Lifecycle phase of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Paused,
    GameOver,
}

/// Type of collision that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    /// Snake hit a wall
    Wall,
    /// Snake hit itself
    SelfCollision,
}

/// Complete game state, as read by presentation layers after each tick
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub snake: Snake,
    /// Apple cells. An eaten apple is replaced in the same slot.
    pub food: Vec<Position>,
    pub grid_size: usize,
    pub score: u32,
    pub steps: u32,
    pub phase: Phase,
    /// Heading to commit on the next tick
    pub pending_direction: Direction,
    /// What ended the game, if it is over
    pub collision: Option<CollisionType>,
}

impl GameState {
    /// Create a new game state in the given phase
    pub fn new(snake: Snake, food: Vec<Position>, grid_size: usize, phase: Phase) -> Self {
        let pending_direction = snake.direction;
        Self {
            snake,
            food,
            grid_size,
            score: 0,
            steps: 0,
            phase,
            pending_direction,
            collision: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Check if a position is within the grid bounds
    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.is_within(self.grid_size as i32)
    }

    /// Slot of the apple at `pos`, if any
    pub fn food_index(&self, pos: Position) -> Option<usize> {
        self.food.iter().position(|&apple| apple == pos)
    }
}
