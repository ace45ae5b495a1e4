use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use super::{
    action::{Action, Direction},
    config::GameConfig,
    food::sample_free_cell,
    state::{CollisionType, GameState, Phase, Position, Snake},
};
use crate::storage::{HighScore, MemoryStore, ScoreStore};

/// Information about a step
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Whether the snake ate an apple this step
    pub ate_food: bool,
    /// Type of collision if one occurred
    pub collision_type: Option<CollisionType>,
    /// Whether this step set a new high score
    pub new_high_score: bool,
}

/// Result of a game step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// False when the game was paused or already over and nothing moved
    pub advanced: bool,
    /// Whether the game has terminated
    pub terminated: bool,
    /// Additional information about the step
    pub info: StepInfo,
}

impl StepResult {
    fn idle(state: &GameState) -> Self {
        Self {
            advanced: false,
            terminated: state.is_game_over(),
            info: StepInfo {
                ate_food: false,
                collision_type: None,
                new_high_score: false,
            },
        }
    }
}

/// The game engine that handles all game logic.
///
/// Owns everything that outlives a single game: the configuration, the
/// random source for apple placement and the high score.
pub struct GameEngine {
    config: GameConfig,
    rng: StdRng,
    high_score: HighScore,
}

impl GameEngine {
    /// Create an engine, reading the high score from `store` once
    pub fn new(config: GameConfig, store: Box<dyn ScoreStore + Send>) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            rng,
            high_score: HighScore::load(store),
        })
    }

    /// Create an engine whose high score is forgotten on exit
    pub fn in_memory(config: GameConfig) -> Result<Self> {
        Self::new(config, Box::new(MemoryStore::new()))
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn high_score(&self) -> u32 {
        self.high_score.get()
    }

    /// State shown when the program starts: idle until resumed
    pub fn new_game(&mut self) -> GameState {
        self.fresh_state(Phase::Paused)
    }

    /// Start over with the initial snake and a new set of apples
    pub fn reset(&mut self) -> GameState {
        info!(high_score = self.high_score(), "Starting new game");
        self.fresh_state(Phase::Running)
    }

    fn fresh_state(&mut self, phase: Phase) -> GameState {
        let snake = Snake::new(
            self.config.initial_snake.clone(),
            self.config.initial_direction,
        );

        let mut food = Vec::with_capacity(self.config.apple_count);
        for _ in 0..self.config.apple_count {
            if let Some(apple) = self.generate_food(&snake, &food) {
                food.push(apple);
            }
        }

        GameState::new(snake, food, self.config.grid_size, phase)
    }

    /// Queue a heading for the next tick.
    ///
    /// A reversal of the heading committed on the last tick is ignored and
    /// leaves the queue untouched. Returns whether the request was accepted.
    pub fn set_heading(&self, state: &mut GameState, requested: Direction) -> bool {
        if state.snake.direction.is_opposite(requested) {
            return false;
        }

        state.pending_direction = requested;
        true
    }

    /// Running <-> Paused. A finished game stays finished.
    pub fn toggle_pause(&self, state: &mut GameState) {
        state.phase = match state.phase {
            Phase::Running => Phase::Paused,
            Phase::Paused => Phase::Running,
            Phase::GameOver => Phase::GameOver,
        };
    }

    pub fn resume(&self, state: &mut GameState) {
        if state.is_paused() {
            state.phase = Phase::Running;
        }
    }

    /// Execute one tick of the game.
    ///
    /// A collision leaves the body, apples and score as they were, but the
    /// queued heading is still committed and `steps` still counts the tick.
    pub fn step(&mut self, state: &mut GameState, action: Action) -> StepResult {
        if !state.is_running() {
            return StepResult::idle(state);
        }

        if let Action::Move(direction) = action {
            self.set_heading(state, direction);
        }

        state.snake.direction = state.pending_direction;
        let new_head = state.snake.head().moved_in_direction(state.snake.direction);
        let eaten = state.food_index(new_head);

        if let Some(collision_type) = self.check_collision(state, new_head, eaten.is_some()) {
            state.phase = Phase::GameOver;
            state.collision = Some(collision_type);
            state.steps += 1;

            info!(
                score = state.score,
                steps = state.steps,
                ?collision_type,
                "Game over"
            );

            return StepResult {
                advanced: true,
                terminated: true,
                info: StepInfo {
                    ate_food: false,
                    collision_type: Some(collision_type),
                    new_high_score: false,
                },
            };
        }

        state.snake.advance(new_head, eaten.is_some());

        let mut new_high_score = false;
        if let Some(slot) = eaten {
            state.score += self.config.points_per_apple;
            new_high_score = self.high_score.record(state.score);
            debug!(x = new_head.x, y = new_head.y, score = state.score, "Apple eaten");

            let others: Vec<Position> = state
                .food
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != slot)
                .map(|(_, &apple)| apple)
                .collect();

            match self.generate_food(&state.snake, &others) {
                Some(apple) => state.food[slot] = apple,
                None => {
                    debug!("No free cell left for a replacement apple");
                    state.food.remove(slot);
                }
            }
        }

        state.steps += 1;

        StepResult {
            advanced: true,
            terminated: false,
            info: StepInfo {
                ate_food: eaten.is_some(),
                collision_type: None,
                new_high_score,
            },
        }
    }

    /// Check if the new head position causes a collision, against the body
    /// as it was before this move
    fn check_collision(
        &self,
        state: &GameState,
        pos: Position,
        grows: bool,
    ) -> Option<CollisionType> {
        if !state.is_in_bounds(pos) {
            return Some(CollisionType::Wall);
        }

        let include_tail = self.config.tail_chase_is_fatal || grows;
        if state.snake.collides_with_body(pos, include_tail) {
            return Some(CollisionType::SelfCollision);
        }

        None
    }

    /// Choose a cell free of the snake and of every apple in `existing`
    pub fn generate_food(&mut self, snake: &Snake, existing: &[Position]) -> Option<Position> {
        sample_free_cell(&mut self.rng, self.config.grid_size, &snake.body, existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::HIGH_SCORE_KEY;
    use tempfile::TempDir;

    fn seeded(config: GameConfig) -> GameEngine {
        GameEngine::in_memory(GameConfig {
            seed: Some(42),
            ..config
        })
        .unwrap()
    }

    /// Snake at (5,5),(5,6),(5,7) heading Up on a 10x10 grid
    fn column_state(food: Vec<Position>) -> GameState {
        GameState::new(
            Snake::new(
                vec![Position::new(5, 5), Position::new(5, 6), Position::new(5, 7)],
                Direction::Up,
            ),
            food,
            10,
            Phase::Running,
        )
    }

    fn assert_food_disjoint(state: &GameState) {
        for (i, apple) in state.food.iter().enumerate() {
            assert!(state.is_in_bounds(*apple));
            assert!(!state.snake.contains(*apple), "apple {:?} on snake", apple);
            assert!(
                !state.food[i + 1..].contains(apple),
                "apple {:?} duplicated",
                apple
            );
        }
    }

    #[test]
    fn test_new_game_starts_paused() {
        let mut engine = seeded(GameConfig::default());
        let state = engine.new_game();

        assert!(state.is_paused());
        assert_eq!(state.score, 0);
        assert_eq!(state.steps, 0);
        assert_eq!(state.snake.len(), 3);
        assert_eq!(state.food.len(), 3);
        assert_food_disjoint(&state);
    }

    #[test]
    fn test_reset() {
        let mut engine = seeded(GameConfig::default());
        let mut state = engine.reset();
        state.score = 50;
        state.phase = Phase::GameOver;

        let state = engine.reset();

        assert!(state.is_running());
        assert_eq!(state.score, 0);
        assert_eq!(state.collision, None);
        assert_eq!(state.snake.body, GameConfig::default().initial_snake);
        assert_eq!(state.snake.direction, Direction::Up);
        assert_eq!(state.food.len(), 3);
        assert_food_disjoint(&state);
    }

    #[test]
    fn test_basic_movement() {
        let mut engine = seeded(GameConfig::small());
        let mut state = column_state(vec![Position::new(0, 0)]);

        let result = engine.step(&mut state, Action::Continue);

        assert!(result.advanced);
        assert!(!result.terminated);
        assert!(!result.info.ate_food);
        assert_eq!(
            state.snake.body,
            vec![Position::new(5, 4), Position::new(5, 5), Position::new(5, 6)]
        );
        assert_eq!(state.score, 0);
        assert_eq!(state.steps, 1);
    }

    #[test]
    fn test_food_consumption() {
        let mut engine = seeded(GameConfig::small());
        let mut state = column_state(vec![Position::new(5, 4), Position::new(0, 0)]);

        let result = engine.step(&mut state, Action::Continue);

        assert!(result.info.ate_food);
        assert!(result.info.new_high_score);
        assert_eq!(
            state.snake.body,
            vec![
                Position::new(5, 4),
                Position::new(5, 5),
                Position::new(5, 6),
                Position::new(5, 7)
            ]
        );
        assert_eq!(state.score, 10);
        assert_eq!(engine.high_score(), 10);
        assert_eq!(state.food.len(), 2);
        assert_eq!(state.food[1], Position::new(0, 0));
        assert_ne!(state.food[0], Position::new(5, 4));
        assert_food_disjoint(&state);
    }

    #[test]
    fn test_wall_collision_leaves_state_untouched() {
        let mut engine = seeded(GameConfig::small());
        let mut state = GameState::new(
            Snake::new(vec![Position::new(0, 0), Position::new(0, 1)], Direction::Up),
            vec![Position::new(5, 5)],
            10,
            Phase::Running,
        );
        let before = state.clone();

        let result = engine.step(&mut state, Action::Continue);

        assert!(result.terminated);
        assert!(state.is_game_over());
        assert_eq!(result.info.collision_type, Some(CollisionType::Wall));
        assert_eq!(state.snake.body, before.snake.body);
        assert_eq!(state.food, before.food);
        assert_eq!(state.score, before.score);
    }

    #[test]
    fn test_fatal_tick_commits_heading_and_counts_step() {
        let mut engine = seeded(GameConfig::small());
        let mut state = GameState::new(
            Snake::new(vec![Position::new(0, 5), Position::new(0, 6)], Direction::Up),
            vec![Position::new(5, 5)],
            10,
            Phase::Running,
        );

        let result = engine.step(&mut state, Action::Move(Direction::Left));

        assert_eq!(result.info.collision_type, Some(CollisionType::Wall));
        assert_eq!(state.snake.direction, Direction::Left);
        assert_eq!(state.steps, 1);
        assert_eq!(
            state.snake.body,
            vec![Position::new(0, 5), Position::new(0, 6)]
        );
    }

    #[test]
    fn test_self_collision() {
        let mut engine = seeded(GameConfig::small());

        // Body: (5,5), (4,5), (3,5), (2,5), (1,5)
        let snake = Snake::straight(Position::new(5, 5), Direction::Right, 5);
        let mut state = GameState::new(snake, vec![Position::new(8, 8)], 10, Phase::Running);

        engine.step(&mut state, Action::Move(Direction::Down));
        engine.step(&mut state, Action::Move(Direction::Left));
        // Head at (4,6); moving up lands on (4,5), still part of the body
        let result = engine.step(&mut state, Action::Move(Direction::Up));

        assert!(result.terminated);
        assert_eq!(
            result.info.collision_type,
            Some(CollisionType::SelfCollision)
        );
        assert_eq!(state.collision, Some(CollisionType::SelfCollision));
    }

    /// 2x2 loop: head (0,0), then (0,1), (1,1), tail (1,0). Moving right
    /// enters the tail cell.
    fn tail_chase_state() -> GameState {
        GameState::new(
            Snake::new(
                vec![
                    Position::new(0, 0),
                    Position::new(0, 1),
                    Position::new(1, 1),
                    Position::new(1, 0),
                ],
                Direction::Up,
            ),
            vec![Position::new(5, 5)],
            10,
            Phase::Running,
        )
    }

    #[test]
    fn test_tail_chase_is_fatal_by_default() {
        let mut engine = seeded(GameConfig::small());
        let mut state = tail_chase_state();

        let result = engine.step(&mut state, Action::Move(Direction::Right));

        assert_eq!(
            result.info.collision_type,
            Some(CollisionType::SelfCollision)
        );
    }

    #[test]
    fn test_tail_chase_allowed_when_configured() {
        let mut engine = seeded(GameConfig {
            tail_chase_is_fatal: false,
            ..GameConfig::small()
        });
        let mut state = tail_chase_state();

        let result = engine.step(&mut state, Action::Move(Direction::Right));

        assert!(!result.terminated);
        assert_eq!(state.snake.head(), Position::new(1, 0));
        assert_eq!(state.snake.len(), 4);
    }

    #[test]
    fn test_prevent_180_degree_turn() {
        let mut engine = seeded(GameConfig::small());
        let mut state = column_state(vec![Position::new(0, 0)]);

        let result = engine.step(&mut state, Action::Move(Direction::Down));

        assert!(!result.terminated);
        assert_eq!(state.snake.direction, Direction::Up);
        assert_eq!(state.snake.head(), Position::new(5, 4));
    }

    #[test]
    fn test_reversal_checked_against_committed_heading() {
        let mut engine = seeded(GameConfig::small());
        let mut state = column_state(vec![Position::new(0, 0)]);

        // Left is accepted, but Down is still the reverse of the committed Up
        assert!(engine.set_heading(&mut state, Direction::Left));
        assert!(!engine.set_heading(&mut state, Direction::Down));
        assert_eq!(state.pending_direction, Direction::Left);

        engine.step(&mut state, Action::Continue);
        assert_eq!(state.snake.head(), Position::new(4, 5));
    }

    #[test]
    fn test_latest_accepted_heading_wins() {
        let mut engine = seeded(GameConfig::small());
        let mut state = column_state(vec![Position::new(0, 0)]);

        engine.set_heading(&mut state, Direction::Left);
        engine.set_heading(&mut state, Direction::Right);
        engine.step(&mut state, Action::Continue);

        assert_eq!(state.snake.head(), Position::new(6, 5));
    }

    #[test]
    fn test_paused_game_does_not_advance() {
        let mut engine = seeded(GameConfig::small());
        let mut state = engine.new_game();
        let before = state.clone();

        let result = engine.step(&mut state, Action::Move(Direction::Left));

        assert!(!result.advanced);
        assert!(!result.terminated);
        assert_eq!(state, before);
    }

    #[test]
    fn test_terminated_game_no_update() {
        let mut engine = seeded(GameConfig::small());
        let mut state = engine.reset();
        state.phase = Phase::GameOver;
        let before = state.clone();

        let result = engine.step(&mut state, Action::Continue);

        assert!(!result.advanced);
        assert!(result.terminated);
        assert_eq!(state, before);
    }

    #[test]
    fn test_pause_transitions() {
        let mut engine = seeded(GameConfig::small());
        let mut state = engine.new_game();

        engine.toggle_pause(&mut state);
        assert!(state.is_running());
        engine.toggle_pause(&mut state);
        assert!(state.is_paused());
        engine.resume(&mut state);
        assert!(state.is_running());

        state.phase = Phase::GameOver;
        engine.toggle_pause(&mut state);
        engine.resume(&mut state);
        assert!(state.is_game_over());
    }

    #[test]
    fn test_generate_food_avoids_snake_and_food() {
        let mut engine = seeded(GameConfig::small());
        let snake = Snake::straight(Position::new(5, 5), Direction::Up, 3);
        let existing = vec![Position::new(1, 1), Position::new(2, 2)];

        for _ in 0..500 {
            let apple = engine.generate_food(&snake, &existing).unwrap();
            assert!(!snake.contains(apple));
            assert!(!existing.contains(&apple));
        }
    }

    #[test]
    fn test_random_play_keeps_invariants() {
        let mut engine = seeded(GameConfig::small());
        let mut state = engine.reset();
        let mut best = 0;

        for i in 0..2000u32 {
            if state.is_game_over() {
                state = engine.reset();
            }

            let len_before = state.snake.len();
            let score_before = state.score;
            let direction = Direction::ALL[(i * 7 % 11 % 4) as usize];

            let result = engine.step(&mut state, Action::Move(direction));

            let grown = state.snake.len() - len_before;
            assert!(grown <= 1);
            assert_eq!(grown == 1, result.info.ate_food);
            if result.info.ate_food {
                assert_eq!(state.score, score_before + 10);
            } else {
                assert_eq!(state.score, score_before);
            }

            best = best.max(state.score);
            assert_eq!(engine.high_score(), best);
            assert_food_disjoint(&state);
        }
    }

    #[test]
    fn test_high_score_survives_engine_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.json");
        let store = || Box::new(crate::storage::JsonFileStore::new(&path));

        let mut engine = GameEngine::new(GameConfig::small(), store()).unwrap();
        let mut state = column_state(vec![Position::new(5, 4)]);
        engine.step(&mut state, Action::Continue);

        let engine = GameEngine::new(GameConfig::small(), store()).unwrap();
        assert_eq!(engine.high_score(), 10);
    }

    #[test]
    fn test_high_score_only_beaten_strictly() {
        let store = MemoryStore::with_value(HIGH_SCORE_KEY, 30);
        let mut engine = GameEngine::new(GameConfig::small(), Box::new(store)).unwrap();
        let mut state = column_state(vec![Position::new(5, 4)]);
        state.score = 20;

        let result = engine.step(&mut state, Action::Continue);

        assert_eq!(state.score, 30);
        assert!(!result.info.new_high_score);
        assert_eq!(engine.high_score(), 30);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GameConfig {
            apple_count: 0,
            ..GameConfig::small()
        };
        assert!(GameEngine::in_memory(config).is_err());
    }
}
