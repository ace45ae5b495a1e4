use anyhow::{Context, Result};
use clap::Parser;
use neon_snake::game::{GameConfig, GameEngine};
use neon_snake::modes::HumanMode;
use neon_snake::storage::{JsonFileStore, MemoryStore, ScoreStore};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "neon_snake")]
#[command(version, about = "Snake with multiple apples and a persisted high score")]
struct Cli {
    /// JSON file with a full game configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Side length of the square grid
    #[arg(long)]
    grid_size: Option<usize>,

    /// Number of apples on the board
    #[arg(long)]
    apples: Option<usize>,

    /// Milliseconds per game tick
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Seed for apple placement
    #[arg(long)]
    seed: Option<u64>,

    /// Let the head move into the cell the tail is leaving
    #[arg(long)]
    forgiving_tail: bool,

    /// Where the high score is kept
    #[arg(long, default_value = "neon_snake_scores.json")]
    scores: PathBuf,

    /// Keep the high score in memory only
    #[arg(long)]
    no_persist: bool,

    /// Write logs to this file (the terminal is owned by the game)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match (&self.config, self.grid_size) {
            (Some(path), _) => GameConfig::from_file(path)?,
            (None, Some(size)) => GameConfig::new(size),
            (None, None) => GameConfig::default(),
        };

        if let Some(size) = self.grid_size {
            config.grid_size = size;
        }
        if let Some(apples) = self.apples {
            config.apple_count = apples;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.forgiving_tail {
            config.tail_chase_is_fatal = false;
        }

        config.validate().context("Invalid game configuration")?;
        Ok(config)
    }

    fn score_store(&self) -> Box<dyn ScoreStore + Send> {
        if self.no_persist {
            Box::new(MemoryStore::new())
        } else {
            Box::new(JsonFileStore::new(&self.scores))
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {:?}", path))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "neon_snake=info".into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let config = cli.game_config()?;
    info!(
        grid_size = config.grid_size,
        apples = config.apple_count,
        tick_ms = config.tick_interval_ms,
        "Starting neon_snake"
    );

    let engine = GameEngine::new(config, cli.score_store())?;
    let mut human_mode = HumanMode::new(engine);
    human_mode.run().await?;

    Ok(())
}
