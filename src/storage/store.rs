use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Key-value storage for integer scores
pub trait ScoreStore {
    /// Read the value stored under `key`, `None` if it was never written
    fn load(&self, key: &str) -> Result<Option<u32>>;

    /// Store `value` under `key`, replacing any previous value
    fn save(&mut self, key: &str, value: u32) -> Result<()>;
}

/// Scores kept in a single JSON object on disk, e.g. `{"snakeHighScore": 120}`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, u32>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read scores from {:?}", self.path))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse scores in {:?}", self.path))
    }
}

impl ScoreStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<u32>> {
        Ok(self.read_all()?.get(key).copied())
    }

    fn save(&mut self, key: &str, value: u32) -> Result<()> {
        // A corrupt file is replaced rather than blocking every future save
        let mut scores = self.read_all().unwrap_or_default();
        scores.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        let json = serde_json::to_string_pretty(&scores).context("Failed to serialize scores")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write scores to {:?}", self.path))?;

        Ok(())
    }
}

/// Scores that live only as long as the process
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `key` already holding `value`
    pub fn with_value(key: &str, value: u32) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value);
        store
    }
}

impl ScoreStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<u32>> {
        Ok(self.values.get(key).copied())
    }

    fn save(&mut self, key: &str, value: u32) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}
