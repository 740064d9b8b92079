use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use nutrisnap_core::store::RecordStore;

pub struct Config {
    pub data_dir: PathBuf,
    pub meals_path: PathBuf,
    pub calories_path: PathBuf,
}

impl Config {
    /// Resolve the data directory (`--data-dir` or the platform default) and
    /// make sure it exists.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "nutrisnap")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            meals_path: data_dir.join("meals.json"),
            calories_path: data_dir.join("calories.json"),
            data_dir,
        })
    }

    pub fn open_store(&self) -> Result<RecordStore> {
        RecordStore::open(&self.meals_path, &self.calories_path)
    }
}
