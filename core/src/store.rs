use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, anyhow};

use crate::models::{
    CalorieDb, EMPTY_CALORIE_DB, EMPTY_MEALS, MealEntry, normalize_food_key, validate_calories,
};

/// Backing storage for one collection's serialized text.
///
/// The file implementation is what the server runs on; the in-memory one
/// backs tests and embedders that don't want anything on disk.
pub trait Storage: Send + Sync {
    /// Seed the storage with `empty` if nothing has been written yet.
    /// Existing contents are left alone.
    fn ensure_initialized(&self, empty: &str) -> Result<()>;
    fn read(&self) -> Result<String>;
    /// Replace the stored text in full.
    fn write(&self, contents: &str) -> Result<()>;
    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Storage for FileStorage {
    fn ensure_initialized(&self, empty: &str) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&self.path, empty)
            .with_context(|| format!("Failed to initialize {}", self.path.display()))
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
    }

    fn write(&self, contents: &str) -> Result<()> {
        // Whole-file overwrite; a crash mid-write can leave a truncated file.
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    contents: Mutex<Option<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> MutexGuard<'_, Option<String>> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn ensure_initialized(&self, empty: &str) -> Result<()> {
        self.contents().get_or_insert_with(|| empty.to_string());
        Ok(())
    }

    fn read(&self) -> Result<String> {
        self.contents()
            .clone()
            .ok_or_else(|| anyhow!("in-memory storage has not been initialized"))
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.contents() = Some(contents.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

pub fn load_meals(storage: &dyn Storage) -> Result<Vec<MealEntry>> {
    let text = storage.read()?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse meal collection in {}", storage.location()))
}

pub fn save_meals(storage: &dyn Storage, meals: &[MealEntry]) -> Result<()> {
    let text = serde_json::to_string_pretty(meals).context("failed to serialize meals")?;
    storage.write(&text)
}

/// Best-effort load: a missing or malformed database reads as empty.
pub fn load_calorie_db(storage: &dyn Storage) -> CalorieDb {
    let parsed = storage.read().and_then(|text| {
        serde_json::from_str::<CalorieDb>(&text)
            .with_context(|| format!("Failed to parse calorie database in {}", storage.location()))
    });
    match parsed {
        Ok(db) => db,
        Err(err) => {
            tracing::warn!("Calorie database unavailable, treating as empty: {err:#}");
            CalorieDb::new()
        }
    }
}

pub fn save_calorie_db(storage: &dyn Storage, db: &CalorieDb) -> Result<()> {
    let text = serde_json::to_string_pretty(db).context("failed to serialize calorie database")?;
    storage.write(&text)
}

/// The two persisted collections, each behind its own lock so a
/// read-modify-write on one collection can never interleave with another
/// on the same collection.
pub struct RecordStore {
    meals: Mutex<Box<dyn Storage>>,
    calories: Mutex<Box<dyn Storage>>,
}

impl RecordStore {
    pub fn new(meals: Box<dyn Storage>, calories: Box<dyn Storage>) -> Result<Self> {
        meals.ensure_initialized(EMPTY_MEALS)?;
        calories.ensure_initialized(EMPTY_CALORIE_DB)?;
        Ok(Self {
            meals: Mutex::new(meals),
            calories: Mutex::new(calories),
        })
    }

    pub fn open(meals_path: &Path, calories_path: &Path) -> Result<Self> {
        Self::new(
            Box::new(FileStorage::new(meals_path)),
            Box::new(FileStorage::new(calories_path)),
        )
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Box::new(MemoryStorage::new()), Box::new(MemoryStorage::new()))
    }

    fn meals(&self) -> MutexGuard<'_, Box<dyn Storage>> {
        self.meals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn calories(&self) -> MutexGuard<'_, Box<dyn Storage>> {
        self.calories.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Meals ---

    pub fn list_meals(&self) -> Result<Vec<MealEntry>> {
        let storage = self.meals();
        load_meals(storage.as_ref())
    }

    pub fn append_meal(&self, entry: MealEntry) -> Result<()> {
        let storage = self.meals();
        let mut meals = load_meals(storage.as_ref())?;
        meals.push(entry);
        save_meals(storage.as_ref(), &meals)
    }

    /// Remove the entry at `index`, shifting later entries down by one.
    /// Returns `None` and leaves the collection untouched when `index` is out of range.
    pub fn remove_meal_at(&self, index: usize) -> Result<Option<MealEntry>> {
        let storage = self.meals();
        let mut meals = load_meals(storage.as_ref())?;
        if index >= meals.len() {
            return Ok(None);
        }
        let removed = meals.remove(index);
        save_meals(storage.as_ref(), &meals)?;
        Ok(Some(removed))
    }

    pub fn clear_meals(&self) -> Result<()> {
        self.meals().write(EMPTY_MEALS)
    }

    // --- Calorie database ---

    #[must_use]
    pub fn calorie_db(&self) -> CalorieDb {
        let storage = self.calories();
        load_calorie_db(storage.as_ref())
    }

    /// Case-insensitive lookup. Never fails: unreadable data reads as "not found".
    #[must_use]
    pub fn lookup_calories(&self, name: &str) -> Option<f64> {
        let key = normalize_food_key(name).ok()?;
        self.calorie_db().get(&key).copied()
    }

    /// Insert or overwrite an entry, returning the normalized key it was stored under.
    pub fn set_calories(&self, name: &str, calories: f64) -> Result<String> {
        let key = normalize_food_key(name)?;
        let calories = validate_calories(calories)?;
        let storage = self.calories();
        let mut db = load_calorie_db(storage.as_ref());
        db.insert(key.clone(), calories);
        save_calorie_db(storage.as_ref(), &db)?;
        Ok(key)
    }
}
