use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// On-disk text of an empty meal collection.
pub const EMPTY_MEALS: &str = "[]";

/// On-disk text of an empty calorie database.
pub const EMPTY_CALORIE_DB: &str = "{}";

/// A logged meal. Entries are identified by their position in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub name: String,
    #[serde(default)]
    pub calories: Option<f64>,
}

impl MealEntry {
    pub fn new(name: &str, calories: Option<f64>) -> Result<Self> {
        let name = validate_meal_name(name)?;
        let calories = calories.map(validate_calories).transpose()?;
        Ok(Self { name, calories })
    }
}

/// Normalized food name -> calories. Keys are always lower-case.
pub type CalorieDb = BTreeMap<String, f64>;

pub fn validate_meal_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Meal name required");
    }
    Ok(name.to_string())
}

/// Normalize a food name into a calorie database key: trimmed and lower-cased.
pub fn normalize_food_key(key: &str) -> Result<String> {
    let key = key.trim();
    if key.is_empty() {
        bail!("Food name must not be empty");
    }
    Ok(key.to_lowercase())
}

pub fn validate_calories(calories: f64) -> Result<f64> {
    if !calories.is_finite() {
        bail!("Calories must be a finite number (got {calories})");
    }
    Ok(calories)
}
