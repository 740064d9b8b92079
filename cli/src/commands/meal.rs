use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutrisnap_core::models::MealEntry;
use nutrisnap_core::store::RecordStore;

use super::helpers::{format_calories, json_error};

pub(crate) fn cmd_meal_list(store: &RecordStore, json: bool) -> Result<()> {
    let meals = store.list_meals()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meals)?);
        return Ok(());
    }

    if meals.is_empty() {
        eprintln!("No meals logged. Use `nutrisnap meal add` to log one.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "Meal")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: String,
    }

    let rows: Vec<MealRow> = meals
        .iter()
        .enumerate()
        .map(|(index, m)| MealRow {
            index,
            name: m.name.clone(),
            calories: format_calories(m.calories),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let total: f64 = meals.iter().filter_map(|m| m.calories).sum();
    println!("Total: {}", format_calories(Some(total)));

    Ok(())
}

/// Build the entry to log, falling back to the calorie database when no
/// value was given. An explicit value always wins.
fn resolve_meal_entry(
    store: &RecordStore,
    name: &str,
    calories: Option<f64>,
) -> Result<MealEntry> {
    let entry = MealEntry::new(name, calories)?;
    if entry.calories.is_some() {
        return Ok(entry);
    }
    Ok(MealEntry {
        calories: store.lookup_calories(&entry.name),
        ..entry
    })
}

pub(crate) fn cmd_meal_add(
    store: &RecordStore,
    name: &str,
    calories: Option<f64>,
    json: bool,
) -> Result<()> {
    let entry = resolve_meal_entry(store, name, calories)?;
    store.append_meal(entry.clone())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!(
            "Added {} ({})",
            entry.name,
            format_calories(entry.calories)
        );
    }

    Ok(())
}

pub(crate) fn cmd_meal_delete(store: &RecordStore, index: usize, json: bool) -> Result<()> {
    if let Some(removed) = store.remove_meal_at(index)? {
        if json {
            println!("{}", serde_json::json!({ "deleted": index, "meal": removed }));
        } else {
            println!("Deleted #{index}: {}", removed.name);
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error(&format!("Invalid index {index}")));
        } else {
            eprintln!("Invalid index {index}");
        }
        process::exit(2);
    }
}

pub(crate) fn cmd_meal_clear(store: &RecordStore, json: bool) -> Result<()> {
    store.clear_meals()?;

    if json {
        println!("{}", serde_json::json!({ "success": true }));
    } else {
        println!("Cleared all meals");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_calorie_database() {
        let store = RecordStore::open_in_memory().unwrap();
        store.set_calories("Banana", 105.0).unwrap();

        let entry = resolve_meal_entry(&store, "banana", None).unwrap();
        assert_eq!(entry.name, "banana");
        assert_eq!(entry.calories, Some(105.0));
    }

    #[test]
    fn test_resolve_unknown_name_has_no_calories() {
        let store = RecordStore::open_in_memory().unwrap();
        store.set_calories("banana", 105.0).unwrap();

        let entry = resolve_meal_entry(&store, "Porridge", None).unwrap();
        assert_eq!(entry.calories, None);
    }

    #[test]
    fn test_resolve_explicit_calories_win() {
        let store = RecordStore::open_in_memory().unwrap();
        store.set_calories("banana", 105.0).unwrap();

        let entry = resolve_meal_entry(&store, "Banana", Some(90.0)).unwrap();
        assert_eq!(entry.calories, Some(90.0));
    }

    #[test]
    fn test_resolve_rejects_empty_name() {
        let store = RecordStore::open_in_memory().unwrap();
        assert!(resolve_meal_entry(&store, "  ", None).is_err());
    }
}
