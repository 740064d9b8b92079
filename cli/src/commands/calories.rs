use anyhow::Result;
use std::process;

use nutrisnap_core::store::RecordStore;

use super::helpers::format_calories;

pub(crate) fn cmd_calories_add(
    store: &RecordStore,
    key: &str,
    calories: f64,
    json: bool,
) -> Result<()> {
    let stored = store.set_calories(key, calories)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "key": stored, "calories": calories })
        );
    } else {
        println!("Saved {stored} = {}", format_calories(Some(calories)));
    }

    Ok(())
}

pub(crate) fn cmd_calories_lookup(store: &RecordStore, name: &str, json: bool) -> Result<()> {
    if let Some(calories) = store.lookup_calories(name) {
        if json {
            println!(
                "{}",
                serde_json::json!({ "found": true, "calories": calories })
            );
        } else {
            println!("{name}: {}", format_calories(Some(calories)));
        }
        Ok(())
    } else {
        if json {
            println!("{}", serde_json::json!({ "found": false }));
        } else {
            eprintln!(
                "No calorie entry for '{name}'. Use `nutrisnap calories add` to create one."
            );
        }
        process::exit(2);
    }
}
