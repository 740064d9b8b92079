mod calories;
mod helpers;
mod meal;

pub(crate) use calories::{cmd_calories_add, cmd_calories_lookup};
pub(crate) use meal::{cmd_meal_add, cmd_meal_clear, cmd_meal_delete, cmd_meal_list};
