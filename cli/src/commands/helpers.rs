use serde::Serialize;

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Format a calorie value for display: "105 kcal", "52.5 kcal", or "-".
pub(crate) fn format_calories(calories: Option<f64>) -> String {
    match calories {
        Some(c) if c.fract() == 0.0 => format!("{c:.0} kcal"),
        Some(c) => format!("{c} kcal"),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_escapes() {
        let out = json_error("bad \"name\"");
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["error"], "bad \"name\"");
    }

    #[test]
    fn test_format_calories() {
        assert_eq!(format_calories(Some(105.0)), "105 kcal");
        assert_eq!(format_calories(Some(52.5)), "52.5 kcal");
        assert_eq!(format_calories(None), "-");
    }
}
