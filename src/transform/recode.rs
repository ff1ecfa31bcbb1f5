// src/transform/recode.rs

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Census `histpov2` RACE legend, numeric code → human-readable label.
/// Codes 2–5 are White sub-groups, 6–8 Black, 9–11 Asian.
static RACE_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("1", "All"),
        ("2", "White"),
        ("3", "White"),
        ("4", "White"),
        ("5", "White"),
        ("6", "Black"),
        ("7", "Black"),
        ("8", "Black"),
        ("9", "Asian"),
        ("10", "Asian"),
        ("11", "Asian"),
        ("12", "Hispanic"),
    ])
});

/// Look up the label for a RACE code. `None` for codes outside the legend.
pub fn race_label(code: &str) -> Option<&'static str> {
    RACE_LABELS.get(code).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_codes_map_to_labels() {
        assert_eq!(race_label("1"), Some("All"));
        assert_eq!(race_label("2"), Some("White"));
        assert_eq!(race_label("6"), Some("Black"));
        assert_eq!(race_label("11"), Some("Asian"));
        assert_eq!(race_label("12"), Some("Hispanic"));
    }

    #[test]
    fn unknown_codes_are_none() {
        assert_eq!(race_label("99"), None);
        assert_eq!(race_label(""), None);
    }
}
