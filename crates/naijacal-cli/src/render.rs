//! Plain-text rendering of a parsed food log.

use std::fmt::Write;

use naijacal_core::api::{FoodItem, ParseResult};

/// Formats a successful parse for the terminal.
pub fn parse_result(result: &ParseResult) -> String {
    let mut out = String::from("Parsed successfully!\n");

    if result.items.is_empty() {
        out.push_str("No foods detected.\n");
    } else {
        out.push_str("Detected foods:\n");
        for item in &result.items {
            push_item(&mut out, item);
        }
    }

    let _ = writeln!(
        out,
        "Total Calories (all foods): {}",
        calories(result.total_calories)
    );
    out
}

fn push_item(out: &mut String, item: &FoodItem) {
    let today = item
        .calories_today
        .map_or_else(|| "-".to_string(), calories);
    let _ = writeln!(out, "  - {} — {}", item.name, item.quantity);
    let _ = writeln!(
        out,
        "    Total Calories: {} | Calories Eaten Today: {today}",
        calories(item.total_calories)
    );
}

// Whole numbers print without a fractional part.
fn calories(value: f64) -> String {
    format!("{value}")
}
