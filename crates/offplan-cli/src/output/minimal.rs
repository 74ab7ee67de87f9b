use serde_json::Value;

use super::display_value;

/// Headline fields, in priority order, for each kind of result.
const PRIORITY_KEYS: [&str; 5] = [
    "overall_winners",
    "annualized_roe_pct",
    "total_cash_required",
    "monthly_payment",
    "schema_version",
];

/// Print just the key answer from the output.
///
/// Full quotes answer from their summary, row results print one line per
/// row, everything else uses the first priority key present.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);
    let result = result
        .as_object()
        .and_then(|m| m.get("summary"))
        .unwrap_or(result);

    match result {
        Value::Object(map) => {
            let headline = PRIORITY_KEYS
                .iter()
                .find_map(|k| map.get(*k).filter(|v| !v.is_null()));
            match headline {
                Some(val) => println!("{}", display_value(val)),
                None => {
                    if let Some((key, val)) = map.iter().next() {
                        println!("{}: {}", key, display_value(val));
                    }
                }
            }
        }
        Value::Array(rows) => {
            for row in rows {
                println!("{}", row_line(row));
            }
        }
        other => println!("{}", display_value(other)),
    }
}

/// Compact one-line rendering of a result row.
fn row_line(row: &Value) -> String {
    match row {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_object() && !v.is_array())
            .map(|(k, v)| format!("{}={}", k, display_value(v)))
            .collect::<Vec<_>>()
            .join(" "),
        other => display_value(other),
    }
}
