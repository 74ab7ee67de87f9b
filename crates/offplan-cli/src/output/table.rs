use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::display_value;

/// Sections of a full quote printed as their own tables, in order.
const QUOTE_SECTIONS: [(&str, &str); 3] = [
    ("payment_schedule", "Payment schedule"),
    ("projection", "Yearly projection"),
    ("exit_scenarios", "Exit scenarios"),
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    let Value::Object(envelope) = value else {
        if let Value::Array(rows) = value {
            print_rows(rows);
        } else {
            println!("{}", display_value(value));
        }
        return;
    };

    match envelope.get("result") {
        Some(Value::Object(result)) if result.contains_key("summary") => print_quote(result),
        Some(Value::Object(result)) => print_fields(result),
        Some(Value::Array(rows)) => print_rows(rows),
        _ => print_fields(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_quote(result: &Map<String, Value>) {
    if let Some(Value::Object(summary)) = result.get("summary") {
        println!("Summary");
        print_fields(summary);
    }
    for (key, title) in QUOTE_SECTIONS {
        let rows = match result.get(key) {
            // The schedule object carries its rows under "entries"
            Some(Value::Object(obj)) => obj.get("entries").and_then(Value::as_array),
            Some(Value::Array(rows)) => Some(rows),
            _ => None,
        };
        if let Some(rows) = rows {
            println!("\n{}", title);
            print_rows(rows);
        }
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &display_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        if rows.is_empty() {
            println!("(empty)");
        }
        for item in rows {
            println!("{}", display_value(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for map in rows.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(display_value).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}
