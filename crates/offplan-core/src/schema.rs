use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OffplanError;
use crate::inputs::InvestmentInputs;
use crate::OffplanResult;

/// Saved input sets before v2 kept the payment plan at the top level, named
/// percentages `*_percent` and used flat `rental_yield`,
/// `service_charge_rate` and `appreciation_rate` keys. A document without a
/// version is v1.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Structurally required fields and the type each must parse as.
const REQUIRED_FIELDS: [(&str, fn(&Value) -> bool); 5] = [
    ("base_price", parses::<Decimal>),
    ("booking_month", parses::<u32>),
    ("booking_year", parses::<i32>),
    ("handover_quarter", parses::<u32>),
    ("handover_year", parses::<i32>),
];

/// Top-level v1 payment-plan keys and where they live in v2.
const V1_PLAN_FIELDS: [(&str, &str); 5] = [
    ("pre_handover_percent", "pre_handover_pct"),
    ("milestones", "milestones"),
    ("has_post_handover_plan", "has_post_handover_plan"),
    ("post_handover_percent", "post_handover_pct"),
    ("post_handover_installments", "post_handover_installments"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteDocument {
    pub schema_version: u32,
    pub inputs: Value,
}

/// Wrap `inputs` in a document stamped with the current schema version.
pub fn stamp(inputs: &InvestmentInputs) -> OffplanResult<QuoteDocument> {
    Ok(QuoteDocument {
        schema_version: CURRENT_SCHEMA_VERSION,
        inputs: serde_json::to_value(inputs)?,
    })
}

/// Load a stored document, migrating it to the current schema.
///
/// Accepts either a `{ schema_version, inputs }` envelope or a bare inputs
/// object (optionally carrying its own `schema_version`). Optional fields
/// that do not parse are dropped and take their defaults; see
/// [`load_with_warnings`] for the list of what was dropped.
pub fn load(document: Value) -> OffplanResult<InvestmentInputs> {
    let (inputs, warnings) = load_with_warnings(document)?;
    for warning in &warnings {
        tracing::warn!(%warning, "input field defaulted");
    }
    Ok(inputs)
}

/// [`load`], also returning one warning per optional value that was
/// dropped. Only a missing or malformed required field is an error.
pub fn load_with_warnings(document: Value) -> OffplanResult<(InvestmentInputs, Vec<String>)> {
    let (version, body) = split_document(document)?;
    let Value::Object(body) = migrate(version, body)? else {
        return Err(OffplanError::invalid(
            "inputs",
            "Input document must be a JSON object",
        ));
    };

    let skeleton = required_skeleton(&body)?;
    let mut warnings = Vec::new();
    let mut repaired = skeleton.clone();
    for (key, value) in body {
        if repaired.contains_key(&key) {
            continue;
        }
        let mut path = vec![key.clone()];
        if let Some(value) = repair(&skeleton, &mut path, value, &mut warnings) {
            repaired.insert(key, value);
        }
    }

    let inputs = serde_json::from_value(Value::Object(repaired))?;
    Ok((inputs, warnings))
}

/// Migrate `body` from `version` to [`CURRENT_SCHEMA_VERSION`].
pub fn migrate(version: u32, body: Value) -> OffplanResult<Value> {
    if version == 0 || version > CURRENT_SCHEMA_VERSION {
        return Err(OffplanError::UnsupportedSchema(version));
    }
    let Value::Object(mut map) = strip_nulls(body) else {
        return Err(OffplanError::invalid(
            "inputs",
            "Input document must be a JSON object",
        ));
    };

    if version < CURRENT_SCHEMA_VERSION {
        tracing::debug!(
            from = version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating quote inputs"
        );
    }

    let mut current = version;
    while current < CURRENT_SCHEMA_VERSION {
        map = match current {
            1 => v1_to_v2(map),
            _ => map,
        };
        current += 1;
    }
    Ok(Value::Object(map))
}

fn split_document(document: Value) -> OffplanResult<(u32, Value)> {
    let Value::Object(mut map) = document else {
        return Err(OffplanError::invalid(
            "inputs",
            "Input document must be a JSON object",
        ));
    };

    let version = match map.remove("schema_version") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                OffplanError::invalid("schema_version", "Schema version must be a positive integer")
            })?,
    };

    let body = match map.remove("inputs") {
        Some(inputs) if inputs.is_object() => inputs,
        Some(other) => {
            map.insert("inputs".into(), other);
            Value::Object(map)
        }
        None => Value::Object(map),
    };
    Ok((version, body))
}

fn parses<T: DeserializeOwned>(value: &Value) -> bool {
    T::deserialize(value).is_ok()
}

/// The required fields alone, each checked against its type.
fn required_skeleton(body: &Map<String, Value>) -> OffplanResult<Map<String, Value>> {
    let mut skeleton = Map::new();
    for (field, parses_as) in REQUIRED_FIELDS {
        let value = body
            .get(field)
            .ok_or_else(|| OffplanError::invalid(field, "Required field is missing"))?;
        if !parses_as(value) {
            return Err(OffplanError::invalid(
                field,
                format!("Required field has an invalid value: {value}"),
            ));
        }
        skeleton.insert(field.to_string(), value.clone());
    }
    Ok(skeleton)
}

/// Whether `value`, placed at `path` on top of the required fields, still
/// deserializes.
fn fits(skeleton: &Map<String, Value>, path: &[String], value: &Value) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return false;
    };
    let nested = rest.iter().rev().fold(value.clone(), |inner, key| {
        Value::Object([(key.clone(), inner)].into_iter().collect())
    });
    let mut doc = skeleton.clone();
    doc.insert(head.clone(), nested);
    serde_json::from_value::<InvestmentInputs>(Value::Object(doc)).is_ok()
}

/// Keep the parts of `value` that parse at `path`. Objects are repaired key
/// by key and arrays entry by entry; anything else that fails is dropped.
fn repair(
    skeleton: &Map<String, Value>,
    path: &mut Vec<String>,
    value: Value,
    warnings: &mut Vec<String>,
) -> Option<Value> {
    if fits(skeleton, path, &value) {
        return Some(value);
    }

    let kept = match value {
        Value::Object(map) => {
            let mut kept = Map::new();
            for (key, inner) in map {
                path.push(key.clone());
                if let Some(inner) = repair(skeleton, path, inner, warnings) {
                    kept.insert(key, inner);
                }
                path.pop();
            }
            Value::Object(kept)
        }
        Value::Array(items) => {
            let mut kept = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                if fits(skeleton, path, &Value::Array(vec![item.clone()])) {
                    kept.push(item);
                } else {
                    warnings.push(format!(
                        "Ignored invalid entry {idx} of `{}`",
                        path.join(".")
                    ));
                }
            }
            Value::Array(kept)
        }
        _ => {
            warnings.push(format!(
                "Ignored invalid value for `{}`; using the default",
                path.join(".")
            ));
            return None;
        }
    };

    if fits(skeleton, path, &kept) {
        Some(kept)
    } else {
        warnings.push(format!(
            "Ignored invalid value for `{}`; using the default",
            path.join(".")
        ));
        None
    }
}

/// Remove object entries whose value is null, recursively.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

fn v1_to_v2(mut map: Map<String, Value>) -> Map<String, Value> {
    let mut plan = take_object(&mut map, "payment_plan");
    for (old, new) in V1_PLAN_FIELDS {
        if let Some(v) = map.remove(old) {
            plan.entry(new).or_insert(v);
        }
    }
    if !plan.is_empty() {
        map.insert("payment_plan".into(), Value::Object(plan));
    }

    let mut rent = take_object(&mut map, "rent");
    if let Some(v) = map.remove("rental_yield") {
        rent.entry("rental_yield_pct").or_insert(v);
    }
    if let Some(v) = map.remove("service_charge_rate") {
        rent.entry("service_charge_per_sqft").or_insert(v);
    }
    if !rent.is_empty() {
        map.insert("rent".into(), Value::Object(rent));
    }

    // v1 had a single flat rate for every phase
    if let Some(rate) = map.remove("appreciation_rate") {
        let mut appreciation = take_object(&mut map, "appreciation");
        for key in ["construction_pct", "growth_pct", "mature_pct"] {
            appreciation.entry(key).or_insert_with(|| rate.clone());
        }
        map.insert("appreciation".into(), Value::Object(appreciation));
    }

    rename_percent_keys(map)
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

/// `foo_percent` -> `foo_pct` at every depth. An existing `foo_pct` wins.
fn rename_percent_keys(map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    let mut renamed = Vec::new();
    for (key, value) in map {
        let value = match value {
            Value::Object(inner) => Value::Object(rename_percent_keys(inner)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(inner) => Value::Object(rename_percent_keys(inner)),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        };
        match key.strip_suffix("_percent") {
            Some(stem) => renamed.push((format!("{stem}_pct"), value)),
            None => {
                out.insert(key, value);
            }
        }
    }
    for (key, value) in renamed {
        out.entry(key).or_insert(value);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
