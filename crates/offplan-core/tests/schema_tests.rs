use offplan_core::error::OffplanError;
use offplan_core::inputs::InvestmentInputs;
use offplan_core::quote::build_quote;
use offplan_core::schema::{load, load_with_warnings, stamp, CURRENT_SCHEMA_VERSION};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;

#[test]
fn test_stamped_document_loads_back() {
    let mut inputs = InvestmentInputs::new(dec!(1250000), (2025, 6), (2028, 2));
    inputs.rent.rental_yield_pct = dec!(6.5);
    inputs.exit_months = vec![36];

    let doc = stamp(&inputs).unwrap();
    assert_eq!(doc.schema_version, CURRENT_SCHEMA_VERSION);

    let loaded = load(serde_json::to_value(&doc).unwrap()).unwrap();
    assert_eq!(loaded.base_price, dec!(1250000));
    assert_eq!(loaded.rent.rental_yield_pct, dec!(6.5));
    assert_eq!(loaded.exit_months, vec![36]);
}

#[test]
fn test_v1_document_quotes_like_v2() {
    let v1 = json!({
        "base_price": 1000000,
        "booking_month": 3,
        "booking_year": 2025,
        "handover_quarter": 1,
        "handover_year": 2027,
        "pre_handover_percent": 20,
        "rental_yield": 7,
        "service_charge_rate": 15,
        "unit_size_sqft": 1000,
        "registration_fee_percent": null,
    });
    let v2 = json!({
        "schema_version": 2,
        "inputs": {
            "base_price": 1000000,
            "booking_month": 3,
            "booking_year": 2025,
            "handover_quarter": 1,
            "handover_year": 2027,
            "payment_plan": { "pre_handover_pct": 20 },
            "rent": { "rental_yield_pct": 7, "service_charge_per_sqft": 15 },
            "unit_size_sqft": 1000,
        }
    });

    let a = build_quote(&load(v1).unwrap(), &mut Vec::new()).unwrap();
    let b = build_quote(&load(v2).unwrap(), &mut Vec::new()).unwrap();
    assert_eq!(a.projection, b.projection);
    assert_eq!(a.exit_scenarios, b.exit_scenarios);
}

#[test]
fn test_non_object_rejected() {
    assert!(matches!(
        load(json!([1, 2, 3])),
        Err(OffplanError::InvalidInput { .. })
    ));
}

#[test]
fn test_bad_base_price_names_the_field() {
    let doc = json!({
        "schema_version": 2,
        "inputs": {
            "base_price": "a lot",
            "booking_month": 3,
            "booking_year": 2025,
            "handover_quarter": 1,
            "handover_year": 2027,
        }
    });
    match load(doc) {
        Err(OffplanError::InvalidInput { field, .. }) => assert_eq!(field, "base_price"),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn test_malformed_optional_fields_take_defaults() {
    let doc = json!({
        "schema_version": 2,
        "inputs": {
            "base_price": 1000000,
            "booking_month": 3,
            "booking_year": 2025,
            "handover_quarter": 1,
            "handover_year": 2027,
            "holding_period_years": "ten",
            "appreciation": { "construction_pct": "abc", "growth_pct": 9 },
        }
    });

    let (inputs, warnings) = load_with_warnings(doc.clone()).unwrap();
    assert_eq!(inputs.holding_period_years, 10);
    assert_eq!(inputs.appreciation.construction_pct, dec!(12));
    assert_eq!(inputs.appreciation.growth_pct, dec!(9));
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().any(|w| w.contains("`holding_period_years`")));
    assert!(warnings.iter().any(|w| w.contains("`appreciation.construction_pct`")));

    // The plain loader defaults the same fields
    assert_eq!(load(doc).unwrap().holding_period_years, 10);
}
