/**
 * ============================================================================
 * EVENT FORMATTER MODULE
 * ============================================================================
 *
 * PURPOSE: Map raw probe output onto the per-category schema and encode
 * events into their canonical JSON line form
 *
 * ENCODING RULES:
 * - Fields are written in schema order as a single-line JSON object
 * - Raw bytes: base64 (standard alphabet, padded)
 * - Non-finite numbers: written as their display string
 * - Any encoder failure: every field coerced to its display string
 *
 * Serialization never fails. Telemetry must not crash its host.
 *
 * ============================================================================
 */

use crate::delivery::types::{Category, Event, FieldValue, SerializedEvent};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::ser::{Serialize, SerializeMap, Serializer};

/**
 * Build an event from positional raw values
 *
 * Values are assigned to the category's keys in order. Missing values
 * become empty strings and surplus values are dropped, so a probe that
 * returns too little still produces a well-formed event.
 */
pub fn build(category: Category, values: Vec<FieldValue>) -> Event {
    let names = category.field_names();
    if values.len() != names.len() {
        log::warn!(
            "{} event expects {} values, got {}",
            category,
            names.len(),
            values.len()
        );
    }

    let mut values = values.into_iter();
    let fields = names
        .iter()
        .map(|name| {
            let value = values
                .next()
                .unwrap_or_else(|| FieldValue::Text(String::new()));
            (*name, value)
        })
        .collect();

    Event {
        category: Some(category),
        fields,
    }
}

/**
 * Build an event from a category wire name
 * Unrecognized names yield an event with no fields instead of an error
 */
pub fn build_named(name: &str, values: Vec<FieldValue>) -> Event {
    match Category::parse(name) {
        Some(category) => build(category, values),
        None => {
            log::warn!("Unrecognized telemetry category '{}', sending empty event", name);
            Event {
                category: None,
                fields: Vec::new(),
            }
        }
    }
}

/**
 * Encode an event as its canonical JSON line
 */
pub fn serialize(event: &Event) -> SerializedEvent {
    match serde_json::to_string(&WireBody(event)) {
        Ok(json) => SerializedEvent(json),
        Err(e) => {
            log::warn!("Failed to encode event natively, coercing fields to strings: {}", e);
            SerializedEvent(coerce_to_strings(event))
        }
    }
}

fn coerce_to_strings(event: &Event) -> String {
    let map: serde_json::Map<String, serde_json::Value> = event
        .fields
        .iter()
        .map(|(key, value)| {
            (
                key.to_string(),
                serde_json::Value::String(value.display_string()),
            )
        })
        .collect();

    serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
}

struct WireBody<'a>(&'a Event);

impl Serialize for WireBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.fields.len()))?;
        for (key, value) in &self.0.fields {
            map.serialize_entry(key, &WireValue(value))?;
        }
        map.end()
    }
}

struct WireValue<'a>(&'a FieldValue);

impl Serialize for WireValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            // JSON has no NaN/inf
            FieldValue::Number(n) => serializer.serialize_str(&n.to_string()),
            FieldValue::Bytes(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            FieldValue::Json(value) => value.serialize(serializer),
        }
    }
}
