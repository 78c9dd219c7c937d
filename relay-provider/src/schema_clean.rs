//! Recursive JSON-Schema cleaning (§4.1.1/§4.1.2): each adapter keeps a
//! different allowed-key set, but the recursion itself is shared.

use serde_json::{Map, Value};

/// Recursively strip schema keys not in `allowed`, descending into
/// `properties` and `items`. Idempotent: `clean(clean(s), k) == clean(s, k)`.
#[must_use]
pub fn clean_schema(schema: &Value, allowed: &[&str]) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };

    let mut cleaned = Map::new();
    for (key, value) in map {
        if !allowed.contains(&key.as_str()) {
            continue;
        }
        let value = match key.as_str() {
            "properties" => clean_properties(value, allowed),
            "items" => clean_schema(value, allowed),
            _ => value.clone(),
        };
        cleaned.insert(key.clone(), value);
    }
    Value::Object(cleaned)
}

fn clean_properties(properties: &Value, allowed: &[&str]) -> Value {
    let Value::Object(map) = properties else {
        return properties.clone();
    };
    let cleaned: Map<String, Value> = map
        .iter()
        .map(|(name, sub_schema)| (name.clone(), clean_schema(sub_schema, allowed)))
        .collect();
    Value::Object(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GEMINI_ALLOWED: &[&str] = &["type", "description", "properties", "required", "items", "enum"];

    #[test]
    fn strips_keys_outside_the_allowed_set() {
        let schema = json!({
            "type": "string",
            "minimum": 0,
            "maximum": 10,
            "default": 5,
            "additionalProperties": false,
            "pattern": "^[a-z]+$",
        });
        let cleaned = clean_schema(&schema, GEMINI_ALLOWED);
        assert_eq!(cleaned, json!({ "type": "string" }));
    }

    #[test]
    fn recurses_into_properties_and_items() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 1 },
                },
            },
        });
        let cleaned = clean_schema(&schema, GEMINI_ALLOWED);
        assert_eq!(
            cleaned,
            json!({
                "type": "object",
                "properties": {
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                    },
                },
            })
        );
    }

    #[test]
    fn cleaning_is_idempotent() {
        let schema = json!({
            "type": "string",
            "format": "uri",
            "pattern": "^https?://",
        });
        let once = clean_schema(&schema, GEMINI_ALLOWED);
        let twice = clean_schema(&once, GEMINI_ALLOWED);
        assert_eq!(once, twice);
    }
}
