//! Identity template engine
//!
//! Data sources may configure a `user_template`: a JSON document with
//! `{{field}}` placeholders that rewrites whatever an authenticator
//! resolved into the user document the hub actually stores. Fields come
//! from the raw authentication payload plus the resolved document's id.

use crate::json_id;
use serde_json::Value;
use std::collections::HashMap;

/// Build the placeholder field map for a template render: the
/// top-level scalar fields of the request payload, with the resolved
/// document's `data.id` (when present) taking precedence under `"id"`.
pub fn field_map(payload: &Value, resolved: &Value) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    if let Some(object) = payload.as_object() {
        for (key, value) in object {
            if let Some(scalar) = scalar_string(value) {
                fields.insert(key.clone(), scalar);
            }
        }
    }
    if let Some(id) = resolved.get("data").and_then(|data| data.get("id")) {
        if let Some(id) = json_id(id) {
            fields.insert("id".to_string(), id);
        }
    }
    fields
}

/// Render a `{{field}}` template against a field map and parse the
/// result as a JSON document.
///
/// Missing placeholders render as the empty string rather than failing;
/// output that is not valid JSON is a render failure (`None`).
pub fn render(template: &str, fields: &HashMap<String, String>) -> Option<Value> {
    let rendered = substitute(template, fields);
    serde_json::from_str(&rendered).ok()
}

/// Substitute `{{field}}` placeholders. Unknown fields become empty
/// strings; text with no closing braces passes through untouched.
fn substitute(template: &str, fields: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = fields.get(key) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                // unterminated placeholder, emit as-is
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
