//! Utility functions for escaping, name validation and structured serialization.

use minijinja::HtmlEscape;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Escapes a string for HTML with MiniJinja's escaper.
///
/// The simple engine and the markup encoder use this, so their output matches
/// what auto-escaped MiniJinja templates produce.
///
/// # Example
///
/// ```rust
/// use standout_view::escape_html;
///
/// assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"),
///            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;&#x2f;b&gt;");
/// ```
pub fn escape_html(s: &str) -> String {
    HtmlEscape(s).to_string()
}

/// Returns true if `name` looks like a module path: `App`, `App.UserView`.
///
/// Every dot-separated segment must start with an ASCII uppercase letter and
/// continue with ASCII alphanumerics or underscores.
pub fn is_module_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Returns the trailing output-format extension of a template name.
///
/// `"user/index.html"` → `Some("html")`. Dots in directory names are ignored.
pub fn format_extension(template: &str) -> Option<&str> {
    let file = template.rsplit('/').next().unwrap_or(template);
    match file.rfind('.') {
        Some(idx) if idx + 1 < file.len() => Some(&file[idx + 1..]),
        _ => None,
    }
}

/// Returns true for formats whose engines escape interpolated values as HTML.
pub(crate) fn is_markup_format(template: &str) -> bool {
    matches!(format_extension(template), Some("html" | "htm" | "xml"))
}

/// Serializes a JSON value to XML.
///
/// Objects are wrapped in a `<data>` root tag with keys sanitized to valid XML
/// element names. Primitive values are wrapped as `<data><value>...</value></data>`.
/// Null produces an empty `<data/>` element.
pub fn serialize_to_xml(value: &Value) -> Result<String, quick_xml::DeError> {
    let sanitized = sanitize_xml_keys(value);
    match sanitized {
        Value::Object(_) => quick_xml::se::to_string_with_root("data", &sanitized),
        Value::Null => {
            quick_xml::se::to_string_with_root("data", &Value::Object(Default::default()))
        }
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            quick_xml::se::to_string_with_root("data", &Value::Object(map))
        }
    }
}

/// Recursively sanitizes JSON object keys to be valid XML element names.
fn sanitize_xml_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| (sanitize_xml_name(key), sanitize_xml_keys(val)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_xml_keys).collect()),
        other => other.clone(),
    }
}

/// Ensures a string is a valid XML element name.
///
/// XML names must start with a letter or underscore. Invalid characters are
/// replaced with underscores.
fn sanitize_xml_name(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }
    let mut result = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if i == 0 {
            if c.is_ascii_alphabetic() || c == '_' {
                result.push(c);
            } else {
                result.push('_');
                if c.is_ascii_alphanumeric() {
                    result.push(c);
                }
            }
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
            result.push(c);
        } else {
            result.push('_');
        }
    }
    result
}

/// Flattens a JSON value into `(headers, rows)` for CSV output.
///
/// - An array becomes one row per element.
/// - Anything else becomes a single row.
/// - Nested objects are flattened with dot notation; nested arrays become JSON text.
pub fn flatten_json_for_csv(value: &Value) -> (Vec<String>, Vec<Vec<String>>) {
    let rows: Vec<BTreeMap<String, String>> = match value {
        Value::Array(arr) => arr.iter().map(flatten_single_item).collect(),
        _ => vec![flatten_single_item(value)],
    };

    let headers: Vec<String> = rows
        .iter()
        .flat_map(|row| row.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let data = rows
        .into_iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(h).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    (headers, data)
}

fn flatten_single_item(value: &Value) -> BTreeMap<String, String> {
    let mut acc = BTreeMap::new();
    flatten_recursive(value, "", &mut acc);
    acc
}

fn flatten_recursive(value: &Value, prefix: &str, acc: &mut BTreeMap<String, String>) {
    let key = if prefix.is_empty() { "value" } else { prefix };
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            acc.insert(key.to_string(), b.to_string());
        }
        Value::Number(n) => {
            acc.insert(key.to_string(), n.to_string());
        }
        Value::String(s) => {
            acc.insert(key.to_string(), s.clone());
        }
        Value::Array(_) => {
            acc.insert(key.to_string(), value.to_string());
        }
        Value::Object(map) if map.is_empty() => {
            acc.insert(key.to_string(), "{}".to_string());
        }
        Value::Object(map) => {
            for (k, v) in map {
                let new_key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten_recursive(v, &new_key, acc);
            }
        }
    }
}
