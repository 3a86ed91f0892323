//! Format encoders: turn a rendered value into output bytes.
//!
//! Encoders are looked up by the output-format extension of a template name,
//! so `show.json` uses the `json` encoder and `index.html` the `html` encoder.
//! [`Renderer::render_to_iodata`](crate::Renderer::render_to_iodata) is the only
//! place they run; plain [`render`](crate::Renderer::render) never encodes.
//!
//! | Format | Encoder | Safe markup | Structured data |
//! |--------|---------|-------------|-----------------|
//! | `html` | [`MarkupEncoder`] | verbatim | HTML-escaped text |
//! | `js` | [`ScriptEncoder`] | verbatim | JSON literal, `</` escaped |
//! | `json` | [`JsonEncoder`] | JSON string | compact JSON |
//! | `yaml` | [`YamlEncoder`] | YAML string | YAML document |
//! | `xml` | [`XmlEncoder`] | verbatim | `<data>` document |
//! | `csv` | [`CsvEncoder`] | verbatim | one row per element |

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assigns::Rendered;
use crate::error::EncodeError;
use crate::util::{escape_html, flatten_json_for_csv, serialize_to_xml};

/// Encodes a rendered value into bytes for one output format.
pub trait Encoder: Send + Sync {
    fn encode(&self, rendered: &Rendered) -> Result<Vec<u8>, EncodeError>;
}

/// HTML output. Safe markup passes through; data is escaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupEncoder;

impl Encoder for MarkupEncoder {
    fn encode(&self, rendered: &Rendered) -> Result<Vec<u8>, EncodeError> {
        Ok(match rendered {
            Rendered::Safe(markup) => markup.as_bytes().to_vec(),
            Rendered::Data(data) => escape_html(&rendered_text(data)).into_bytes(),
        })
    }
}

/// JavaScript output. Data becomes a JSON literal safe to embed in `<script>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptEncoder;

impl Encoder for ScriptEncoder {
    fn encode(&self, rendered: &Rendered) -> Result<Vec<u8>, EncodeError> {
        Ok(match rendered {
            Rendered::Safe(script) => script.as_bytes().to_vec(),
            Rendered::Data(data) => serde_json::to_string(data)?
                .replace("</", "<\\/")
                .into_bytes(),
        })
    }
}

/// Compact JSON, e.g. `{"foo":"bar"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, rendered: &Rendered) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(&rendered.to_json())?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlEncoder;

impl Encoder for YamlEncoder {
    fn encode(&self, rendered: &Rendered) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_yaml::to_string(&rendered.to_json())?.into_bytes())
    }
}

/// XML output. Data is wrapped in a `<data>` root element.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEncoder;

impl Encoder for XmlEncoder {
    fn encode(&self, rendered: &Rendered) -> Result<Vec<u8>, EncodeError> {
        Ok(match rendered {
            Rendered::Safe(markup) => markup.as_bytes().to_vec(),
            Rendered::Data(data) => serialize_to_xml(data)?.into_bytes(),
        })
    }
}

/// CSV output with a header row. Nested objects flatten to dotted columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder;

impl Encoder for CsvEncoder {
    fn encode(&self, rendered: &Rendered) -> Result<Vec<u8>, EncodeError> {
        let data = match rendered {
            Rendered::Safe(text) => return Ok(text.as_bytes().to_vec()),
            Rendered::Data(data) => data,
        };

        let (headers, rows) = flatten_json_for_csv(data);
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&headers)
            .map_err(|e| EncodeError::Csv(e.to_string()))?;
        for row in rows {
            wtr.write_record(&row)
                .map_err(|e| EncodeError::Csv(e.to_string()))?;
        }
        wtr.into_inner()
            .map_err(|e| EncodeError::Csv(e.to_string()))
    }
}

fn rendered_text(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Built-in encoders, as named in [`RegistrySettings`](crate::RegistrySettings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    Markup,
    Script,
    Json,
    Yaml,
    Xml,
    Csv,
}

impl EncoderKind {
    pub fn build(self) -> Arc<dyn Encoder> {
        match self {
            EncoderKind::Markup => Arc::new(MarkupEncoder),
            EncoderKind::Script => Arc::new(ScriptEncoder),
            EncoderKind::Json => Arc::new(JsonEncoder),
            EncoderKind::Yaml => Arc::new(YamlEncoder),
            EncoderKind::Xml => Arc::new(XmlEncoder),
            EncoderKind::Csv => Arc::new(CsvEncoder),
        }
    }
}

/// The default format → encoder map.
pub fn default_encoders() -> BTreeMap<String, Arc<dyn Encoder>> {
    [
        ("html", EncoderKind::Markup),
        ("js", EncoderKind::Script),
        ("json", EncoderKind::Json),
        ("yaml", EncoderKind::Yaml),
        ("xml", EncoderKind::Xml),
        ("csv", EncoderKind::Csv),
    ]
    .into_iter()
    .map(|(format, kind)| (format.to_string(), kind.build()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(encoder: &dyn Encoder, rendered: &Rendered) -> String {
        String::from_utf8(encoder.encode(rendered).unwrap()).unwrap()
    }

    #[test]
    fn test_json_encoder_compact() {
        let out = text(&JsonEncoder, &Rendered::Data(json!({"foo": "bar"})));
        assert_eq!(out, r#"{"foo":"bar"}"#);
    }

    #[test]
    fn test_json_encoder_safe_becomes_string() {
        let out = text(&JsonEncoder, &Rendered::safe("<p>\"x\"</p>"));
        assert_eq!(out, r#""<p>\"x\"</p>""#);
    }

    #[test]
    fn test_markup_encoder() {
        assert_eq!(text(&MarkupEncoder, &Rendered::safe("<b>ok</b>")), "<b>ok</b>");
        assert_eq!(
            text(&MarkupEncoder, &Rendered::Data(json!("<b>"))),
            "&lt;b&gt;"
        );
    }

    #[test]
    fn test_script_encoder_escapes_closing_tags() {
        let out = text(&ScriptEncoder, &Rendered::Data(json!({"s": "</script>"})));
        assert_eq!(out, r#"{"s":"<\/script>"}"#);
    }

    #[test]
    fn test_yaml_encoder() {
        let out = text(&YamlEncoder, &Rendered::Data(json!({"name": "test"})));
        assert!(out.contains("name: test"));
    }

    #[test]
    fn test_xml_encoder() {
        let out = text(&XmlEncoder, &Rendered::Data(json!({"name": "test"})));
        assert!(out.contains("<name>test</name>"));
        assert_eq!(text(&XmlEncoder, &Rendered::safe("<a/>")), "<a/>");
    }

    #[test]
    fn test_csv_encoder_rows() {
        let out = text(
            &CsvEncoder,
            &Rendered::Data(json!([{"name": "Alice", "age": 30}, {"name": "Bob", "age": 25}])),
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["age,name", "30,Alice", "25,Bob"]);
    }

    #[test]
    fn test_default_encoders_formats() {
        let formats: Vec<String> = default_encoders().into_keys().collect();
        assert_eq!(formats, vec!["csv", "html", "js", "json", "xml", "yaml"]);
    }

    #[test]
    fn test_encoder_kind_deserializes_lowercase() {
        let kind: EncoderKind = serde_yaml::from_str("markup").unwrap();
        assert_eq!(kind, EncoderKind::Markup);
    }
}
