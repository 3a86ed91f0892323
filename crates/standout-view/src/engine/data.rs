//! Data templates: YAML documents rendered to structured values.
//!
//! A data template describes the shape of a response instead of its text. The
//! YAML is parsed when the view compiles; at render time string leaves are
//! filled from assigns:
//!
//! - a leaf that is exactly one placeholder (`"{user}"`) is replaced by the
//!   assign's value with its type intact, or `null` when it doesn't resolve
//! - any other string is interpolated like a [`SimpleEngine`](super::SimpleEngine)
//!   template, without escaping
//!
//! Unlike text templates, a stray `{` that opens no placeholder is plain text,
//! so `note: "{ draft"` is a literal value.
//!
//! Mapping keys are never interpolated. The result is [`Rendered::Data`], which
//! the registry's encoder for the template's format (`show.json` → JSON) turns
//! into bytes.
//!
//! ```yaml
//! # show.json.yaml
//! id: "{user.id}"
//! label: "User #{user.id}"
//! tags: "{user.tags}"
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use super::simple::{parse_lenient, render_segments, Segment};
use super::{resolve, RenderUnit, Resolved, TemplateEngine};
use crate::assigns::{Assigns, Rendered};
use crate::error::{EngineError, RenderError};

/// Template engine for YAML data templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataEngine;

impl DataEngine {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for DataEngine {
    fn compile_str(&self, source: &str, name: &str) -> Result<RenderUnit, EngineError> {
        let document: Value = if source.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(source).map_err(|e| EngineError::Syntax {
                name: name.to_string(),
                message: e.to_string(),
            })?
        };
        let node = Node::build(document);

        Ok(Arc::new(move |assigns: &Assigns| -> Result<Rendered, RenderError> {
            Ok(Rendered::Data(node.render(assigns)))
        }))
    }
}

/// A compiled data template.
#[derive(Debug)]
enum Node {
    Static(Value),
    Placeholder(String),
    Text(Vec<Segment>),
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
}

impl Node {
    fn build(value: Value) -> Node {
        match value {
            Value::String(s) => {
                let segments = parse_lenient(&s);
                if let [Segment::Var { path, .. }] = segments.as_slice() {
                    return Node::Placeholder(path.clone());
                }
                if segments.iter().any(|s| matches!(s, Segment::Var { .. })) {
                    Node::Text(segments)
                } else {
                    // Only literal text, possibly with escaped braces
                    Node::Static(Value::String(render_literal(&segments)))
                }
            }
            Value::Array(items) => Node::Array(items.into_iter().map(Node::build).collect()),
            Value::Object(map) => Node::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Node::build(value)))
                    .collect(),
            ),
            other => Node::Static(other),
        }
    }

    fn render(&self, assigns: &Assigns) -> Value {
        match self {
            Node::Static(value) => value.clone(),
            Node::Placeholder(path) => match resolve(assigns, path) {
                Some(Resolved::Safe(markup)) => Value::String(markup.to_string()),
                Some(Resolved::Value(value)) => value.clone(),
                None => Value::Null,
            },
            Node::Text(segments) => Value::String(render_segments(segments, assigns, false)),
            Node::Array(items) => Value::Array(items.iter().map(|n| n.render(assigns)).collect()),
            Node::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, node)| (key.clone(), node.render(assigns)))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

fn render_literal(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter_map(|s| match s {
            Segment::Literal(text) => Some(text.as_str()),
            Segment::Var { .. } => None,
        })
        .collect()
}
