//! Simple template engine using format-string style substitution.
//!
//! [`SimpleEngine`] is a lightweight engine that uses `{variable}` syntax for
//! substitution. It suits templates that don't need loops, conditionals or filters.
//!
//! # Syntax
//!
//! - `{name}` - Simple variable substitution
//! - `{user.name}` - Nested property access via dot notation
//! - `{items.0}` - Array index access
//! - `{inner_content}` - The layout's inner content, inserted verbatim
//! - `{{` and `}}` - Escaped braces (renders as `{` and `}`)
//!
//! Values are HTML-escaped when the template name's format is `html`, `htm` or
//! `xml`. A variable that doesn't resolve is left in place as written.
//!
//! Sources are parsed once at compile time, so an unclosed `{` or an empty
//! `{}` is reported when the view compiles, not when it renders.
//!
//! # Example
//!
//! ```rust
//! use standout_view::{Assigns, Rendered, SimpleEngine, TemplateEngine};
//! use serde_json::json;
//!
//! let unit = SimpleEngine::new()
//!     .compile_str("Hello, {name}! Contact: {user.email}", "card.txt")
//!     .unwrap();
//!
//! let assigns = Assigns::new()
//!     .with("name", "World")
//!     .with("user", json!({"email": "test@example.com"}));
//!
//! assert_eq!(
//!     unit(&assigns).unwrap(),
//!     Rendered::safe("Hello, World! Contact: test@example.com")
//! );
//! ```

use std::sync::Arc;

use super::{format_value, resolve, RenderUnit, Resolved, TemplateEngine};
use crate::assigns::{Assigns, Rendered};
use crate::error::{EngineError, RenderError};
use crate::util::{escape_html, is_markup_format};

/// A lightweight template engine using format-string style substitution.
///
/// `SimpleEngine` is stateless and `Send + Sync`; the units it produces can be
/// shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleEngine;

impl SimpleEngine {
    /// Creates a new SimpleEngine.
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for SimpleEngine {
    fn compile_str(&self, source: &str, name: &str) -> Result<RenderUnit, EngineError> {
        let segments = parse(source).map_err(|message| EngineError::Syntax {
            name: name.to_string(),
            message,
        })?;
        let escape = is_markup_format(name);

        Ok(Arc::new(move |assigns: &Assigns| -> Result<Rendered, RenderError> {
            Ok(Rendered::Safe(render_segments(&segments, assigns, escape)))
        }))
    }
}

/// A parsed piece of a `{var}` template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Literal(String),
    /// `path` is trimmed; `raw` is the text between the braces as written.
    Var { path: String, raw: String },
}

/// Splits a template into literals and variable references.
pub(crate) fn parse(template: &str) -> Result<Vec<Segment>, String> {
    parse_with(template, false)
}

/// Like [`parse`], but an unclosed `{` or an empty `{}` is kept as text.
pub(crate) fn parse_lenient(template: &str) -> Vec<Segment> {
    // Lenient parsing has no error paths
    parse_with(template, true).unwrap_or_default()
}

fn parse_with(template: &str, lenient: bool) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                // Escaped brace: {{ -> {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let mut raw = String::new();
                let mut found_close = false;

                for inner_ch in chars.by_ref() {
                    if inner_ch == '}' {
                        found_close = true;
                        break;
                    }
                    raw.push(inner_ch);
                }

                if !found_close {
                    if lenient {
                        literal.push('{');
                        literal.push_str(&raw);
                        continue;
                    }
                    return Err(format!("Unclosed variable substitution: {{{}", raw));
                }

                let path = raw.trim();
                if path.is_empty() {
                    if lenient {
                        literal.push('{');
                        literal.push_str(&raw);
                        literal.push('}');
                        continue;
                    }
                    return Err("Empty variable name in template".to_string());
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Var {
                    path: path.to_string(),
                    raw: raw.clone(),
                });
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            // A stray closing brace is kept as text.
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Renders parsed segments against assigns.
pub(crate) fn render_segments(segments: &[Segment], assigns: &Assigns, escape: bool) -> String {
    let mut result = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => result.push_str(text),
            Segment::Var { path, raw } => match resolve(assigns, path) {
                Some(Resolved::Safe(markup)) => result.push_str(markup),
                Some(Resolved::Value(value)) if escape => {
                    result.push_str(&escape_html(&format_value(value)))
                }
                Some(Resolved::Value(value)) => result.push_str(&format_value(value)),
                // Left in place, as written, for debugging
                None => {
                    result.push('{');
                    result.push_str(raw);
                    result.push('}');
                }
            },
        }
    }
    result
}
