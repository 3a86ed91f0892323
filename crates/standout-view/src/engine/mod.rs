//! Template engines: compile a source file into a callable render unit.
//!
//! A [`TemplateEngine`] is registered per source-file extension in the
//! [`Registry`](crate::Registry). During view compilation each discovered file is
//! handed to the engine for its extension, which returns a [`RenderUnit`]: a pure
//! function from [`Assigns`] to [`Rendered`] that can be called concurrently.
//!
//! | Extension | Engine | Output |
//! |-----------|--------|--------|
//! | `jinja`, `j2` | [`MiniJinjaEngine`] | [`Rendered::Safe`] |
//! | `tmpl` | [`SimpleEngine`] | [`Rendered::Safe`] |
//! | `yaml` | [`DataEngine`] | [`Rendered::Data`] |
//!
//! Engines never see other templates: each unit is compiled in isolation and
//! composition happens in the [`Renderer`](crate::Renderer) through layouts.

mod data;
mod jinja;
mod simple;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assigns::{Assigns, Rendered, INNER_CONTENT_KEY};
use crate::error::{EngineError, RenderError};

pub use data::DataEngine;
pub use jinja::{register_filters, MiniJinjaEngine};
pub use simple::SimpleEngine;

/// A compiled template: assigns in, rendered value out.
pub type RenderUnit = Arc<dyn Fn(&Assigns) -> Result<Rendered, RenderError> + Send + Sync>;

/// Compiles template sources into render units.
pub trait TemplateEngine: Send + Sync {
    /// Compiles template source text registered under `name`.
    ///
    /// `name` keeps the output-format extension (`user/index.html`), which engines
    /// may use to pick an escaping strategy.
    fn compile_str(&self, source: &str, name: &str) -> Result<RenderUnit, EngineError>;

    /// Reads `path` and compiles it under `name`.
    fn compile(&self, path: &Path, name: &str) -> Result<RenderUnit, EngineError> {
        let source = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.compile_str(&source, name)
    }
}

/// Built-in engines, as named in [`RegistrySettings`](crate::RegistrySettings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Jinja,
    Simple,
    Data,
}

impl EngineKind {
    pub fn build(self) -> Arc<dyn TemplateEngine> {
        match self {
            EngineKind::Jinja => Arc::new(MiniJinjaEngine::new()),
            EngineKind::Simple => Arc::new(SimpleEngine::new()),
            EngineKind::Data => Arc::new(DataEngine::new()),
        }
    }
}

/// The default extension → engine map.
pub fn default_engines() -> BTreeMap<String, Arc<dyn TemplateEngine>> {
    let jinja: Arc<dyn TemplateEngine> = Arc::new(MiniJinjaEngine::new());
    let mut engines = BTreeMap::new();
    engines.insert("jinja".to_string(), jinja.clone());
    engines.insert("j2".to_string(), jinja);
    engines.insert("tmpl".to_string(), EngineKind::Simple.build());
    engines.insert("yaml".to_string(), EngineKind::Data.build());
    engines
}

/// What a dotted path in a template resolves to.
pub(crate) enum Resolved<'a> {
    /// Pre-rendered markup; must not be escaped again.
    Safe(&'a str),
    Value(&'a Value),
}

/// Resolves `user.name`, `items.0` or `inner_content` against assigns.
pub(crate) fn resolve<'a>(assigns: &'a Assigns, path: &str) -> Option<Resolved<'a>> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    if head == INNER_CONTENT_KEY {
        if let Some(inner) = assigns.inner_content() {
            return match (inner, rest) {
                (Rendered::Safe(s), None) => Some(Resolved::Safe(s)),
                (Rendered::Safe(_), Some(_)) => None,
                (Rendered::Data(v), None) => Some(Resolved::Value(v)),
                (Rendered::Data(v), Some(rest)) => resolve_path(v, rest).map(Resolved::Value),
            };
        }
    }

    let value = assigns.get(head)?;
    match rest {
        None => Some(Resolved::Value(value)),
        Some(rest) => resolve_path(value, rest).map(Resolved::Value),
    }
}

/// Resolves a dotted path in a JSON value.
///
/// Supports nested objects (`profile.name`) and array indices (`items.0`).
fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Formats a JSON value for text output: strings unquoted, null empty.
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
