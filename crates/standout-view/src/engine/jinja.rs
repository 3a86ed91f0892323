//! MiniJinja-backed template engine.
//!
//! Each template file is compiled into its own MiniJinja environment, so units
//! are self-contained and can be shared across threads. Escaping follows the
//! template name's output format (MiniJinja's default auto-escape callback):
//! `index.html` escapes HTML, `notes.txt` does not.
//!
//! The layout's inner content is passed in as a safe string, so
//! `{{ inner_content }}` embeds already-escaped markup verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use minijinja::{Environment, Value};

use super::{RenderUnit, TemplateEngine};
use crate::assigns::{Assigns, Rendered, INNER_CONTENT_KEY};
use crate::error::{EngineError, RenderError};

type Configure = Arc<dyn Fn(&mut Environment<'static>) + Send + Sync>;

/// MiniJinja-based template engine.
///
/// Provides full template functionality:
/// - Jinja2-compatible syntax
/// - Loops, conditionals, macros
/// - Filters, including the `nl` filter registered by [`register_filters`]
///
/// # Example
///
/// ```rust
/// use standout_view::{Assigns, MiniJinjaEngine, Rendered, TemplateEngine};
///
/// let engine = MiniJinjaEngine::new();
/// let unit = engine.compile_str("<h1>{{ name }}</h1>", "title.html").unwrap();
///
/// let out = unit(&Assigns::new().with("name", "Tom & Jerry")).unwrap();
/// assert_eq!(out, Rendered::safe("<h1>Tom &amp; Jerry</h1>"));
/// ```
#[derive(Clone, Default)]
pub struct MiniJinjaEngine {
    configure: Option<Configure>,
}

impl MiniJinjaEngine {
    /// Creates a new MiniJinja engine with default filters registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `configure` on every environment this engine creates.
    ///
    /// This allows registering custom filters, functions or globals.
    pub fn with_environment<F>(configure: F) -> Self
    where
        F: Fn(&mut Environment<'static>) + Send + Sync + 'static,
    {
        Self {
            configure: Some(Arc::new(configure)),
        }
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        register_filters(&mut env);
        if let Some(configure) = &self.configure {
            configure(&mut env);
        }
        env
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn compile_str(&self, source: &str, name: &str) -> Result<RenderUnit, EngineError> {
        let mut env = self.environment();
        env.add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| EngineError::Syntax {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let env = Arc::new(env);
        let name = name.to_string();
        Ok(Arc::new(move |assigns: &Assigns| -> Result<Rendered, RenderError> {
            let tmpl = env.get_template(&name)?;
            let output = tmpl.render(context(assigns))?;
            Ok(Rendered::Safe(output))
        }))
    }
}

/// Builds the template context from assigns.
fn context(assigns: &Assigns) -> HashMap<String, Value> {
    let mut ctx: HashMap<String, Value> = assigns
        .values()
        .iter()
        .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
        .collect();

    if let Some(inner) = assigns.inner_content() {
        let value = match inner {
            Rendered::Safe(markup) => Value::from_safe_string(markup.clone()),
            Rendered::Data(data) => Value::from_serialize(data),
        };
        ctx.insert(INNER_CONTENT_KEY.to_string(), value);
    }
    ctx
}

/// Registers the engine's filters with a MiniJinja environment.
///
/// Called automatically for every environment [`MiniJinjaEngine`] creates.
pub fn register_filters(env: &mut Environment<'static>) {
    // Usage: {{ content | nl }} outputs content followed by \n
    env.add_filter("nl", |value: Value| -> String { format!("{}\n", value) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minijinja_engine_simple() {
        let unit = MiniJinjaEngine::new()
            .compile_str("Hello, {{ name }}!", "greeting.txt")
            .unwrap();
        let out = unit(&Assigns::new().with("name", "World")).unwrap();
        assert_eq!(out, Rendered::safe("Hello, World!"));
    }

    #[test]
    fn test_minijinja_engine_with_loop() {
        let unit = MiniJinjaEngine::new()
            .compile_str("{% for item in items %}{{ item }},{% endfor %}", "list.txt")
            .unwrap();
        let out = unit(&Assigns::new().with("items", json!(["a", "b", "c"]))).unwrap();
        assert_eq!(out, Rendered::safe("a,b,c,"));
    }

    #[test]
    fn test_minijinja_engine_escapes_html_templates() {
        let unit = MiniJinjaEngine::new()
            .compile_str("<p>{{ body }}</p>", "page.html")
            .unwrap();
        let out = unit(&Assigns::new().with("body", "<script>")).unwrap();
        assert_eq!(out, Rendered::safe("<p>&lt;script&gt;</p>"));
    }

    #[test]
    fn test_minijinja_engine_does_not_escape_text_templates() {
        let unit = MiniJinjaEngine::new()
            .compile_str("{{ body }}", "page.txt")
            .unwrap();
        let out = unit(&Assigns::new().with("body", "<b>")).unwrap();
        assert_eq!(out, Rendered::safe("<b>"));
    }

    #[test]
    fn test_minijinja_engine_inner_content_is_not_escaped_again() {
        let unit = MiniJinjaEngine::new()
            .compile_str("<main>{{ inner_content }}</main>", "app.html")
            .unwrap();
        let mut assigns = Assigns::new();
        assigns.set_inner_content(Rendered::safe("<p>&lt;hi&gt;</p>"));
        let out = unit(&assigns).unwrap();
        assert_eq!(out, Rendered::safe("<main><p>&lt;hi&gt;</p></main>"));
    }

    #[test]
    fn test_minijinja_engine_syntax_error_at_compile() {
        let result = MiniJinjaEngine::new().compile_str("{{ unclosed", "bad.html");
        assert!(matches!(result, Err(EngineError::Syntax { name, .. }) if name == "bad.html"));
    }

    #[test]
    fn test_minijinja_engine_nl_filter() {
        let unit = MiniJinjaEngine::new()
            .compile_str("{{ a | nl }}{{ b }}", "x.txt")
            .unwrap();
        let out = unit(&Assigns::new().with("a", "1").with("b", "2")).unwrap();
        assert_eq!(out, Rendered::safe("1\n2"));
    }

    #[test]
    fn test_minijinja_engine_custom_environment() {
        let engine = MiniJinjaEngine::with_environment(|env| {
            env.add_global("site", "Example");
        });
        let unit = engine.compile_str("{{ site }}", "x.txt").unwrap();
        assert_eq!(unit(&Assigns::new()).unwrap(), Rendered::safe("Example"));
    }

    #[test]
    fn test_minijinja_engine_unit_is_shareable_across_threads() {
        let unit = MiniJinjaEngine::new()
            .compile_str("{{ n }}", "n.txt")
            .unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let unit = unit.clone();
                std::thread::spawn(move || unit(&Assigns::new().with("n", i)).unwrap())
            })
            .collect();
        let outputs: Vec<Rendered> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(outputs[3], Rendered::safe("3"));
    }
}
