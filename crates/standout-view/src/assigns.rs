//! Render-time data: assigns, rendered values and encoded output.
//!
//! [`Assigns`] is the map handed to every render unit. Besides user data it
//! carries two typed slots that the render pipeline manages:
//!
//! - the inner content of a layout, bound by [`Renderer::render`](crate::Renderer::render)
//!   or [`Renderer::render_layout`](crate::Renderer::render_layout) and exposed to
//!   templates as `inner_content`
//! - the not-found guard, the [`TemplateRef`]s that already went through their
//!   view's not-found hook
//! - the soft request tag set by [`Renderer::render_existing`](crate::Renderer::render_existing),
//!   naming the one `(view, template)` whose miss yields no result
//!
//! These travel with the assigns, so a not-found hook that renders again with the
//! assigns it was given hits the guard instead of recursing.
//!
//! Three keys in the data map are reserved: `layout` (popped before rendering),
//! `inner_content` and `as` (the resource key override used by collection helpers).

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::util::is_module_name;

/// Reserved assign holding the layout `[view, template]` pair.
pub const LAYOUT_KEY: &str = "layout";

/// Name under which a layout sees the inner template's rendered result.
pub const INNER_CONTENT_KEY: &str = "inner_content";

/// Reserved assign overriding the resource key in collection helpers.
pub const AS_KEY: &str = "as";

/// The value produced by a render unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Markup or text already escaped for its output format.
    ///
    /// Embedding it in another template must not escape it again.
    Safe(String),

    /// Structured data, as produced by data templates.
    Data(Value),
}

impl Rendered {
    /// Creates a safe rendered value.
    pub fn safe(content: impl Into<String>) -> Self {
        Rendered::Safe(content.into())
    }

    /// Returns the safe content, if this is markup.
    pub fn as_safe(&self) -> Option<&str> {
        match self {
            Rendered::Safe(s) => Some(s),
            Rendered::Data(_) => None,
        }
    }

    /// Returns the structured value, if this is data.
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Rendered::Safe(_) => None,
            Rendered::Data(v) => Some(v),
        }
    }

    /// Converts to a JSON value: safe content becomes a string.
    pub fn to_json(&self) -> Value {
        match self {
            Rendered::Safe(s) => Value::String(s.clone()),
            Rendered::Data(v) => v.clone(),
        }
    }

    /// Stringifies the value without any encoding.
    ///
    /// Safe content and string data are returned as-is; other data is JSON text.
    pub fn into_text(self) -> String {
        match self {
            Rendered::Safe(s) | Rendered::Data(Value::String(s)) => s,
            Rendered::Data(v) => v.to_string(),
        }
    }
}

/// Result of [`Renderer::render_to_iodata`](crate::Renderer::render_to_iodata).
#[derive(Debug, Clone, PartialEq)]
pub enum Iodata {
    /// Bytes produced by the template format's encoder.
    Encoded(Vec<u8>),

    /// The rendered value, passed through because no encoder is registered.
    Raw(Rendered),
}

impl Iodata {
    /// Flattens into a single string.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Utf8`] if encoded bytes are not valid UTF-8.
    pub fn into_string(self) -> Result<String, RenderError> {
        match self {
            Iodata::Encoded(bytes) => Ok(String::from_utf8(bytes)?),
            Iodata::Raw(rendered) => Ok(rendered.into_text()),
        }
    }
}

/// A `(view, template)` pair, as used for layouts and the not-found guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateRef {
    /// Module-like view name, e.g. `App.LayoutView`.
    pub view: String,
    /// Template name within that view, e.g. `app.html`.
    pub template: String,
}

impl TemplateRef {
    pub fn new(view: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            template: template.into(),
        }
    }

    /// Parses a layout assign.
    ///
    /// `null` and `false` mean "no layout". A two-element array of a module-like
    /// view name and a template name is a layout. Anything else is invalid.
    pub fn from_layout_value(value: &Value) -> Result<Option<Self>, RenderError> {
        match value {
            Value::Null | Value::Bool(false) => Ok(None),
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(view), Value::String(template)] if is_module_name(view) => {
                    Ok(Some(TemplateRef::new(view.as_str(), template.as_str())))
                }
                _ => Err(invalid_layout(value)),
            },
            _ => Err(invalid_layout(value)),
        }
    }
}

fn invalid_layout(value: &Value) -> RenderError {
    RenderError::InvalidLayout {
        value: value.to_string(),
    }
}

/// The data passed into a template at render time.
///
/// # Example
///
/// ```rust
/// use standout_view::Assigns;
/// use serde_json::json;
///
/// let assigns = Assigns::new()
///     .with("name", "Alice")
///     .with("tags", json!(["admin", "ops"]))
///     .with_layout("App.LayoutView", "app.html");
///
/// assert_eq!(assigns.get("name"), Some(&json!("Alice")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assigns {
    values: Map<String, Value>,
    inner_content: Option<Rendered>,
    not_found: Vec<TemplateRef>,
    soft_request: Option<TemplateRef>,
}

impl Assigns {
    /// Creates empty assigns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `data` into assigns.
    ///
    /// # Errors
    ///
    /// Fails if `data` does not serialize to a map (or unit/null).
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, RenderError> {
        Self::try_from(serde_json::to_value(data)?)
    }

    /// Adds a value, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets the reserved `layout` assign to `[view, template]`.
    pub fn with_layout(self, view: impl Into<String>, template: impl Into<String>) -> Self {
        let pair = Value::Array(vec![
            Value::String(view.into()),
            Value::String(template.into()),
        ]);
        self.with(LAYOUT_KEY, pair)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The user data, without the managed slots.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The layout's inner content, if bound.
    pub fn inner_content(&self) -> Option<&Rendered> {
        self.inner_content.as_ref()
    }

    /// Binds a rendered payload as inner content.
    pub fn set_inner_content(&mut self, content: Rendered) {
        self.inner_content = Some(content);
    }

    /// Unbinds the inner content.
    pub fn take_inner_content(&mut self) -> Option<Rendered> {
        self.inner_content.take()
    }

    /// Removes the reserved `layout` assign and parses it.
    pub fn pop_layout(&mut self) -> Result<Option<TemplateRef>, RenderError> {
        match self.values.remove(LAYOUT_KEY) {
            Some(value) => TemplateRef::from_layout_value(&value),
            None => Ok(None),
        }
    }

    /// The `(view, template)` pairs that already reached a not-found hook.
    pub fn not_found_guards(&self) -> &[TemplateRef] {
        &self.not_found
    }

    /// Records `guard`; returns false if it was already recorded.
    pub(crate) fn push_not_found_guard(&mut self, guard: TemplateRef) -> bool {
        if self.not_found.contains(&guard) {
            return false;
        }
        self.not_found.push(guard);
        true
    }

    /// The `(view, template)` a soft request was made for.
    pub fn soft_request(&self) -> Option<&TemplateRef> {
        self.soft_request.as_ref()
    }

    pub(crate) fn set_soft_request(&mut self, request: TemplateRef) {
        self.soft_request = Some(request);
    }

    /// The assigns as one JSON object, with `inner_content` merged in.
    ///
    /// Data-oriented engines consume this form.
    pub fn to_json(&self) -> Value {
        let mut map = self.values.clone();
        if let Some(inner) = &self.inner_content {
            map.insert(INNER_CONTENT_KEY.to_string(), inner.to_json());
        }
        Value::Object(map)
    }
}

impl TryFrom<Value> for Assigns {
    type Error = RenderError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(values) => Ok(Self::from(values)),
            Value::Null => Ok(Self::new()),
            other => Err(RenderError::InvalidAssigns {
                reason: format!("expected a map, got: {}", other),
            }),
        }
    }
}

impl From<Map<String, Value>> for Assigns {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Assigns {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut assigns = Self::new();
        for (k, v) in iter {
            assigns.insert(k, v);
        }
        assigns
    }
}
