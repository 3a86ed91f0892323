//! Runtime render API.
//!
//! A [`Renderer`] holds compiled [`View`]s by name together with the
//! [`Registry`] whose encoders finish output. It is immutable and `Send + Sync`;
//! render calls share nothing mutable and can run concurrently.
//!
//! # Entry points
//!
//! | Method | Result |
//! |--------|--------|
//! | [`render`](Renderer::render) | the template's [`Rendered`] value, wrapped in its layout if any |
//! | [`render_many`](Renderer::render_many) | one result per collection element, in order |
//! | [`render_one`](Renderer::render_one) | `None` for an absent resource |
//! | [`render_layout`](Renderer::render_layout) | renders with caller-supplied inner content |
//! | [`render_to_iodata`](Renderer::render_to_iodata) | bytes from the format's encoder, or the raw value |
//! | [`render_to_string`](Renderer::render_to_string) | the above flattened to a string |
//! | [`render_existing`](Renderer::render_existing) | like `render`, but a missing template yields no result |
//!
//! # Layouts
//!
//! A `layout` assign of `["App.LayoutView", "app.html"]` renders the requested
//! template first, binds the result as `inner_content`, then renders the layout
//! template with the same assigns. The inner result keeps its [`Rendered`] form,
//! so already-escaped markup is embedded without being escaped again.
//!
//! # Example
//!
//! ```rust,no_run
//! use standout_view::{Assigns, Renderer, RootConfig, View};
//!
//! let renderer = Renderer::builder()
//!     .view(View::builder("App.UserView").setup(RootConfig::new("templates"))?)?
//!     .view(View::builder("App.LayoutView").setup(RootConfig::new("templates"))?)?
//!     .build();
//!
//! let assigns = Assigns::new()
//!     .with("name", "Alice")
//!     .with_layout("App.LayoutView", "app.html");
//! let html = renderer.render_to_string("App.UserView", "index.html", assigns)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::assigns::{Assigns, Iodata, Rendered, TemplateRef, AS_KEY};
use crate::error::{ConfigError, RenderError};
use crate::registry::Registry;
use crate::view::{View, ViewBuilder};

/// Builder for a [`Renderer`].
#[derive(Debug, Default)]
pub struct RendererBuilder {
    registry: Option<Arc<Registry>>,
    views: BTreeMap<String, Arc<View>>,
}

impl RendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `registry` instead of the process-wide [`Registry::global`].
    ///
    /// Set this before adding views with [`view`](Self::view) so they compile
    /// against the same engines.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Compiles a view and adds it.
    ///
    /// # Errors
    ///
    /// Any compile error, or [`ConfigError::AlreadySetUp`] if a view with the same
    /// name was already added.
    pub fn view(mut self, builder: ViewBuilder) -> Result<Self, ConfigError> {
        let registry = self.registry.get_or_insert_with(Registry::global).clone();
        let view = builder.compile(&registry)?;
        self.insert(view)
    }

    /// Adds an already compiled view.
    pub fn insert(mut self, view: View) -> Result<Self, ConfigError> {
        if self.views.contains_key(view.name()) {
            return Err(ConfigError::AlreadySetUp {
                view: view.name().to_string(),
            });
        }
        self.views.insert(view.name().to_string(), Arc::new(view));
        Ok(self)
    }

    pub fn build(self) -> Renderer {
        Renderer {
            registry: self.registry.unwrap_or_else(Registry::global),
            views: self.views,
        }
    }
}

/// Renders templates of registered views.
#[derive(Debug, Clone)]
pub struct Renderer {
    registry: Arc<Registry>,
    views: BTreeMap<String, Arc<View>>,
}

impl Renderer {
    pub fn builder() -> RendererBuilder {
        RendererBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Looks up a registered view.
    pub fn view(&self, name: &str) -> Result<&View, RenderError> {
        self.views
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| RenderError::UnknownView {
                name: name.to_string(),
            })
    }

    /// Names of the registered views, sorted.
    pub fn view_names(&self) -> Vec<&str> {
        self.views.keys().map(String::as_str).collect()
    }

    /// Renders `template` of `view`.
    ///
    /// The reserved `layout` assign is removed first. When present, the inner
    /// result is bound as `inner_content` and the layout template is rendered.
    ///
    /// # Errors
    ///
    /// - [`RenderError::InvalidLayout`] if `layout` is not a `[view, template]` pair
    /// - [`RenderError::UnknownView`] if `view` or the layout view is not registered
    /// - [`RenderError::TemplateUndefined`] if the template doesn't exist
    pub fn render(
        &self,
        view: &str,
        template: &str,
        assigns: Assigns,
    ) -> Result<Rendered, RenderError> {
        match self.render_optional(view, template, assigns)? {
            Some(rendered) => Ok(rendered),
            None => Err(self.view(view)?.undefined(template)),
        }
    }

    /// Renders `template` once per element of `collection`, in order.
    ///
    /// Each element is bound under the view's resource name, or under the key
    /// named by the `as` assign when present.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use standout_view::{Assigns, Renderer};
    /// # fn demo(renderer: &Renderer) -> Result<(), standout_view::RenderError> {
    /// let users = vec![serde_json::json!({"name": "a"}), serde_json::json!({"name": "b"})];
    /// let rows = renderer.render_many(users, "App.UserView", "row.html", Assigns::new())?;
    /// assert_eq!(rows.len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn render_many<I>(
        &self,
        collection: I,
        view: &str,
        template: &str,
        assigns: Assigns,
    ) -> Result<Vec<Rendered>, RenderError>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let key = self.resource_key(view, &assigns)?;
        collection
            .into_iter()
            .map(|item| -> Result<Rendered, RenderError> {
                let mut item_assigns = assigns.clone();
                item_assigns.insert(key.clone(), serde_json::to_value(item)?);
                self.render(view, template, item_assigns)
            })
            .collect()
    }

    /// Renders `template` for a single resource; `None` renders nothing.
    pub fn render_one<T: Serialize>(
        &self,
        resource: Option<T>,
        view: &str,
        template: &str,
        assigns: Assigns,
    ) -> Result<Option<Rendered>, RenderError> {
        let Some(resource) = resource else {
            return Ok(None);
        };
        let mut rendered = self.render_many(std::iter::once(resource), view, template, assigns)?;
        Ok(rendered.pop())
    }

    /// Renders `template` with `inner_content` bound to an already rendered value.
    ///
    /// Used to nest layouts from inside a render clause or hook.
    pub fn render_layout(
        &self,
        view: &str,
        template: &str,
        mut assigns: Assigns,
        inner_content: Rendered,
    ) -> Result<Rendered, RenderError> {
        assigns.set_inner_content(inner_content);
        self.render(view, template, assigns)
    }

    /// Renders, then encodes with the encoder for `template`'s output format.
    ///
    /// Without a registered encoder the rendered value is returned as
    /// [`Iodata::Raw`].
    pub fn render_to_iodata(
        &self,
        view: &str,
        template: &str,
        assigns: Assigns,
    ) -> Result<Iodata, RenderError> {
        let rendered = self.render(view, template, assigns)?;
        match self.registry.encoder(template) {
            Some(encoder) => Ok(Iodata::Encoded(encoder.encode(&rendered)?)),
            None => Ok(Iodata::Raw(rendered)),
        }
    }

    /// [`render_to_iodata`](Self::render_to_iodata) flattened into a string.
    pub fn render_to_string(
        &self,
        view: &str,
        template: &str,
        assigns: Assigns,
    ) -> Result<String, RenderError> {
        self.render_to_iodata(view, template, assigns)?.into_string()
    }

    /// Like [`render`](Self::render), but a miss on `template` yields no result
    /// instead of running the view's not-found hook.
    ///
    /// With a layout the layout is still rendered, with `inner_content` unbound.
    /// `None` is returned only when there is no layout.
    #[deprecated(since = "7.6.0", note = "Use View::has_template and render instead")]
    pub fn render_existing(
        &self,
        view: &str,
        template: &str,
        mut assigns: Assigns,
    ) -> Result<Option<Rendered>, RenderError> {
        assigns.set_soft_request(TemplateRef::new(view, template));
        self.render_optional(view, template, assigns)
    }

    fn render_optional(
        &self,
        view: &str,
        template: &str,
        mut assigns: Assigns,
    ) -> Result<Option<Rendered>, RenderError> {
        let layout = assigns.pop_layout()?;
        let owner = self.view(view)?;

        let Some(layout) = layout else {
            return owner.dispatch(self, template, assigns);
        };

        let layout_view = self.view(&layout.view)?;
        let inner = owner.dispatch(self, template, assigns.clone())?;
        tracing::trace!(
            view,
            template,
            layout_view = %layout.view,
            layout = %layout.template,
            found = inner.is_some(),
            "rendering layout"
        );
        match inner {
            Some(inner) => assigns.set_inner_content(inner),
            None => {
                assigns.take_inner_content();
            }
        }
        layout_view.dispatch(self, &layout.template, assigns)
    }

    fn resource_key(&self, view: &str, assigns: &Assigns) -> Result<String, RenderError> {
        match assigns.get(AS_KEY) {
            None | Some(Value::Null) => Ok(self.view(view)?.resource_name().to_string()),
            Some(Value::String(key)) => Ok(key.clone()),
            Some(other) => Err(RenderError::InvalidAssigns {
                reason: format!("\"{}\" must be a string, got: {}", AS_KEY, other),
            }),
        }
    }
}
