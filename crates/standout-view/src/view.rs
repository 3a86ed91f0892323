//! Views: compiled, per-owner template dispatch tables.
//!
//! A [`View`] owns every template discovered under its lookup root. It is built
//! once by [`ViewBuilder::compile`] and never changes afterwards:
//!
//! 1. The lookup root is resolved from the view's [`RootConfig`].
//! 2. Discovery finds `root/pattern.{engine extensions}`.
//! 3. Each file is compiled by the engine registered for its extension and bound
//!    under its template name (`user/index.html.jinja` → `user/index.html`).
//!
//! # Dispatch
//!
//! Rendering a name tries, in order:
//!
//! 1. a render clause declared with [`ViewBuilder::render_clause`]
//! 2. the compiled template
//! 3. the not-found hook, at most once per `(view, template)` for a given set of
//!    assigns; a second miss fails with [`RenderError::TemplateUndefined`]
//!
//! A miss on the name tagged by a soft request
//! ([`Renderer::render_existing`](crate::Renderer::render_existing)) yields no
//! result and skips the hook.
//!
//! The default not-found hook fails with [`RenderError::TemplateUndefined`],
//! listing the lookup root, pattern and compiled names.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assigns::{Assigns, Rendered, TemplateRef};
use crate::config::{resource_name, RootConfig, VIEW_SUFFIX};
use crate::discovery::{self, TemplateHash};
use crate::engine::RenderUnit;
use crate::error::{ConfigError, RenderError};
use crate::registry::Registry;
use crate::renderer::Renderer;
use crate::util::is_module_name;

/// An explicit render function for one template name.
///
/// Clauses take precedence over compiled templates of the same name.
pub type RenderClause =
    Arc<dyn Fn(&Renderer, &Assigns) -> Result<Rendered, RenderError> + Send + Sync>;

/// Called when a view has neither a clause nor a compiled template for a name.
///
/// The hook receives the assigns tagged with the missing `(view, template)`. If
/// it renders the same name again with those assigns, the render fails with
/// [`RenderError::TemplateUndefined`] instead of calling the hook again.
pub type NotFoundHook =
    Arc<dyn Fn(&Renderer, &str, Assigns) -> Result<Rendered, RenderError> + Send + Sync>;

/// Builder for a [`View`].
///
/// # Example
///
/// ```rust,no_run
/// use standout_view::{Registry, RootConfig, View};
///
/// let registry = Registry::new();
/// let view = View::builder("App.UserView")
///     .setup(RootConfig::new("templates"))?
///     .compile(&registry)?;
///
/// println!("{:?}", view.template_names());
/// # Ok::<(), standout_view::ConfigError>(())
/// ```
pub struct ViewBuilder {
    name: String,
    config: Option<RootConfig>,
    clauses: BTreeMap<String, RenderClause>,
    not_found: Option<NotFoundHook>,
    resource_name: Option<String>,
}

impl ViewBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
            clauses: BTreeMap::new(),
            not_found: None,
            resource_name: None,
        }
    }

    /// Sets the view's root configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::AlreadySetUp`] if the view was already set up.
    pub fn setup(mut self, config: RootConfig) -> Result<Self, ConfigError> {
        if self.config.is_some() {
            return Err(ConfigError::AlreadySetUp { view: self.name });
        }
        self.config = Some(config);
        Ok(self)
    }

    /// Declares an explicit render function for `template`.
    pub fn render_clause<F>(mut self, template: impl Into<String>, clause: F) -> Self
    where
        F: Fn(&Renderer, &Assigns) -> Result<Rendered, RenderError> + Send + Sync + 'static,
    {
        self.clauses.insert(template.into(), Arc::new(clause));
        self
    }

    /// Replaces the default not-found hook.
    pub fn not_found<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Renderer, &str, Assigns) -> Result<Rendered, RenderError> + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(hook));
        self
    }

    /// Overrides the resource key used by collection helpers.
    pub fn resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    /// Discovers and compiles the view's templates.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidViewName`] if the name is not module-like
    /// - [`ConfigError::MissingRoot`] if no root is configured
    /// - [`ConfigError::InvalidSettings`] if the pattern is not a valid glob
    /// - [`ConfigError::Collision`] if two files map to one template name
    /// - [`ConfigError::Compile`] if an engine rejects a template
    pub fn compile(self, registry: &Registry) -> Result<View, ConfigError> {
        if !is_module_name(&self.name) {
            return Err(ConfigError::InvalidViewName { name: self.name });
        }
        let config = self.config.ok_or_else(|| ConfigError::MissingRoot {
            view: self.name.clone(),
        })?;
        let root = config.lookup_root(&self.name)?;
        let extensions = registry.engine_extensions();

        if !extensions.is_empty() {
            discovery::matcher(&config.pattern, &extensions).map_err(|e| {
                ConfigError::InvalidSettings(format!(
                    "invalid pattern {:?} for {}: {}",
                    config.pattern, self.name, e
                ))
            })?;
        }

        let files = discovery::find_all(&root, &config.pattern, &extensions);
        let mut sources: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut templates: BTreeMap<String, RenderUnit> = BTreeMap::new();

        for path in &files {
            let name = discovery::template_path_to_name(path, &root);
            if let Some(existing) = sources.get(&name) {
                return Err(ConfigError::Collision {
                    view: self.name,
                    name,
                    existing: existing.clone(),
                    conflicting: path.clone(),
                });
            }

            let extension = discovery::engine_extension(path).unwrap_or_default();
            let engine = registry
                .engine(extension)
                .ok_or_else(|| ConfigError::UnknownEngine {
                    extension: extension.to_string(),
                })?;
            let unit = engine
                .compile(path, &name)
                .map_err(|source| ConfigError::Compile {
                    path: path.clone(),
                    source,
                })?;

            tracing::debug!(
                view = %self.name,
                template = %name,
                engine = extension,
                path = %path.display(),
                "compiled template"
            );
            sources.insert(name.clone(), path.clone());
            templates.insert(name, unit);
        }

        let hash = discovery::digest_paths(files);
        tracing::info!(
            view = %self.name,
            root = %root.display(),
            templates = templates.len(),
            %hash,
            "compiled view"
        );

        let resource_name = self
            .resource_name
            .unwrap_or_else(|| resource_name(&self.name, VIEW_SUFFIX));

        Ok(View {
            name: self.name,
            root,
            pattern: config.pattern,
            extensions,
            templates,
            clauses: self.clauses,
            not_found: self.not_found,
            resource_name,
            hash,
        })
    }
}

/// A compiled view: an immutable dispatch table plus its hooks.
pub struct View {
    name: String,
    root: PathBuf,
    pattern: String,
    extensions: Vec<String>,
    templates: BTreeMap<String, RenderUnit>,
    clauses: BTreeMap<String, RenderClause>,
    not_found: Option<NotFoundHook>,
    resource_name: String,
    hash: TemplateHash,
}

impl View {
    pub fn builder(name: impl Into<String>) -> ViewBuilder {
        ViewBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved lookup root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Names of the compiled templates, sorted.
    pub fn template_names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    /// The key a single resource is bound under by collection helpers.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// True if a clause or a compiled template exists for `template`.
    pub fn has_template(&self, template: &str) -> bool {
        self.clauses.contains_key(template) || self.templates.contains_key(template)
    }

    /// Digest of the template paths this view was compiled from.
    pub fn hash(&self) -> TemplateHash {
        self.hash
    }

    /// True if the set of matching files has changed since compilation.
    ///
    /// Only additions and removals are detected; edits to an existing template
    /// do not change the hash.
    pub fn needs_recompile(&self) -> bool {
        discovery::hash(&self.root, &self.pattern, &self.extensions) != self.hash
    }

    /// Renders `template` without layout handling.
    ///
    /// `Ok(None)` is the no-result value of a soft request that missed.
    pub(crate) fn dispatch(
        &self,
        renderer: &Renderer,
        template: &str,
        assigns: Assigns,
    ) -> Result<Option<Rendered>, RenderError> {
        if let Some(clause) = self.clauses.get(template) {
            tracing::trace!(view = %self.name, template, "dispatch: render clause");
            return clause(renderer, &assigns).map(Some);
        }
        if let Some(unit) = self.templates.get(template) {
            tracing::trace!(view = %self.name, template, "dispatch: compiled template");
            return unit(&assigns).map(Some);
        }
        self.fallback(renderer, template, assigns)
    }

    fn fallback(
        &self,
        renderer: &Renderer,
        template: &str,
        mut assigns: Assigns,
    ) -> Result<Option<Rendered>, RenderError> {
        let missing = TemplateRef::new(self.name.as_str(), template);
        if assigns.soft_request() == Some(&missing) {
            tracing::trace!(view = %self.name, template, "dispatch: soft miss");
            return Ok(None);
        }
        if !assigns.push_not_found_guard(missing) {
            tracing::trace!(view = %self.name, template, "dispatch: not-found guard hit");
            return Err(self.undefined(template));
        }

        tracing::trace!(view = %self.name, template, "dispatch: not-found hook");
        match &self.not_found {
            Some(hook) => hook(renderer, template, assigns).map(Some),
            None => Err(self.undefined(template)),
        }
    }

    pub(crate) fn undefined(&self, template: &str) -> RenderError {
        RenderError::TemplateUndefined {
            view: self.name.clone(),
            template: template.to_string(),
            root: self.root.clone(),
            pattern: self.pattern.clone(),
            available: self.templates.keys().cloned().collect(),
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("pattern", &self.pattern)
            .field("templates", &self.template_names())
            .field("clauses", &self.clauses.keys().collect::<Vec<_>>())
            .field("resource_name", &self.resource_name)
            .field("hash", &self.hash)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    fn renderer_with(view: View) -> Renderer {
        Renderer::builder()
            .registry(Arc::new(Registry::new()))
            .insert(view)
            .unwrap()
            .build()
    }

    #[test]
    fn test_compile_binds_discovered_templates() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "user/index.html.jinja", "<p>{{ name }}</p>");
        create_file(temp_dir.path(), "user/show.json.yaml", "name: \"{name}\"");
        create_file(temp_dir.path(), "user/notes.md", "ignored");

        let view = View::builder("App.UserView")
            .setup(RootConfig::new(temp_dir.path()))
            .unwrap()
            .compile(&Registry::new())
            .unwrap();

        assert_eq!(view.root(), temp_dir.path().join("user"));
        assert_eq!(view.pattern(), "*");
        assert_eq!(view.template_names(), vec!["index.html", "show.json"]);
        assert_eq!(view.resource_name(), "user");
    }

    #[test]
    fn test_compile_without_root_fails() {
        let err = View::builder("App.UserView")
            .compile(&Registry::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRoot { view } if view == "App.UserView"));
    }

    #[test]
    fn test_setup_twice_fails() {
        let result = View::builder("App.UserView")
            .setup(RootConfig::new("a"))
            .unwrap()
            .setup(RootConfig::new("b"));
        assert!(matches!(result, Err(ConfigError::AlreadySetUp { .. })));
    }

    #[test]
    fn test_invalid_view_name() {
        let err = View::builder("user_view")
            .setup(RootConfig::new("t"))
            .unwrap()
            .compile(&Registry::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidViewName { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let err = View::builder("App.UserView")
            .setup(RootConfig::new(temp_dir.path()).with_pattern("[*"))
            .unwrap()
            .compile(&Registry::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings(_)));
    }

    #[test]
    fn test_collision_fails_build() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "index.html.jinja", "a");
        create_file(temp_dir.path(), "index.html.tmpl", "b");

        let err = View::builder("App.PageView")
            .setup(RootConfig::new(temp_dir.path()).with_path(""))
            .unwrap()
            .compile(&Registry::new())
            .unwrap_err();
        match err {
            ConfigError::Collision {
                name,
                existing,
                conflicting,
                ..
            } => {
                assert_eq!(name, "index.html");
                assert!(existing.ends_with("index.html.jinja"));
                assert!(conflicting.ends_with("index.html.tmpl"));
            }
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "broken.html.jinja", "{% if %}");

        let err = View::builder("App.PageView")
            .setup(RootConfig::new(temp_dir.path()).with_path(""))
            .unwrap()
            .compile(&Registry::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Compile { path, .. } if path.ends_with("broken.html.jinja")));
    }

    #[test]
    fn test_clause_takes_precedence() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "index.html.jinja", "compiled");

        let view = View::builder("App.PageView")
            .setup(RootConfig::new(temp_dir.path()).with_path(""))
            .unwrap()
            .render_clause("index.html", |_, _| Ok(Rendered::safe("clause")))
            .compile(&Registry::new())
            .unwrap();
        assert!(view.has_template("index.html"));

        let renderer = renderer_with(view);
        let out = renderer.render("App.PageView", "index.html", Assigns::new());
        assert_eq!(out.unwrap(), Rendered::safe("clause"));
    }

    #[test]
    fn test_default_not_found_lists_compiled_names() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "index.html.jinja", "x");

        let view = View::builder("App.PageView")
            .setup(RootConfig::new(temp_dir.path()).with_path(""))
            .unwrap()
            .compile(&Registry::new())
            .unwrap();
        let renderer = renderer_with(view);

        match renderer.render("App.PageView", "missing.html", Assigns::new()) {
            Err(RenderError::TemplateUndefined {
                template,
                root,
                pattern,
                available,
                ..
            }) => {
                assert_eq!(template, "missing.html");
                assert_eq!(root, temp_dir.path());
                assert_eq!(pattern, "*");
                assert_eq!(available, vec!["index.html".to_string()]);
            }
            other => panic!("expected undefined, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found_hook_reentry_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let view = View::builder("App.PageView")
            .setup(RootConfig::new(temp_dir.path()).with_path(""))
            .unwrap()
            .not_found(move |renderer, template, assigns| {
                counter.fetch_add(1, Ordering::SeqCst);
                renderer.render("App.PageView", template, assigns)
            })
            .compile(&Registry::new())
            .unwrap();
        let renderer = renderer_with(view);

        let result = renderer.render("App.PageView", "missing.html", Assigns::new());
        assert!(matches!(result, Err(RenderError::TemplateUndefined { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_not_found_hooks_bouncing_between_names_terminate() {
        let temp_dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let view = View::builder("App.PageView")
            .setup(RootConfig::new(temp_dir.path()).with_path(""))
            .unwrap()
            .not_found(move |renderer, template, assigns| {
                counter.fetch_add(1, Ordering::SeqCst);
                let other = if template == "a.html" { "b.html" } else { "a.html" };
                renderer.render("App.PageView", other, assigns)
            })
            .compile(&Registry::new())
            .unwrap();
        let renderer = renderer_with(view);

        let result = renderer.render("App.PageView", "a.html", Assigns::new());
        assert!(matches!(
            result,
            Err(RenderError::TemplateUndefined { template, .. }) if template == "a.html"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_not_found_hook_can_substitute() {
        let temp_dir = TempDir::new().unwrap();
        let view = View::builder("App.PageView")
            .setup(RootConfig::new(temp_dir.path()).with_path(""))
            .unwrap()
            .not_found(|_, template, _| Ok(Rendered::Data(json!({ "missing": template }))))
            .compile(&Registry::new())
            .unwrap();
        let renderer = renderer_with(view);

        let out = renderer
            .render("App.PageView", "gone.json", Assigns::new())
            .unwrap();
        assert_eq!(out, Rendered::Data(json!({"missing": "gone.json"})));
    }

    #[test]
    fn test_needs_recompile_tracks_path_set() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "index.html.jinja", "v1");

        let view = View::builder("App.PageView")
            .setup(RootConfig::new(temp_dir.path()).with_path(""))
            .unwrap()
            .compile(&Registry::new())
            .unwrap();
        assert!(!view.needs_recompile());

        create_file(temp_dir.path(), "index.html.jinja", "v2 edited");
        assert!(!view.needs_recompile());

        create_file(temp_dir.path(), "new.html.jinja", "added");
        assert!(view.needs_recompile());
    }

    #[test]
    fn test_resource_name_override() {
        let temp_dir = TempDir::new().unwrap();
        let view = View::builder("App.PersonView")
            .setup(RootConfig::new(temp_dir.path()))
            .unwrap()
            .resource_name("people")
            .compile(&Registry::new())
            .unwrap();
        assert_eq!(view.resource_name(), "people");
    }
}
