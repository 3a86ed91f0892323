//! Error types for view compilation and rendering.
//!
//! Two phases, two error types:
//!
//! - [`ConfigError`]: raised while a view is being set up and compiled. These are
//!   configuration mistakes (missing root, duplicate setup, colliding template
//!   names, templates that fail to compile) and are never deferred to render time.
//! - [`RenderError`]: raised by the render entry points on [`Renderer`](crate::Renderer).
//!
//! Engines and encoders report through their own narrow types, [`EngineError`] and
//! [`EncodeError`], which fold into the two above.

use std::path::PathBuf;

use thiserror::Error;

/// Build-time failure while setting up or compiling a view.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The view was compiled without a template root.
    #[error("no template root configured for {view}; set `root` before compiling")]
    MissingRoot {
        /// The view being compiled.
        view: String,
    },

    /// Setup was attempted twice on the same view.
    #[error("{view} is already set up; views can only be set up once")]
    AlreadySetUp {
        /// The view that was set up twice.
        view: String,
    },

    /// The view name is not module-like (`App.UserView`).
    #[error("invalid view name {name:?}; expected dot-separated capitalized segments")]
    InvalidViewName {
        /// The rejected name.
        name: String,
    },

    /// Two discovered files normalize to the same template name.
    #[error(
        "template collision in {view} for \"{name}\":\n  - {}\n  - {}",
        existing.display(),
        conflicting.display()
    )]
    Collision {
        /// The view being compiled.
        view: String,
        /// The shared template name.
        name: String,
        /// The file that claimed the name first.
        existing: PathBuf,
        /// The file that collided with it.
        conflicting: PathBuf,
    },

    /// An engine failed to compile a template file.
    #[error("failed to compile {}: {source}", path.display())]
    Compile {
        /// The template source file.
        path: PathBuf,
        /// The engine's error.
        #[source]
        source: EngineError,
    },

    /// A discovered file has an extension no engine is registered for.
    #[error("no template engine registered for extension \"{extension}\"")]
    UnknownEngine {
        /// The offending extension.
        extension: String,
    },

    /// Registry or root settings could not be parsed.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::InvalidSettings(err.to_string())
    }
}

/// Failure while rendering a template.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The reserved `layout` assign is not a `[view, template]` pair.
    #[error(
        "invalid value for reserved key \"layout\" in assigns; \
         expected [\"Module.Name\", \"template\"] or false, got: {value}"
    )]
    InvalidLayout {
        /// The offending value, rendered as JSON.
        value: String,
    },

    /// No clause, compiled template or not-found hook produced the template.
    #[error(
        "could not render \"{template}\" for {view}: define a render clause or a template \
         at \"{}/{pattern}\". Compiled templates: [{}]",
        root.display(),
        available.join(", ")
    )]
    TemplateUndefined {
        /// The view the lookup ran against.
        view: String,
        /// The requested template name.
        template: String,
        /// The view's resolved lookup root.
        root: PathBuf,
        /// The view's discovery pattern.
        pattern: String,
        /// Every template name compiled for the view, sorted.
        available: Vec<String>,
    },

    /// A view name (for example from a layout) is not registered with the renderer.
    #[error("unknown view: {name}")]
    UnknownView {
        /// The requested view name.
        name: String,
    },

    /// Assigns are not a map, or a reserved key has the wrong type.
    #[error("invalid assigns: {reason}")]
    InvalidAssigns {
        /// What was wrong, including the offending value.
        reason: String,
    },

    /// The template engine failed while rendering.
    #[error("template error: {0}")]
    Template(String),

    /// Data could not be serialized into assigns.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The output-format encoder failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Encoded output was not valid UTF-8.
    #[error("encoded output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        RenderError::Template(err.to_string())
    }
}

/// Failure reported by a [`TemplateEngine`](crate::TemplateEngine) at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The source file could not be read.
    #[error("failed to read \"{}\": {message}", path.display())]
    Io {
        /// The file that failed to read.
        path: PathBuf,
        /// The I/O error message.
        message: String,
    },

    /// The source could not be parsed by the engine.
    #[error("syntax error in \"{name}\": {message}")]
    Syntax {
        /// The template name.
        name: String,
        /// The engine's message.
        message: String,
    },
}

/// Failure reported by an [`Encoder`](crate::Encoder).
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML encoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML encoding failed: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("CSV encoding failed: {0}")]
    Csv(String),
}
