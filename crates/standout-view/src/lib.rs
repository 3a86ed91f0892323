//! # Standout View - File-Discovered View Templates
//!
//! `standout-view` finds template files on disk, compiles each one once into a
//! render unit, and renders them at request time with layouts, collection
//! helpers and output-format encoders.
//!
//! ## Core Concepts
//!
//! - [`View`]: a named owner of templates (`App.UserView`), compiled once from a
//!   [`RootConfig`] into an immutable dispatch table
//! - [`Registry`]: engines by source extension and encoders by output format
//! - [`Renderer`]: the runtime API over a set of views
//! - [`Assigns`]: the data handed to a template, including the reserved `layout`
//!   and `as` keys
//! - [`Rendered`]: a template's result, either safe markup or structured data
//!
//! ## Quick Start
//!
//! ```text
//! templates/
//! ├── layout/app.html.jinja     <main>{{ inner_content }}</main>
//! └── user/
//!     ├── index.html.jinja      <p>{{ user.name }}</p>
//!     └── show.json.yaml        name: "{user.name}"
//! ```
//!
//! ```rust,no_run
//! use standout_view::{Assigns, Renderer, RootConfig, View};
//! use serde_json::json;
//!
//! let renderer = Renderer::builder()
//!     .view(View::builder("App.UserView").setup(RootConfig::new("templates"))?)?
//!     .view(View::builder("App.LayoutView").setup(RootConfig::new("templates"))?)?
//!     .build();
//!
//! let user = json!({"name": "Alice"});
//!
//! // <main><p>Alice</p></main>
//! let page = renderer.render_to_string(
//!     "App.UserView",
//!     "index.html",
//!     Assigns::new()
//!         .with("user", user.clone())
//!         .with_layout("App.LayoutView", "app.html"),
//! )?;
//!
//! // {"name":"Alice"}
//! let body = renderer.render_to_string(
//!     "App.UserView",
//!     "show.json",
//!     Assigns::new().with("user", user),
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Template Names
//!
//! A template's name is its path under the view's lookup root with the engine
//! extension removed: `user/index.html.jinja` is `index.html` for
//! `App.UserView`. The remaining extension picks the encoder used by
//! [`Renderer::render_to_iodata`] and [`Renderer::render_to_string`].
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and never installs a subscriber. View
//! compilation logs at `debug`/`info`, dispatch decisions at `trace`.

pub mod assigns;
pub mod config;
pub mod discovery;
pub mod encoder;
pub mod engine;
mod error;
pub mod registry;
pub mod renderer;
mod util;
pub mod view;

// Error types
pub use error::{ConfigError, EncodeError, EngineError, RenderError};

// Render-time data
pub use assigns::{Assigns, Iodata, Rendered, TemplateRef, AS_KEY, INNER_CONTENT_KEY, LAYOUT_KEY};

// Configuration and naming
pub use config::{resource_name, template_root_for, RootConfig, VIEW_SUFFIX};

// Discovery
pub use discovery::{find_all, hash, TemplateHash};

// Engines and encoders
pub use encoder::{
    default_encoders, CsvEncoder, Encoder, EncoderKind, JsonEncoder, MarkupEncoder, ScriptEncoder,
    XmlEncoder, YamlEncoder,
};
pub use engine::{
    default_engines, register_filters, DataEngine, EngineKind, MiniJinjaEngine, RenderUnit,
    SimpleEngine, TemplateEngine,
};
pub use registry::{Registry, RegistryConfig, RegistrySettings};

// Views and rendering
pub use renderer::{Renderer, RendererBuilder};
pub use view::{NotFoundHook, RenderClause, View, ViewBuilder};

// Utility exports
pub use util::{escape_html, flatten_json_for_csv, format_extension, serialize_to_xml};
