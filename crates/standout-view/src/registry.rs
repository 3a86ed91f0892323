//! Engine and encoder registry.
//!
//! The [`Registry`] holds two extension-keyed maps:
//!
//! - engines: source-file extension (`jinja`, `tmpl`, `yaml`) → [`TemplateEngine`]
//! - encoders: output-format extension (`html`, `json`) → [`Encoder`]
//!
//! Both start from the built-in defaults and are merged with overrides from a
//! [`RegistryConfig`]. An override of `None` removes the default entry.
//!
//! A registry is immutable once built. Pass it by reference into
//! [`ViewBuilder::compile`](crate::ViewBuilder::compile) and
//! [`RendererBuilder::build`](crate::RendererBuilder::build), or use the
//! process-wide instance from [`Registry::global`].
//!
//! # Settings files
//!
//! Built-in engines and encoders can be remapped from YAML:
//!
//! ```yaml
//! engines:
//!   tpl: simple      # also compile *.tpl files with the simple engine
//!   j2: null         # stop treating *.j2 files as templates
//! format_encoders:
//!   txt: markup
//!   csv: null
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::encoder::{default_encoders, Encoder, EncoderKind};
use crate::engine::{default_engines, EngineKind, TemplateEngine};
use crate::error::ConfigError;
use crate::util::format_extension;

static GLOBAL: Lazy<RwLock<Option<Arc<Registry>>>> = Lazy::new(|| RwLock::new(None));

/// Merged engine and encoder maps.
#[derive(Clone)]
pub struct Registry {
    engines: BTreeMap<String, Arc<dyn TemplateEngine>>,
    encoders: BTreeMap<String, Arc<dyn Encoder>>,
}

impl Registry {
    /// A registry with only the built-in defaults.
    pub fn new() -> Self {
        Self::build(&RegistryConfig::default())
    }

    /// Merges the defaults with `config`'s overrides.
    pub fn build(config: &RegistryConfig) -> Self {
        Self {
            engines: merge(default_engines(), &config.engines),
            encoders: merge(default_encoders(), &config.encoders),
        }
    }

    /// The engine registered for a source-file extension.
    pub fn engine(&self, extension: &str) -> Option<&Arc<dyn TemplateEngine>> {
        self.engines.get(extension)
    }

    pub fn engines(&self) -> &BTreeMap<String, Arc<dyn TemplateEngine>> {
        &self.engines
    }

    /// Known source-file extensions, sorted.
    pub fn engine_extensions(&self) -> Vec<String> {
        self.engines.keys().cloned().collect()
    }

    /// The encoder for a template name's output format.
    ///
    /// `"user/show.json"` looks up `json`. Names without a format extension have
    /// no encoder.
    pub fn encoder(&self, template: &str) -> Option<&Arc<dyn Encoder>> {
        format_extension(template).and_then(|format| self.encoders.get(format))
    }

    pub fn encoders(&self) -> &BTreeMap<String, Arc<dyn Encoder>> {
        &self.encoders
    }

    /// The process-wide registry, computed from the defaults on first use.
    ///
    /// Concurrent first callers may each compute a registry; the first to publish
    /// wins and every caller receives that instance. The value stays cached until
    /// [`reset_global`](Self::reset_global) or [`set_global`](Self::set_global).
    pub fn global() -> Arc<Registry> {
        if let Some(registry) = GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return registry.clone();
        }

        let computed = Arc::new(Registry::new());
        let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(published) => published.clone(),
            None => {
                tracing::debug!(
                    engines = ?computed.engine_extensions(),
                    "published process-wide template registry"
                );
                *slot = Some(computed.clone());
                computed
            }
        }
    }

    /// Replaces the process-wide registry.
    pub fn set_global(registry: Registry) -> Arc<Registry> {
        let registry = Arc::new(registry);
        *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = Some(registry.clone());
        tracing::debug!(
            engines = ?registry.engine_extensions(),
            "replaced process-wide template registry"
        );
        registry
    }

    /// Drops the cached process-wide registry; the next [`global`](Self::global)
    /// call recomputes it.
    pub fn reset_global() {
        *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::debug!("reset process-wide template registry");
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .field("encoders", &self.encoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn merge<T: ?Sized>(
    mut defaults: BTreeMap<String, Arc<T>>,
    overrides: &BTreeMap<String, Option<Arc<T>>>,
) -> BTreeMap<String, Arc<T>> {
    for (key, entry) in overrides {
        match entry {
            Some(value) => {
                defaults.insert(key.clone(), value.clone());
            }
            None => {
                defaults.remove(key);
            }
        }
    }
    defaults
}

/// Overrides applied on top of the default registry.
///
/// # Example
///
/// ```rust
/// use standout_view::{Registry, RegistryConfig, SimpleEngine};
///
/// let config = RegistryConfig::new()
///     .engine("tpl", SimpleEngine::new())
///     .disable_engine("j2")
///     .disable_encoder("csv");
/// let registry = Registry::build(&config);
///
/// assert!(registry.engine("tpl").is_some());
/// assert!(registry.engine("j2").is_none());
/// assert!(registry.encoder("report.csv").is_none());
/// ```
#[derive(Clone, Default)]
pub struct RegistryConfig {
    engines: BTreeMap<String, Option<Arc<dyn TemplateEngine>>>,
    encoders: BTreeMap<String, Option<Arc<dyn Encoder>>>,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an engine for a source-file extension.
    pub fn engine(
        mut self,
        extension: impl Into<String>,
        engine: impl TemplateEngine + 'static,
    ) -> Self {
        self.engines.insert(extension.into(), Some(Arc::new(engine)));
        self
    }

    /// Removes the default engine for an extension.
    pub fn disable_engine(mut self, extension: impl Into<String>) -> Self {
        self.engines.insert(extension.into(), None);
        self
    }

    /// Registers an encoder for an output format.
    pub fn encoder(mut self, format: impl Into<String>, encoder: impl Encoder + 'static) -> Self {
        self.encoders.insert(format.into(), Some(Arc::new(encoder)));
        self
    }

    /// Removes the default encoder for a format.
    pub fn disable_encoder(mut self, format: impl Into<String>) -> Self {
        self.encoders.insert(format.into(), None);
        self
    }
}

impl From<RegistrySettings> for RegistryConfig {
    fn from(settings: RegistrySettings) -> Self {
        Self {
            engines: settings
                .engines
                .into_iter()
                .map(|(ext, kind)| (ext, kind.map(EngineKind::build)))
                .collect(),
            encoders: settings
                .format_encoders
                .into_iter()
                .map(|(format, kind)| (format, kind.map(EncoderKind::build)))
                .collect(),
        }
    }
}

/// Serializable registry overrides naming built-in engines and encoders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySettings {
    #[serde(default)]
    pub engines: BTreeMap<String, Option<EngineKind>>,
    #[serde(default)]
    pub format_encoders: BTreeMap<String, Option<EncoderKind>>,
}

impl RegistrySettings {
    /// Parses settings from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}
