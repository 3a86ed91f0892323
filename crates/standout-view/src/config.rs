//! Per-view root configuration and naming helpers.
//!
//! A view's templates live under `root/path`. When `path` is omitted it is
//! derived from the view name: the namespace prefix is dropped, the `View`
//! suffix is stripped and each remaining segment is snake_cased.
//!
//! | View | Namespace | Lookup path |
//! |------|-----------|-------------|
//! | `App.UserView` | `App` | `root/user` |
//! | `App.Admin.UserProfileView` | `App` | `root/admin/user_profile` |
//! | `App.Admin.UserView` | `App.Admin` | `root/user` |
//! | any, with `path: ""` | | `root` |

use std::path::PathBuf;

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The suffix stripped from view names when deriving paths and resource names.
pub const VIEW_SUFFIX: &str = "View";

fn default_pattern() -> String {
    "*".to_string()
}

/// Where a view finds its templates.
///
/// # Example
///
/// ```rust
/// use standout_view::RootConfig;
///
/// let config = RootConfig::from_yaml("root: templates\npattern: \"**/*\"").unwrap();
/// assert_eq!(
///     config.lookup_root("App.Admin.UserView").unwrap(),
///     std::path::PathBuf::from("templates/admin/user"),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
    /// Base template directory. Required.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Sub-path under `root`. Derived from the view name when absent; blank
    /// means `root` itself.
    #[serde(default)]
    pub path: Option<String>,

    /// Module prefix dropped when deriving the path. Defaults to the view
    /// name's first segment.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Glob relative to the lookup root, without the engine extension.
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            root: None,
            path: None,
            namespace: None,
            pattern: default_pattern(),
        }
    }
}

impl RootConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Parses a config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Resolves the directory `view`'s templates are discovered in.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingRoot`] when `root` is unset or empty.
    pub fn lookup_root(&self, view: &str) -> Result<PathBuf, ConfigError> {
        let root = match &self.root {
            Some(root) if !root.as_os_str().is_empty() => root,
            _ => {
                return Err(ConfigError::MissingRoot {
                    view: view.to_string(),
                })
            }
        };

        let sub_path = match &self.path {
            Some(path) => path.trim().to_string(),
            None => {
                let namespace = self
                    .namespace
                    .as_deref()
                    .unwrap_or_else(|| view.split('.').next().unwrap_or(view));
                template_root_for(view, namespace, VIEW_SUFFIX)
            }
        };

        Ok(if sub_path.is_empty() {
            root.clone()
        } else {
            root.join(sub_path)
        })
    }
}

/// Derives a view's template sub-path from its module-like name.
///
/// ```rust
/// use standout_view::template_root_for;
///
/// assert_eq!(template_root_for("App.Admin.UserView", "App", "View"), "admin/user");
/// assert_eq!(template_root_for("Other.PageView", "App", "View"), "other/page");
/// ```
pub fn template_root_for(view: &str, namespace: &str, suffix: &str) -> String {
    let segments: Vec<&str> = view.split('.').collect();
    let prefix: Vec<&str> = namespace.split('.').filter(|s| !s.is_empty()).collect();

    let rest = if !prefix.is_empty() && segments.starts_with(&prefix) {
        &segments[prefix.len()..]
    } else {
        &segments[..]
    };

    let last = rest.len().saturating_sub(1);
    rest.iter()
        .enumerate()
        .map(|(i, &segment)| {
            if i == last {
                unsuffix(segment, suffix)
            } else {
                segment
            }
        })
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_snake_case())
        .collect::<Vec<_>>()
        .join("/")
}

/// The assigns key a single resource is bound under in collection helpers.
///
/// ```rust
/// use standout_view::resource_name;
///
/// assert_eq!(resource_name("App.Admin.UserProfileView", "View"), "user_profile");
/// ```
pub fn resource_name(view: &str, suffix: &str) -> String {
    let last = view.rsplit('.').next().unwrap_or(view);
    match unsuffix(last, suffix) {
        "" => last.to_snake_case(),
        base => base.to_snake_case(),
    }
}

fn unsuffix<'a>(segment: &'a str, suffix: &str) -> &'a str {
    segment.strip_suffix(suffix).unwrap_or(segment)
}
