//! Container configuration.

use std::sync::Arc;

#[cfg(feature = "config")]
use serde::Deserialize;

#[cfg(feature = "config")]
use crate::error::{DiError, DiResult};
use crate::scoping::ScopedLifestyle;

/// Options a [`Container`](crate::Container) is built with.
///
/// ```rust
/// use ferrous_lifestyle::{ContainerOptions, ThreadScopedLifestyle};
///
/// let options = ContainerOptions::default()
///     .with_default_scoped_lifestyle(ThreadScopedLifestyle::new())
///     .with_max_resolution_depth(64);
/// assert_eq!(options.max_resolution_depth, 64);
/// assert!(options.warn_on_undisposed);
/// ```
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    /// Lifestyle used by scoped registrations that do not name their own
    pub default_scoped_lifestyle: Option<Arc<dyn ScopedLifestyle>>,
    /// Maximum nesting of resolutions on one thread
    pub max_resolution_depth: usize,
    /// Log a warning when a scope or container is dropped with pending disposables
    pub warn_on_undisposed: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            default_scoped_lifestyle: None,
            max_resolution_depth: 1024,
            warn_on_undisposed: true,
        }
    }
}

impl ContainerOptions {
    pub fn with_default_scoped_lifestyle(mut self, lifestyle: impl ScopedLifestyle) -> Self {
        self.default_scoped_lifestyle = Some(Arc::new(lifestyle));
        self
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    pub fn with_warn_on_undisposed(mut self, warn: bool) -> Self {
        self.warn_on_undisposed = warn;
        self
    }

    /// Reads options from JSON.
    ///
    /// ```rust
    /// use ferrous_lifestyle::{ContainerOptions, ScopedLifestyle};
    ///
    /// let options = ContainerOptions::from_json(
    ///     r#"{ "default_scoped_lifestyle": "thread", "max_resolution_depth": 32 }"#,
    /// ).unwrap();
    /// assert_eq!(options.default_scoped_lifestyle.unwrap().name(), "thread");
    /// assert_eq!(options.max_resolution_depth, 32);
    /// assert!(options.warn_on_undisposed);
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let file: OptionsFile =
            serde_json::from_str(json).map_err(|e| DiError::Configuration(e.to_string()))?;

        let default_scoped_lifestyle = file
            .default_scoped_lifestyle
            .as_deref()
            .map(lifestyle_by_name)
            .transpose()?;

        Ok(Self {
            default_scoped_lifestyle,
            max_resolution_depth: file.max_resolution_depth,
            warn_on_undisposed: file.warn_on_undisposed,
        })
    }
}

#[cfg(feature = "config")]
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionsFile {
    default_scoped_lifestyle: Option<String>,
    max_resolution_depth: usize,
    warn_on_undisposed: bool,
}

#[cfg(feature = "config")]
impl Default for OptionsFile {
    fn default() -> Self {
        let defaults = ContainerOptions::default();
        Self {
            default_scoped_lifestyle: None,
            max_resolution_depth: defaults.max_resolution_depth,
            warn_on_undisposed: defaults.warn_on_undisposed,
        }
    }
}

#[cfg(feature = "config")]
fn lifestyle_by_name(name: &str) -> DiResult<Arc<dyn ScopedLifestyle>> {
    match name {
        "thread" => Ok(Arc::new(crate::scoping::ThreadScopedLifestyle::new())),
        #[cfg(feature = "async")]
        "async" => Ok(Arc::new(crate::scoping::AsyncScopedLifestyle::new())),
        other => Err(DiError::Configuration(format!("unknown scoped lifestyle `{other}`"))),
    }
}

/// What [`Container::verify`](crate::Container::verify) checks besides
/// constructing every registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationOption {
    /// Construct every registration only
    VerifyOnly,
    /// Also run the diagnostic analyzer and fail on warnings
    #[default]
    VerifyAndDiagnose,
}
