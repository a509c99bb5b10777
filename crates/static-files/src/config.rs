use crate::ConfigError;
use regex::Regex;
use std::{
    fmt::{self, Debug, Formatter},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Decides which request paths a
/// [`StaticFileHandler`](crate::StaticFileHandler) is responsible for.
/// Paths that do not match are passed along to the next handler.
#[derive(Clone, Default)]
pub enum UrlFilter {
    /// every path matches
    #[default]
    Any,

    /// the path matches when this expression matches it
    Pattern(Regex),

    /// the path matches when this predicate returns true
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync + 'static>),
}

impl UrlFilter {
    /// Compiles a filter from regular expression source. The expression
    /// is anchored to the start of the path, so `"/assets"` matches
    /// `/assets/app.css` but not `/v1/assets/app.css`.
    pub fn anchored(source: &str) -> Result<Self, ConfigError> {
        Ok(Self::Pattern(Regex::new(&format!("^(?:{source})"))?))
    }

    /// builds a filter from a predicate
    pub fn predicate(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(predicate))
    }

    /// whether this filter accepts the request path
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Pattern(regex) => regex.is_match(path),
            Self::Predicate(predicate) => predicate(path),
        }
    }
}

impl Debug for UrlFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<Regex> for UrlFilter {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

impl TryFrom<&str> for UrlFilter {
    type Error = ConfigError;

    fn try_from(source: &str) -> Result<Self, Self::Error> {
        Self::anchored(source)
    }
}

impl TryFrom<String> for UrlFilter {
    type Error = ConfigError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::anchored(&source)
    }
}

/// Configuration for a [`StaticFileHandler`](crate::StaticFileHandler).
///
/// ```
/// use trillium_static_files::StaticConfig;
///
/// let config = StaticConfig::new("/srv/www")?.with_filter("/static/")?;
/// assert!(config.url_filter().matches("/static/app.js"));
/// assert!(!config.url_filter().matches("/api/static/app.js"));
///
/// assert!(StaticConfig::new("").is_err());
/// # Ok::<(), trillium_static_files::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct StaticConfig {
    root_path: PathBuf,
    url_filter: UrlFilter,
}

impl StaticConfig {
    /// Builds a config serving every path from `root_path`. Fails if
    /// `root_path` is empty.
    pub fn new(root_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root_path = root_path.into();
        if root_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRoot);
        }

        Ok(Self {
            root_path,
            url_filter: UrlFilter::Any,
        })
    }

    /// Restricts the handler to request paths accepted by `filter`.
    /// Strings are compiled as start-anchored regular expressions.
    pub fn with_filter<F>(mut self, filter: F) -> Result<Self, ConfigError>
    where
        F: TryInto<UrlFilter>,
        ConfigError: From<F::Error>,
    {
        self.url_filter = filter.try_into()?;
        Ok(self)
    }

    /// restricts the handler to request paths accepted by `predicate`
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.url_filter = UrlFilter::predicate(predicate);
        self
    }

    /// the directory files are served from
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// the filter deciding which request paths are served
    pub fn url_filter(&self) -> &UrlFilter {
        &self.url_filter
    }
}
