use crate::{ConfigError, ResolveError, StaticConfig};
use percent_encoding::percent_decode_str;
use relative_path::RelativePathBuf;
use std::path::{Path, PathBuf};

/// Maps untrusted request urls to filesystem paths inside a root
/// directory.
///
/// The url is percent-decoded, stripped of NUL characters, and
/// normalized as an absolute path before it is joined onto the root, so
/// no number of `..` segments can climb above the root.
///
/// ```
/// use std::path::Path;
/// use trillium_static_files::PathResolver;
///
/// let resolver = PathResolver::new("/srv/www")?;
/// assert_eq!(
///     resolver.resolve("/../../etc/passwd").unwrap(),
///     Path::new("/srv/www/etc/passwd")
/// );
/// # Ok::<(), trillium_static_files::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// builds a resolver for `root`, failing if it is empty
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRoot);
        }
        Ok(Self { root })
    }

    /// the directory every resolved path is contained in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `raw_url` to a path within the root. Malformed percent
    /// escapes and non-utf-8 escapes are errors, never passed through.
    pub fn resolve(&self, raw_url: &str) -> Result<PathBuf, ResolveError> {
        let normalized = normalize_segments(raw_url)?;
        let path = normalized.to_path(&self.root);
        log::trace!("resolved {} to {}", raw_url, path.display());
        Ok(path)
    }

    /// Decodes and normalizes `raw_url` against a virtual root without
    /// touching the filesystem root.
    ///
    /// ```
    /// use trillium_static_files::PathResolver;
    /// assert_eq!(PathResolver::normalize("/a/./b/../c%20d").unwrap(), "/a/c d");
    /// assert_eq!(PathResolver::normalize("").unwrap(), "/");
    /// ```
    pub fn normalize(raw_url: &str) -> Result<String, ResolveError> {
        Ok(format!("/{}", normalize_segments(raw_url)?))
    }
}

impl From<&StaticConfig> for PathResolver {
    fn from(config: &StaticConfig) -> Self {
        Self {
            root: config.root_path().to_path_buf(),
        }
    }
}

fn normalize_segments(raw_url: &str) -> Result<RelativePathBuf, ResolveError> {
    let decoded = percent_decode(raw_url)?.replace('\0', "");
    let mut normalized = RelativePathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                normalized.pop();
            }
            segment => normalized.push(segment),
        }
    }
    Ok(normalized)
}

fn percent_decode(raw_url: &str) -> Result<String, ResolveError> {
    let bytes = raw_url.as_bytes();
    for (offset, _) in raw_url.match_indices('%') {
        let escape = bytes.get(offset + 1..offset + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(ResolveError::MalformedEscape { offset });
        }
    }

    percent_decode_str(raw_url)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ResolveError::InvalidUtf8)
}
