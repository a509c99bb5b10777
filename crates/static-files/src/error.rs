use std::{fmt, io, path::PathBuf};
use trillium::Status;

/// Errors detected while building a [`StaticConfig`](crate::StaticConfig)
/// or a [`PathResolver`](crate::PathResolver). These are setup-time
/// failures and are never produced while serving a request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// the static root path was empty
    #[error("path of static root can not be empty")]
    EmptyRoot,

    /// the url filter source was not a valid regular expression
    #[error("invalid url filter: {0}")]
    InvalidFilter(#[from] regex::Error),
}

impl From<std::convert::Infallible> for ConfigError {
    fn from(infallible: std::convert::Infallible) -> Self {
        match infallible {}
    }
}

/// Reasons a raw request url could not be turned into a filesystem path
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// a `%` was not followed by two hexadecimal digits
    #[error("malformed percent escape at byte {offset}")]
    MalformedEscape {
        /// byte offset of the offending `%` in the raw url
        offset: usize,
    },

    /// the percent-decoded url was not valid utf-8
    #[error("percent-decoded url is not valid utf-8")]
    InvalidUtf8,
}

/// The category of a failed file delivery. Each reason maps to exactly
/// one http status and plain-text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// the path could not be stat'ed
    NotFound,

    /// the path exists but is not a regular file
    Forbidden,

    /// the file could not be read after headers were decided
    InternalError,
}

impl FailureReason {
    /// every failure reason, in declaration order
    pub const ALL: [FailureReason; 3] = [Self::NotFound, Self::Forbidden, Self::InternalError];

    /// the response status for this failure
    pub fn status(self) -> Status {
        match self {
            Self::NotFound => Status::NotFound,
            Self::Forbidden => Status::Forbidden,
            Self::InternalError => Status::BadGateway,
        }
    }

    /// the plain-text response body for this failure
    pub fn message(self) -> &'static str {
        match self {
            Self::NotFound => "File Not Found",
            Self::Forbidden => "Permission Denied",
            Self::InternalError => "Internal Server Error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A per-request delivery failure, passed to the error callback of
/// [`FileResponder::serve`](crate::FileResponder::serve) exactly once.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// stat failed
    #[error("could not stat {}: {source}", .path.display())]
    NotFound {
        /// the resolved filesystem path
        path: PathBuf,
        /// the underlying io error
        source: io::Error,
    },

    /// the target is a directory or a special file
    #[error("{} is not a file", .path.display())]
    Forbidden {
        /// the resolved filesystem path
        path: PathBuf,
    },

    /// opening or reading the file failed after the stat succeeded
    #[error("could not read {}: {source}", .path.display())]
    Internal {
        /// the resolved filesystem path
        path: PathBuf,
        /// the underlying io error
        source: io::Error,
    },
}

impl ServeError {
    /// the [`FailureReason`] this error is reported as
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::NotFound { .. } => FailureReason::NotFound,
            Self::Forbidden { .. } => FailureReason::Forbidden,
            Self::Internal { .. } => FailureReason::InternalError,
        }
    }

    /// the filesystem path this error concerns
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound { path, .. }
            | Self::Forbidden { path }
            | Self::Internal { path, .. } => path,
        }
    }
}
