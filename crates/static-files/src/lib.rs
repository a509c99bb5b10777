/*!
Serves static files for trillium, with etag revalidation.

This crate has two independent parts:

* [`PathResolver`] maps an untrusted request url onto a path inside a
  root directory. The url is percent-decoded, stripped of NUL bytes, and
  normalized as an absolute path before it is joined to the root, so
  `..` segments can never climb out of it.
* [`FileResponder`] stats a path, answers a matching `If-None-Match`
  with `304 Not Modified`, and otherwise streams the file with
  `content-type`, `content-length`, and `etag` headers. Failures are
  reported once to an error callback and map to 404, 403, or 502.

[`StaticFileHandler`] combines them into a trillium [`Handler`]
configured by a [`StaticConfig`], and [`StaticConnExt`] exposes file
delivery on any [`Conn`].

[`Handler`]: trillium::Handler
[`Conn`]: trillium::Conn

```
# #[cfg(not(unix))] fn main() {}
# #[cfg(unix)] fn main() -> Result<(), trillium_static_files::ConfigError> {
use trillium_static_files::{crate_relative_path, static_files};
use trillium_testing::prelude::*;

let handler = static_files(crate_relative_path!("tests/files"))?;

let conn = get("/a.txt").on(&handler);
assert_ok!(
    conn,
    "The quick brown fox jumps over a lazy dog\n",
    "content-type" => "text/plain; charset=utf-8",
    "content-length" => "42"
);
# Ok(()) }
```

## Runtime

File access needs one of the `smol` (default), `tokio`, or `async-std`
cargo features.
*/
#![forbid(unsafe_code)]
#![deny(
    missing_copy_implementations,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    unused_qualifications
)]

mod config;
pub use config::{StaticConfig, UrlFilter};

mod error;
pub use error::{ConfigError, FailureReason, ResolveError, ServeError};

mod etag;
pub use crate::etag::{quote, Digest, EtagDigest, FileMeta};

mod filesystem;
pub use filesystem::{Filesystem, RuntimeFilesystem};

mod fs_shims;

mod handler;
pub use handler::{static_files, StaticFileHandler};

mod mime;
pub use crate::mime::{ContentTypes, MimeGuess, OCTET_STREAM};

mod resolver;
pub use resolver::PathResolver;

mod responder;
pub use responder::{write_error, ContentMeta, FileResponder, ServeOutcome};

mod sink;
pub use sink::{BodyStream, BufferedSink, ResponseSink};

mod static_conn_ext;
pub use static_conn_ext::StaticConnExt;

pub use relative_path;

/// constructs an absolute path from a path relative to the crate root
///
/// ```
/// use trillium_static_files::crate_relative_path;
/// assert!(crate_relative_path!("tests/files/a.txt").is_file());
/// ```
#[macro_export]
macro_rules! crate_relative_path {
    ($path:literal) => {
        $crate::relative_path::RelativePath::new($path).to_logical_path(env!("CARGO_MANIFEST_DIR"))
    };
}
