use crate::{
    fs_shims, ConfigError, FileResponder, PathResolver, ResponseSink, StaticConfig, StaticConnExt,
};
use std::path::PathBuf;
use trillium::{Conn, Handler, Headers, Info, KnownHeaderName, Status};

/// trillium handler to serve static files from the filesystem, with
/// etag revalidation
#[derive(Debug)]
pub struct StaticFileHandler {
    config: StaticConfig,
    resolver: PathResolver,
    responder: FileResponder,
    headers: Headers,
}

impl StaticFileHandler {
    /// builds a new StaticFileHandler
    ///
    /// ```
    /// # #[cfg(not(unix))] fn main() {}
    /// # #[cfg(unix)] fn main() -> Result<(), trillium_static_files::ConfigError> {
    /// use trillium_static_files::{crate_relative_path, StaticConfig, StaticFileHandler};
    /// use trillium_testing::prelude::*;
    ///
    /// let config =
    ///     StaticConfig::new(crate_relative_path!("tests/files"))?.with_filter("/assets")?;
    /// let handler = StaticFileHandler::new(config);
    ///
    /// assert_not_handled!(get("/index.html").on(&handler));
    /// assert_status!(get("/assets/missing.txt").on(&handler), 404);
    /// # Ok(()) }
    /// ```
    pub fn new(config: StaticConfig) -> Self {
        let resolver = PathResolver::from(&config);
        Self {
            config,
            resolver,
            responder: FileResponder::default(),
            headers: Headers::new(),
        }
    }

    /// use a configured [`FileResponder`] to deliver files
    pub fn with_responder(mut self, responder: FileResponder) -> Self {
        self.responder = responder;
        self
    }

    /// Adds `headers` to every response for a path this handler accepts,
    /// including errors and 304s. Useful to mark which handler answered.
    ///
    /// ```
    /// # #[cfg(not(unix))] fn main() {}
    /// # #[cfg(unix)] fn main() -> Result<(), trillium_static_files::ConfigError> {
    /// use trillium::Headers;
    /// use trillium_static_files::{crate_relative_path, static_files};
    /// use trillium_testing::prelude::*;
    ///
    /// let mut headers = Headers::new();
    /// headers.insert("x-served-by", "static-files");
    /// let handler = static_files(crate_relative_path!("tests/files"))?.with_headers(headers);
    ///
    /// assert_ok!(
    ///     get("/index.html").on(&handler),
    ///     "<h1>hello world</h1>",
    ///     "x-served-by" => "static-files"
    /// );
    /// # Ok(()) }
    /// ```
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// the configuration this handler was built from
    pub fn config(&self) -> &StaticConfig {
        &self.config
    }

    /// the filesystem path a request path would be served from, if it
    /// is accepted by the url filter and resolvable
    pub fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        if self.config.url_filter().matches(url_path) {
            self.resolver.resolve(url_path).ok()
        } else {
            None
        }
    }
}

/// serve every path from files within `root`
///
/// ```
/// assert!(trillium_static_files::static_files("").is_err());
/// ```
pub fn static_files(root: impl Into<PathBuf>) -> Result<StaticFileHandler, ConfigError> {
    StaticConfig::new(root).map(StaticFileHandler::new)
}

#[trillium::async_trait]
impl Handler for StaticFileHandler {
    async fn init(&mut self, _info: &mut Info) {
        let root = self.config.root_path();
        match fs_shims::metadata(root).await {
            Ok(metadata) if metadata.is_dir() => log::info!("serving files within {:?}", root),
            Ok(_) => log::warn!("{:?} is not a directory, every request will be refused", root),
            Err(error) => log::error!(
                "could not find {:?} on init ({}), continuing anyway",
                root,
                error
            ),
        }
    }

    async fn run(&self, mut conn: Conn) -> Conn {
        if !self.config.url_filter().matches(conn.path()) {
            return conn;
        }

        let response_headers = conn.response_headers_mut();
        for (name, values) in self.headers.clone().into_iter() {
            response_headers.insert(name, values);
        }

        let path = match self.resolver.resolve(conn.path()) {
            Ok(path) => path,
            Err(error) => {
                log::debug!("400 - {} - {}", conn.path(), error);
                let mut headers = Headers::new();
                headers.insert(KnownHeaderName::ContentType, "text/plain");
                conn.write_head(Status::BadRequest, headers);
                conn.end(Some(b"Bad Request".to_vec()));
                return conn;
            }
        };

        conn.send_path_with_responder(path, &self.responder).await
    }
}
