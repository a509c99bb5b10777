use crate::{
    mime::OCTET_STREAM,
    quote, ContentTypes, Digest, EtagDigest, FailureReason, FileMeta, Filesystem, MimeGuess,
    ResponseSink, RuntimeFilesystem, ServeError,
};
use futures_lite::{io, ready, AsyncRead};
use std::{
    fmt::{self, Debug, Formatter},
    path::{Path, PathBuf},
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
};
use trillium::{Headers, KnownHeaderName, Status};

/// the result of a single delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// the client etag matched; a 304 with no body was written
    NotModified,

    /// headers were written and the body was handed to the sink
    Delivered,

    /// headers were written but the sink status was changed away from
    /// 200 before the body was sent, so no body was sent
    Superseded,

    /// delivery failed and the error callback was invoked
    Failed(FailureReason),
}

/// Optional facts about in-memory content sent with
/// [`FileResponder::send_as_file`]. Anything left unset is derived from
/// the content.
#[derive(Debug, Clone, Default)]
pub struct ContentMeta {
    pub(crate) content_type: Option<String>,
    pub(crate) ext: Option<String>,
    pub(crate) length: Option<u64>,
    pub(crate) etag: Option<String>,
}

impl ContentMeta {
    /// no explicit metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// use this content-type instead of looking one up
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// look the content-type up from this extension, such as `".jpg"`
    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }

    /// send this content-length instead of the byte length of the content
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// use this etag instead of digesting the content
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// Delivers files, or in-memory content with file semantics, to a
/// [`ResponseSink`], answering conditional requests with 304.
///
/// Nothing is cached between calls; every [`serve`](Self::serve) stats the
/// file again.
#[derive(Clone)]
pub struct FileResponder {
    digest: Arc<dyn Digest>,
    content_types: Arc<dyn ContentTypes>,
    filesystem: Arc<dyn Filesystem>,
}

impl Debug for FileResponder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileResponder").finish_non_exhaustive()
    }
}

impl Default for FileResponder {
    fn default() -> Self {
        Self {
            digest: Arc::new(EtagDigest),
            content_types: Arc::new(MimeGuess),
            filesystem: Arc::new(RuntimeFilesystem),
        }
    }
}

impl FileResponder {
    /// a responder using [`EtagDigest`] and [`MimeGuess`]
    pub fn new() -> Self {
        Self::default()
    }

    /// use `digest` to fingerprint etags
    pub fn with_digest(mut self, digest: impl Digest) -> Self {
        self.digest = Arc::new(digest);
        self
    }

    /// use `content_types` to look up content-types
    pub fn with_content_types(mut self, content_types: impl ContentTypes) -> Self {
        self.content_types = Arc::new(content_types);
        self
    }

    /// read files through `filesystem` instead of the runtime's
    pub fn with_filesystem(mut self, filesystem: impl Filesystem) -> Self {
        self.filesystem = Arc::new(filesystem);
        self
    }

    /// Serves the file at `path` to `sink`.
    ///
    /// `client_etag` is the request's `If-None-Match` value, or `""`.
    /// When it equals the file's etag exactly, a 304 is written instead
    /// of the file. `on_error` is invoked exactly once if delivery fails,
    /// including for read errors that happen after this future has
    /// completed, while the sink is still consuming the stream.
    pub async fn serve<S>(
        &self,
        sink: &mut S,
        path: &Path,
        client_etag: &str,
        on_error: impl Fn(&ServeError) + Send + Sync + 'static,
    ) -> ServeOutcome
    where
        S: ResponseSink + ?Sized,
    {
        self.serve_with_etag(sink, path, client_etag, None, on_error)
            .await
    }

    /// Serves the file at `path` like [`serve`](Self::serve), but with
    /// `etag` in place of the one derived from the file's size, inode
    /// and modification time when it is `Some`. The digest is not
    /// invoked for an explicit etag.
    pub async fn serve_with_etag<S>(
        &self,
        sink: &mut S,
        path: &Path,
        client_etag: &str,
        etag: Option<&str>,
        on_error: impl Fn(&ServeError) + Send + Sync + 'static,
    ) -> ServeOutcome
    where
        S: ResponseSink + ?Sized,
    {
        let reporter = Arc::new(ReportOnce::new(on_error));

        let metadata = match self.filesystem.metadata(path).await {
            Ok(metadata) => metadata,
            Err(source) => {
                return reporter.fail(ServeError::NotFound {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if !metadata.is_file() {
            return reporter.fail(ServeError::Forbidden {
                path: path.to_path_buf(),
            });
        }

        let meta = FileMeta::from_metadata(&metadata);
        let etag = match etag {
            Some(etag) => quote(etag),
            None => meta.etag(&*self.digest),
        };

        if etag == client_etag {
            log::debug!("{} not modified ({})", path.display(), etag);
            sink.write_head(Status::NotModified, Headers::new());
            sink.end(None);
            return ServeOutcome::NotModified;
        }

        let mut headers = Headers::new();
        headers.insert(
            KnownHeaderName::ContentType,
            self.content_types.lookup(&path.to_string_lossy()),
        );
        headers.insert(KnownHeaderName::ContentLength, meta.size.to_string());
        headers.insert(KnownHeaderName::Etag, etag);

        if !write_ok_head(sink, headers) {
            return ServeOutcome::Superseded;
        }

        let file = match self.filesystem.open(path).await {
            Ok(file) => file,
            Err(source) => {
                return reporter.fail(ServeError::Internal {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let body = ReportingReader::new(file, path.to_path_buf(), Arc::clone(&reporter));
        match sink.write_stream(Box::new(body), meta.size).await {
            Ok(()) => ServeOutcome::Delivered,
            Err(source) => reporter.fail(ServeError::Internal {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Sends `content` as though it were a file.
    ///
    /// Headers are computed from `meta` and the content, then
    /// `extra_headers` are inserted over them, so caller-supplied values
    /// win. An explicit etag in `meta` is used as is and the digest is
    /// not invoked.
    pub fn send_as_file<S>(
        &self,
        sink: &mut S,
        content: impl Into<Vec<u8>>,
        meta: &ContentMeta,
        extra_headers: Headers,
    ) -> ServeOutcome
    where
        S: ResponseSink + ?Sized,
    {
        let content = content.into();

        let content_type = match (&meta.content_type, &meta.ext) {
            (Some(content_type), _) => content_type.clone(),
            (None, Some(ext)) => self.content_types.lookup(ext),
            (None, None) => OCTET_STREAM.to_owned(),
        };
        let length = meta.length.unwrap_or(content.len() as u64);
        let etag = match &meta.etag {
            Some(etag) => quote(etag),
            None => quote(&self.digest.digest(&content)),
        };

        let mut headers = Headers::new();
        headers.insert(KnownHeaderName::ContentType, content_type);
        headers.insert(KnownHeaderName::ContentLength, length.to_string());
        headers.insert(KnownHeaderName::Etag, etag);
        for (name, values) in extra_headers.into_iter() {
            headers.insert(name, values);
        }

        if !write_ok_head(sink, headers) {
            return ServeOutcome::Superseded;
        }

        sink.end(Some(content));
        ServeOutcome::Delivered
    }
}

/// writes `200` and `headers`, then checks nothing else has since claimed
/// the response
fn write_ok_head<S: ResponseSink + ?Sized>(sink: &mut S, headers: Headers) -> bool {
    sink.write_head(Status::Ok, headers);
    match sink.status() {
        Some(Status::Ok) => true,
        other => {
            log::debug!(
                "response status became {:?} after writing headers, not sending body",
                other
            );
            false
        }
    }
}

/// Writes the plain-text error response for `reason`: its status, a
/// `text/plain` content-type, and its message as the body.
pub fn write_error<S: ResponseSink + ?Sized>(sink: &mut S, reason: FailureReason) {
    let mut headers = Headers::new();
    headers.insert(KnownHeaderName::ContentType, "text/plain");
    sink.write_head(reason.status(), headers);
    sink.end(Some(reason.message().as_bytes().to_vec()));
}

struct ReportOnce {
    callback: Box<dyn Fn(&ServeError) + Send + Sync + 'static>,
    reported: AtomicBool,
}

impl ReportOnce {
    fn new(callback: impl Fn(&ServeError) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            reported: AtomicBool::new(false),
        }
    }

    fn report(&self, error: &ServeError) {
        if !self.reported.swap(true, Ordering::SeqCst) {
            (self.callback)(error);
        }
    }

    fn fail(&self, error: ServeError) -> ServeOutcome {
        self.report(&error);
        ServeOutcome::Failed(error.reason())
    }
}

/// passes reads through, reporting the first read error
struct ReportingReader<R> {
    inner: R,
    path: PathBuf,
    reporter: Arc<ReportOnce>,
}

impl<R> ReportingReader<R> {
    fn new(inner: R, path: PathBuf, reporter: Arc<ReportOnce>) -> Self {
        Self {
            inner,
            path,
            reporter,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ReportingReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let result = ready!(Pin::new(&mut self.inner).poll_read(cx, buf));
        if let Err(error) = &result {
            self.reporter.report(&ServeError::Internal {
                path: self.path.clone(),
                source: io::Error::new(error.kind(), error.to_string()),
            });
        }
        Poll::Ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BufferedSink;
    use futures_lite::{future::block_on, AsyncReadExt};
    use std::sync::atomic::AtomicUsize;

    /// yields `good` and then fails every read
    struct FailingReader {
        good: Vec<u8>,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut [u8],
        ) -> Poll<io::Result<usize>> {
            if self.good.is_empty() {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk on fire")))
            } else {
                let n = buf.len().min(self.good.len());
                buf[..n].copy_from_slice(&self.good[..n]);
                self.good.drain(..n);
                Poll::Ready(Ok(n))
            }
        }
    }

    fn counting_reporter() -> (Arc<AtomicUsize>, Arc<ReportOnce>) {
        let count = Arc::new(AtomicUsize::new(0));
        let reporter = {
            let count = Arc::clone(&count);
            ReportOnce::new(move |error| {
                assert_eq!(error.reason(), FailureReason::InternalError);
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, Arc::new(reporter))
    }

    #[test]
    fn mid_stream_errors_are_reported_once() {
        let (count, reporter) = counting_reporter();
        let mut reader = ReportingReader::new(
            FailingReader {
                good: b"partial".to_vec(),
            },
            "/srv/www/a.txt".into(),
            reporter,
        );

        let mut received = Vec::new();
        let result = block_on(reader.read_to_end(&mut received));
        assert!(result.is_err());

        let mut more = [0; 4];
        assert!(block_on(reader.read(&mut more)).is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn buffered_sink_surfaces_stream_errors() {
        let (count, reporter) = counting_reporter();
        let reader = ReportingReader::new(
            FailingReader { good: vec![1, 2, 3] },
            "/srv/www/a.bin".into(),
            Arc::clone(&reporter),
        );

        let mut sink = BufferedSink::new();
        let result = block_on(sink.write_stream(Box::new(reader), 10));
        assert!(result.is_err());
        assert!(!sink.is_ended());

        reporter.report(&ServeError::Internal {
            path: "/srv/www/a.bin".into(),
            source: io::ErrorKind::Other.into(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_response() {
        let mut sink = BufferedSink::new();
        write_error(&mut sink, FailureReason::NotFound);
        assert_eq!(sink.status(), Some(Status::NotFound));
        assert_eq!(
            sink.headers().get_str(KnownHeaderName::ContentType),
            Some("text/plain")
        );
        assert_eq!(sink.body(), b"File Not Found");
        assert!(sink.is_ended());
    }
}
