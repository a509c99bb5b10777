use futures_lite::{io, AsyncRead, AsyncReadExt};
use trillium::{Body, Conn, Headers, Status};

/// a byte stream handed to a [`ResponseSink`]
pub type BodyStream = Box<dyn AsyncRead + Send + Sync + Unpin + 'static>;

/// The response-writing primitives file delivery is expressed in.
///
/// Implemented for [`trillium::Conn`], where a streamed body is handed to
/// trillium to forward chunk by chunk, and for the in-memory
/// [`BufferedSink`].
#[trillium::async_trait]
pub trait ResponseSink: Send {
    /// the status currently set on the response, if any
    fn status(&self) -> Option<Status>;

    /// Sets the response status and inserts `headers`, replacing any
    /// previous values for the same names. The `Conn` implementation
    /// leaves a response that already carries a non-200 status untouched
    /// when asked for a 200.
    fn write_head(&mut self, status: Status, headers: Headers);

    /// Forwards `body`, `len` bytes long, to the client unchanged and in
    /// order. The response is complete once the stream is exhausted.
    async fn write_stream(&mut self, body: BodyStream, len: u64) -> io::Result<()>;

    /// completes the response, optionally with a final body
    fn end(&mut self, body: Option<Vec<u8>>);
}

#[trillium::async_trait]
impl ResponseSink for Conn {
    fn status(&self) -> Option<Status> {
        Conn::status(self)
    }

    fn write_head(&mut self, status: Status, headers: Headers) {
        // a status chosen earlier in the handler chain wins over 200
        if status == Status::Ok && matches!(Conn::status(self), Some(s) if s != Status::Ok) {
            return;
        }

        self.set_status(status);
        let response_headers = self.response_headers_mut();
        for (name, values) in headers.into_iter() {
            response_headers.insert(name, values);
        }
    }

    async fn write_stream(&mut self, body: BodyStream, len: u64) -> io::Result<()> {
        self.set_body(Body::new_streaming(body, Some(len)));
        self.set_halted(true);
        Ok(())
    }

    fn end(&mut self, body: Option<Vec<u8>>) {
        if let Some(body) = body {
            self.set_body(body);
        }
        self.set_halted(true);
    }
}

/// A [`ResponseSink`] that collects the whole response in memory.
///
/// ```
/// use trillium::{Headers, Status};
/// use trillium_static_files::{BufferedSink, ResponseSink};
///
/// let mut sink = BufferedSink::new();
/// sink.write_head(Status::Ok, Headers::new());
/// sink.end(Some(b"hello".to_vec()));
/// assert_eq!(sink.status(), Some(Status::Ok));
/// assert_eq!(sink.body(), b"hello");
/// assert!(sink.is_ended());
/// ```
#[derive(Debug, Default)]
pub struct BufferedSink {
    status: Option<Status>,
    headers: Headers,
    body: Vec<u8>,
    ended: bool,
}

impl BufferedSink {
    /// an empty sink with no status
    pub fn new() -> Self {
        Self::default()
    }

    /// the response headers written so far
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// the response body bytes written so far
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// takes the collected body, leaving an empty one behind
    pub fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }

    /// whether the response has been completed
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

#[trillium::async_trait]
impl ResponseSink for BufferedSink {
    fn status(&self) -> Option<Status> {
        self.status
    }

    fn write_head(&mut self, status: Status, headers: Headers) {
        self.status = Some(status);
        for (name, values) in headers.into_iter() {
            self.headers.insert(name, values);
        }
    }

    async fn write_stream(&mut self, mut body: BodyStream, _len: u64) -> io::Result<()> {
        body.read_to_end(&mut self.body).await?;
        self.ended = true;
        Ok(())
    }

    fn end(&mut self, body: Option<Vec<u8>>) {
        if let Some(body) = body {
            self.body.extend_from_slice(&body);
        }
        self.ended = true;
    }
}
