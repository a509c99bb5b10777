use crate::{write_error, ContentMeta, FileResponder, ServeOutcome};
use std::path::Path;
use trillium::{Conn, Headers, KnownHeaderName};

/// conn extension trait to send individual files, or in-memory content
/// as though it were a file
#[trillium::async_trait]
pub trait StaticConnExt {
    /// Send the file at the provided path, answering a matching
    /// `If-None-Match` with 304. A missing path is a 404, a directory
    /// is a 403, and an unreadable file is a 502, each with a plain-text
    /// body.
    async fn send_path<A: AsRef<Path> + Send>(self, path: A) -> Self;

    /// Send the file at the provided path using a configured
    /// [`FileResponder`]. Otherwise identical to
    /// [`send_path`](StaticConnExt::send_path).
    async fn send_path_with_responder<A: AsRef<Path> + Send>(
        self,
        path: A,
        responder: &FileResponder,
    ) -> Self;

    /// Send the file at the provided path with `etag` as its entity tag
    /// instead of one derived from the file's metadata. A client holding
    /// that tag gets a 304.
    async fn send_path_with_etag<A: AsRef<Path> + Send>(self, path: A, etag: &str) -> Self;

    /// Send `content` with file semantics. See
    /// [`FileResponder::send_as_file`].
    fn send_as_file(
        self,
        content: impl Into<Vec<u8>> + Send,
        meta: &ContentMeta,
        headers: Headers,
    ) -> Self;

    /// the request's `If-None-Match` header, or `""`
    fn if_none_match(&self) -> &str;
}

#[trillium::async_trait]
impl StaticConnExt for Conn {
    async fn send_path<A: AsRef<Path> + Send>(self, path: A) -> Self {
        self.send_path_with_responder(path, &FileResponder::default())
            .await
    }

    async fn send_path_with_responder<A: AsRef<Path> + Send>(
        self,
        path: A,
        responder: &FileResponder,
    ) -> Self {
        send(self, path.as_ref(), responder, None).await
    }

    async fn send_path_with_etag<A: AsRef<Path> + Send>(self, path: A, etag: &str) -> Self {
        send(self, path.as_ref(), &FileResponder::default(), Some(etag)).await
    }

    fn send_as_file(
        mut self,
        content: impl Into<Vec<u8>> + Send,
        meta: &ContentMeta,
        headers: Headers,
    ) -> Self {
        FileResponder::default().send_as_file(&mut self, content, meta, headers);
        self
    }

    fn if_none_match(&self) -> &str {
        self.request_headers()
            .get_str(KnownHeaderName::IfNoneMatch)
            .unwrap_or_default()
    }
}

async fn send(
    mut conn: Conn,
    path: &Path,
    responder: &FileResponder,
    etag: Option<&str>,
) -> Conn {
    let client_etag = conn.if_none_match().to_owned();
    let url = conn.path().to_owned();
    let peer_ip = conn
        .inner()
        .peer_ip()
        .map_or_else(|| String::from("-"), |ip| ip.to_string());

    let outcome = responder
        .serve_with_etag(&mut conn, path, &client_etag, etag, move |error| {
            let reason = error.reason();
            log::debug!(
                "{} - {} - {} - {} ({})",
                reason.status() as u16,
                url,
                peer_ip,
                reason,
                error
            );
        })
        .await;

    if let ServeOutcome::Failed(reason) = outcome {
        let headers = conn.response_headers_mut();
        headers.remove(KnownHeaderName::ContentLength);
        headers.remove(KnownHeaderName::Etag);
        write_error(&mut conn, reason);
    }

    conn
}
