use mime_guess::mime::{APPLICATION, HTML, JAVASCRIPT, TEXT};

/// content type used when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Looks up a content type from a file extension or path.
///
/// Any `Fn(&str) -> String` is a `ContentTypes`.
pub trait ContentTypes: Send + Sync + 'static {
    /// content type for an extension (`"txt"`, `".txt"`) or path
    fn lookup(&self, extension_or_path: &str) -> String;
}

impl<F> ContentTypes for F
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    fn lookup(&self, extension_or_path: &str) -> String {
        self(extension_or_path)
    }
}

/// The default [`ContentTypes`], backed by
/// [`mime_guess`](https://docs.rs/mime_guess). Textual types are given a
/// utf-8 charset and unknown extensions are `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeGuess;

impl ContentTypes for MimeGuess {
    fn lookup(&self, extension_or_path: &str) -> String {
        let guess = match extension_or_path.strip_prefix('.') {
            Some(ext) if !ext.contains('/') => mime_guess::from_ext(ext),
            _ if !extension_or_path.contains(['.', '/']) => {
                mime_guess::from_ext(extension_or_path)
            }
            _ => mime_guess::from_path(extension_or_path),
        };

        let Some(mime) = guess.first() else {
            return OCTET_STREAM.to_owned();
        };

        let is_text = matches!(
            (mime.type_(), mime.subtype()),
            (APPLICATION, JAVASCRIPT) | (TEXT, _) | (_, HTML)
        );

        if is_text {
            format!("{mime}; charset=utf-8")
        } else {
            mime.to_string()
        }
    }
}
