use ::etag::EntityTag;
use std::{
    fs::Metadata,
    time::{SystemTime, UNIX_EPOCH},
};

/// A deterministic content fingerprint function used to synthesize
/// etags. Identical input must always produce identical output.
///
/// Any `Fn(&[u8]) -> String` is a `Digest`.
pub trait Digest: Send + Sync + 'static {
    /// fingerprint `bytes`
    fn digest(&self, bytes: &[u8]) -> String;
}

impl<F> Digest for F
where
    F: Fn(&[u8]) -> String + Send + Sync + 'static,
{
    fn digest(&self, bytes: &[u8]) -> String {
        self(bytes)
    }
}

/// The default [`Digest`], backed by the content hash of the
/// [`etag`](https://docs.rs/etag) crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EtagDigest;

impl Digest for EtagDigest {
    fn digest(&self, bytes: &[u8]) -> String {
        EntityTag::from_data(bytes).tag().to_owned()
    }
}

/// The stat-derived facts an etag is computed from. Built fresh for
/// every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    /// file length in bytes
    pub size: u64,
    /// inode number, or zero where the platform has none
    pub inode: u64,
    /// modification time in milliseconds relative to the unix epoch
    pub modified_millis: i64,
}

impl FileMeta {
    /// extracts the fingerprint inputs from filesystem metadata
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            size: metadata.len(),
            inode: inode(metadata),
            modified_millis: metadata.modified().map(unix_millis).unwrap_or_default(),
        }
    }

    /// `size-inode-modifiedMillis`, the input to the file etag digest
    pub fn fingerprint(&self) -> String {
        format!("{}-{}-{}", self.size, self.inode, self.modified_millis)
    }

    /// the quoted etag for this file
    pub fn etag(&self, digest: &dyn Digest) -> String {
        quote(&digest.digest(self.fingerprint().as_bytes()))
    }
}

#[cfg(unix)]
fn inode(metadata: &Metadata) -> u64 {
    std::os::unix::fs::MetadataExt::ino(metadata)
}

#[cfg(not(unix))]
fn inode(_metadata: &Metadata) -> u64 {
    0
}

fn unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
    }
}

/// Wraps an etag value in exactly one pair of double quotes. Values
/// that are already quoted are returned unchanged.
///
/// ```
/// use trillium_static_files::quote;
/// assert_eq!(quote("abc"), "\"abc\"");
/// assert_eq!(quote("\"abc\""), "\"abc\"");
/// ```
pub fn quote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value.to_owned()
    } else {
        format!("\"{value}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fingerprint_format() {
        let meta = FileMeta {
            size: 42,
            inode: 1234,
            modified_millis: 1_700_000_000_123,
        };
        assert_eq!(meta.fingerprint(), "42-1234-1700000000123");
    }

    #[test]
    fn etag_is_quoted_digest_of_fingerprint() {
        let meta = FileMeta {
            size: 1,
            inode: 2,
            modified_millis: 3,
        };
        let digest = |bytes: &[u8]| String::from_utf8_lossy(bytes).to_uppercase();
        assert_eq!(meta.etag(&digest), "\"1-2-3\"");
    }

    #[test]
    fn default_digest_is_deterministic() {
        let first = EtagDigest.digest(b"42-1234-5678");
        assert_eq!(first, EtagDigest.digest(b"42-1234-5678"));
        assert_ne!(first, EtagDigest.digest(b"42-1234-5679"));
        assert!(!first.contains('"'));
    }

    #[test]
    fn millis_before_the_epoch_are_negative() {
        assert_eq!(unix_millis(UNIX_EPOCH + Duration::from_millis(1500)), 1500);
        assert_eq!(unix_millis(UNIX_EPOCH - Duration::from_millis(1500)), -1500);
    }

    #[test]
    fn quoting_is_never_doubled() {
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("\""), "\"\"\"");
        assert_eq!(quote(&quote("x")), "\"x\"");
    }
}
