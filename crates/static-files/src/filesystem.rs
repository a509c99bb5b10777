use crate::{fs_shims, BodyStream};
use futures_lite::io;
use std::{fs::Metadata, path::Path};

/// The filesystem operations file delivery needs: stat a path and open
/// it as a byte stream.
#[trillium::async_trait]
pub trait Filesystem: Send + Sync + 'static {
    /// metadata for `path`, following symlinks
    async fn metadata(&self, path: &Path) -> io::Result<Metadata>;

    /// opens `path` for reading
    async fn open(&self, path: &Path) -> io::Result<BodyStream>;
}

/// The default [`Filesystem`], using the async runtime selected by cargo
/// feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeFilesystem;

#[trillium::async_trait]
impl Filesystem for RuntimeFilesystem {
    async fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        fs_shims::metadata(path).await
    }

    async fn open(&self, path: &Path) -> io::Result<BodyStream> {
        let file = fs_shims::open(path).await?;
        Ok(Box::new(file))
    }
}
