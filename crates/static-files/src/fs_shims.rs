cfg_if::cfg_if! {
    if #[cfg(feature = "tokio")] {
        pub(crate) use tokio_crate::fs::{metadata, File};

        pub(crate) type FileReader = async_compat::Compat<File>;

        pub(crate) async fn open(path: &std::path::Path) -> std::io::Result<FileReader> {
            File::open(path).await.map(async_compat::Compat::new)
        }
    } else if #[cfg(feature = "async-std")] {
        pub(crate) use async_std_crate::fs::{metadata, File};

        pub(crate) type FileReader = File;

        pub(crate) async fn open(path: &std::path::Path) -> std::io::Result<FileReader> {
            File::open(path).await
        }
    } else if #[cfg(feature = "smol")] {
        pub(crate) use async_fs::{metadata, File};

        pub(crate) type FileReader = File;

        pub(crate) async fn open(path: &std::path::Path) -> std::io::Result<FileReader> {
            File::open(path).await
        }
    } else {
        use std::io::{Error, ErrorKind, Result};

        const NO_RUNTIME: &str = "please enable the tokio, async-std, or smol runtime feature";

        pub(crate) type FileReader = futures_lite::io::Empty;

        pub(crate) async fn metadata(
            _path: impl AsRef<std::path::Path>,
        ) -> Result<std::fs::Metadata> {
            Err(Error::new(ErrorKind::Unsupported, NO_RUNTIME))
        }

        pub(crate) async fn open(_path: &std::path::Path) -> Result<FileReader> {
            Err(Error::new(ErrorKind::Unsupported, NO_RUNTIME))
        }
    }
}
