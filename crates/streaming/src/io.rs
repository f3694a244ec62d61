use std::fs;
use std::path::{Path, PathBuf};

/// The only url scheme that resolves to a resource.
pub const FILE_SCHEME: &str = "file://";

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("unsupported url {url:?}: only file:// resources can be loaded")]
    UnsupportedScheme { url: String },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("resource is empty: {}", path.display())]
    Empty { path: PathBuf },
}

/// Synchronous resource reads, performed on the render thread.
///
/// Payloads are raw bytes; text encoding is the decoder's concern.
pub trait ResourceLoader {
    fn load(&self, url: &str) -> Result<Vec<u8>, ResourceError>;
}

impl<F> ResourceLoader for F
where
    F: Fn(&str) -> Result<Vec<u8>, ResourceError>,
{
    fn load(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        self(url)
    }
}

/// Reads `file://` urls from the local filesystem.
///
/// Relative paths are joined onto `root` when one is set, otherwise they
/// resolve against the working directory.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    root: Option<PathBuf>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn resolve(&self, url: &str) -> Result<PathBuf, ResourceError> {
        let path = url
            .strip_prefix(FILE_SCHEME)
            .map(Path::new)
            .ok_or_else(|| ResourceError::UnsupportedScheme {
                url: url.to_string(),
            })?;

        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl ResourceLoader for FileLoader {
    fn load(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let path = self.resolve(url)?;
        let payload = fs::read(&path).map_err(|source| ResourceError::Io {
            path: path.clone(),
            source,
        })?;
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Err(ResourceError::Empty { path });
        }
        Ok(payload)
    }
}
