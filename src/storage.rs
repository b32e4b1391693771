use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

/// Output directory that generated artifacts are written into.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
}

impl LocalFileStorage {
    /// Resolves `directory` against the current working directory.
    pub fn new(directory: impl AsRef<Path>) -> io::Result<Self> {
        let base_dir = std::path::absolute(directory.as_ref())?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve_path(&self, file_name: &str, extension: &str) -> PathBuf {
        self.base_dir.join(format!("{file_name}.{extension}"))
    }

    /// Writes `data` to `{base_dir}/{file_name}.{extension}`, creating directories as needed.
    pub async fn put(&self, file_name: &str, extension: &str, data: &[u8]) -> io::Result<PathBuf> {
        let path = self.resolve_path(file_name, extension);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        debug!(path = %path.display(), bytes = data.len(), "artifact written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_creates_nested_directories() {
        let temp = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(temp.path().join("a/b/c")).unwrap();
        let path = storage.put("icon", "png", b"bytes").await.unwrap();
        assert_eq!(path, temp.path().join("a/b/c/icon.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn put_overwrites_existing_file() {
        let temp = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(temp.path()).unwrap();
        storage.put("image", "svg", b"first").await.unwrap();
        let path = storage.put("image", "svg", b"second").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"second");
    }

    #[test]
    fn relative_directories_become_absolute() {
        let storage = LocalFileStorage::new("./output").unwrap();
        assert!(storage.base_dir().is_absolute());
        assert!(storage.resolve_path("image", "png").ends_with("output/image.png"));
    }
}
