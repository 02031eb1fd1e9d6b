use crate::domain::jobs::StreamId;
use crate::ports::storage::StagingStore;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FsAdapter {
    root: PathBuf,
}

impl FsAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StagingStore for FsAdapter {
    async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    async fn exists(&self, name: &str) -> bool {
        tokio::fs::try_exists(self.root.join(name))
            .await
            .unwrap_or(false)
    }

    async fn purge_segments(&self, id: &StreamId) -> io::Result<usize> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !id.owns_segment(name) {
                continue;
            }
            // ffmpeg's delete_segments may have beaten us to it.
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_purge_removes_only_owned_segments() {
        let dir = tempdir().unwrap();
        let store = FsAdapter::new(dir.path());
        let id = StreamId::from("stream_1_aaaaa");
        let other = StreamId::from("stream_2_bbbbb");

        for i in 0..6 {
            std::fs::write(dir.path().join(format!("{}_{:03}.ts", id, i)), b"ts").unwrap();
        }
        std::fs::write(dir.path().join(id.output_file_name()), b"#EXTM3U").unwrap();
        std::fs::write(dir.path().join(format!("{}_000.ts", other)), b"ts").unwrap();

        let removed = store.purge_segments(&id).await.unwrap();
        assert_eq!(removed, 6);

        for i in 0..6 {
            assert!(!dir.path().join(format!("{}_{:03}.ts", id, i)).exists());
        }
        assert!(dir.path().join(id.output_file_name()).exists());
        assert!(dir.path().join(format!("{}_000.ts", other)).exists());

        // Nothing left to remove the second time.
        assert_eq!(store.purge_segments(&id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_missing_dir() {
        let dir = tempdir().unwrap();
        let store = FsAdapter::new(dir.path().join("not-created"));
        let removed = store.purge_segments(&StreamId::from("stream_1_aaaaa")).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_ensure_dir_and_exists() {
        let dir = tempdir().unwrap();
        let store = FsAdapter::new(dir.path().join("public").join("streams"));
        store.ensure_dir().await.unwrap();
        assert!(!store.exists("restream.m3u").await);

        std::fs::write(store.path_of("restream.m3u"), "#EXTM3U\n").unwrap();
        assert!(store.exists("restream.m3u").await);
    }
}
