use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cinedex_common::SourceKind;

use super::{local::list_dir, Backend, BackendError, BackendResult, DirEntry};

/// Backend for an SMB share that is mounted on this machine.
///
/// Listings go through the mount point; resolved URLs use the `smb://` form
/// so players can open the file directly from the server.
#[derive(Debug, Clone)]
pub struct SmbBackend {
    /// `smb://host/share`, without a trailing slash.
    url: String,
    mount_point: PathBuf,
}

impl SmbBackend {
    pub fn new(url: String, mount_point: PathBuf) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            mount_point,
        }
    }

    /// Map a share path onto the mount point, refusing to leave it.
    fn local_path(&self, path: &str) -> BackendResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(BackendError::InvalidPath(path.to_string()));
        }
        Ok(self.mount_point.join(relative))
    }
}

#[async_trait]
impl Backend for SmbBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Smb
    }

    async fn list(&self, path: &str) -> BackendResult<Vec<DirEntry>> {
        list_dir(&self.local_path(path)?).await
    }

    fn resolve_url(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_through_mount_point() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Movies")).unwrap();
        std::fs::write(dir.path().join("Movies/Heat.1995.mkv"), b"x").unwrap();

        let backend = SmbBackend::new("smb://server/media/".into(), dir.path().to_path_buf());
        let entries = backend.list("/Movies").await.unwrap();

        assert_eq!(entries, vec![DirEntry::file("Heat.1995.mkv", 1)]);
        assert_eq!(
            backend.resolve_url("/Movies/Heat.1995.mkv"),
            "smb://server/media/Movies/Heat.1995.mkv"
        );
    }

    #[tokio::test]
    async fn test_rejects_parent_components() {
        let backend = SmbBackend::new("smb://server/media".into(), "/mnt/media".into());
        let err = backend.list("/../etc").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidPath(_)));
    }
}
