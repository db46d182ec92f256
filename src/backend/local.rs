use std::path::Path;

use async_trait::async_trait;
use cinedex_common::SourceKind;

use super::{Backend, BackendResult, DirEntry};

/// Backend for directories on the local filesystem.
///
/// Paths are absolute filesystem paths and double as resolved URLs.
#[derive(Debug, Default, Clone)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

/// List a local directory, following symlinks and skipping hidden entries.
pub(crate) async fn list_dir(dir: &Path) -> BackendResult<Vec<DirEntry>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();

        // Skip hidden files starting with .
        if name.starts_with('.') {
            continue;
        }

        // Follows symlinks; dangling links are skipped
        let Ok(metadata) = tokio::fs::metadata(entry.path()).await else {
            continue;
        };

        entries.push(if metadata.is_dir() {
            DirEntry::directory(name)
        } else {
            DirEntry::file(name, metadata.len())
        });
    }

    Ok(entries)
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn list(&self, path: &str) -> BackendResult<Vec<DirEntry>> {
        list_dir(Path::new(path)).await
    }

    fn resolve_url(&self, path: &str) -> String {
        path.to_string()
    }
}
