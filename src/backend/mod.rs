//! Directory listing backends.
//!
//! A [`Backend`] lists one directory at a time and turns a path into a URL a
//! player can open. The scanner never touches a backend's transport directly.

mod local;
mod smb;
mod webdav;

pub use local::LocalBackend;
pub use smb::SmbBackend;
pub use webdav::WebDavBackend;

use std::sync::Arc;

use async_trait::async_trait;
use cinedex_common::{EntryKind, SourceKind};

use crate::config::SourceConfig;

/// Failure of a backend operation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    #[error("failed to parse listing: {0}")]
    Parse(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
}

impl DirEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Uniform listing interface over the supported source types.
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// List the direct children of `path`.
    async fn list(&self, path: &str) -> BackendResult<Vec<DirEntry>>;

    /// URL a player can open `path` with.
    fn resolve_url(&self, path: &str) -> String;
}

/// Build the backend described by a source configuration.
pub fn build_backend(source: &SourceConfig) -> BackendResult<Arc<dyn Backend>> {
    let missing = |field: &str| {
        BackendError::InvalidPath(format!("source '{}' has no {field}", source.id))
    };

    Ok(match source.kind {
        SourceKind::Local => Arc::new(LocalBackend::new()),
        SourceKind::Webdav => {
            let url = source.url.clone().ok_or_else(|| missing("url"))?;
            Arc::new(WebDavBackend::new(
                url,
                source.username.clone(),
                source.password.clone(),
            )?)
        }
        SourceKind::Smb => {
            let url = source.url.clone().ok_or_else(|| missing("url"))?;
            let mount = source
                .mount_point
                .clone()
                .ok_or_else(|| missing("mount_point"))?;
            Arc::new(SmbBackend::new(url, mount))
        }
    })
}

/// Percent-encode every segment of a `/`-separated path.
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
