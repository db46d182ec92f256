//! Recursive directory walk over one source.
//!
//! All children of a directory are processed concurrently and the walk of
//! that directory completes only when every child has. Directory listings
//! are additionally capped across the whole scan by a shared semaphore.

use std::sync::Arc;

use cinedex_common::{paths, SourceId};
use cinedex_db::models::VideoFile;
use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::resolver::Resolver;
use super::state::ScanState;
use crate::backend::{Backend, BackendError, BackendResult, DirEntry};

pub(crate) struct Walker<'a> {
    source_id: SourceId,
    backend: Arc<dyn Backend>,
    resolver: &'a Resolver,
    state: &'a ScanState,
    listings: &'a Semaphore,
}

impl<'a> Walker<'a> {
    pub fn new(
        source_id: SourceId,
        backend: Arc<dyn Backend>,
        resolver: &'a Resolver,
        state: &'a ScanState,
        listings: &'a Semaphore,
    ) -> Self {
        Self {
            source_id,
            backend,
            resolver,
            state,
            listings,
        }
    }

    /// Walk everything below `root`.
    ///
    /// Failing to list the root itself is returned to the caller; failures
    /// further down only skip the affected subtree.
    pub async fn walk(&self, root: &str) -> Result<(), BackendError> {
        let (dir, entries) = self.list(root).await?;
        self.visit_entries(&dir, entries).await;
        Ok(())
    }

    /// List `path`, retrying once with the percent-decoded path on backends
    /// whose servers may double-encode names. Returns the path that worked.
    async fn list(&self, path: &str) -> BackendResult<(String, Vec<DirEntry>)> {
        let first = self.list_once(path).await;
        let err = match first {
            Ok(entries) => return Ok((path.to_string(), entries)),
            Err(err) => err,
        };

        if !self.backend.kind().retries_decoded_paths() {
            return Err(err);
        }
        let decoded = match urlencoding::decode(path) {
            Ok(decoded) if decoded != path => decoded.into_owned(),
            _ => return Err(err),
        };

        debug!(path, error = %err, "Listing failed, retrying with decoded path");
        let entries = self.list_once(&decoded).await?;
        Ok((decoded, entries))
    }

    async fn list_once(&self, path: &str) -> BackendResult<Vec<DirEntry>> {
        let _permit = self
            .listings
            .acquire()
            .await
            .map_err(|_| BackendError::InvalidPath("listing limiter closed".to_string()))?;
        self.backend.list(path).await
    }

    fn visit_dir(&self, path: String) -> BoxFuture<'_, ()> {
        async move {
            match self.list(&path).await {
                Ok((dir, entries)) => self.visit_entries(&dir, entries).await,
                Err(e) => {
                    warn!(source_id = %self.source_id, path = %path, error = %e, "Skipping unreadable directory");
                }
            }
        }
        .boxed()
    }

    async fn visit_entries(&self, dir: &str, entries: Vec<DirEntry>) {
        let children = entries.into_iter().filter_map(|entry| {
            let path = paths::join(dir, &entry.name);
            if entry.is_dir() {
                Some(self.visit_dir(path))
            } else if paths::is_video_file(&entry.name) {
                Some(self.visit_file(path).boxed())
            } else {
                None
            }
        });
        join_all(children).await;
    }

    async fn visit_file(&self, path: String) {
        let url = self.backend.resolve_url(&path);
        let file = VideoFile::new(self.source_id.clone(), path, url);
        if !self.state.mark_found(file.id) {
            return;
        }
        if self.state.refresh_known_file(&file) {
            return;
        }
        self.resolver.resolve(self.state, file).await;
    }
}
