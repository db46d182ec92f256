//! Typed ID wrappers for type safety across cinedex.
//!
//! Catalog ids are numeric and live in separate namespaces: a movie and a show
//! may share the same number without referring to the same entity, so they
//! get distinct wrapper types. Video file ids are derived from the owning
//! source and the file path so that re-scans recognise the same file.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog identifier of a movie.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MovieId(u64);

impl MovieId {
    /// Wrap a raw catalog id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw catalog id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for MovieId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog identifier of a TV show.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ShowId(u64);

impl ShowId {
    /// Wrap a raw catalog id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw catalog id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ShowId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ShowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A show season, addressed by its show and season number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeasonKey {
    pub show_id: ShowId,
    pub season: u32,
}

impl SeasonKey {
    #[must_use]
    pub const fn new(show_id: ShowId, season: u32) -> Self {
        Self { show_id, season }
    }
}

impl std::fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.show_id, self.season)
    }
}

/// Identifier of a configured media source (from the config file).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespace for deriving [`VideoFileId`]s.
const VIDEO_FILE_NAMESPACE: Uuid = Uuid::from_u128(0x5f1c_2e8a_93d4_4b7e_a0c6_1d2f_3b4a_5c6d);

/// Identifier of a video file, stable across scans.
///
/// Identity is the pair `(source, path)`; the same pair always yields the same
/// id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoFileId(Uuid);

impl VideoFileId {
    /// Derive the id of the file at `path` on `source`.
    #[must_use]
    pub fn derive(source: &SourceId, path: &str) -> Self {
        let key = format!("{}\u{0}{}", source.as_str(), path);
        Self(Uuid::new_v5(&VIDEO_FILE_NAMESPACE, key.as_bytes()))
    }
}

impl From<Uuid> for VideoFileId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<VideoFileId> for Uuid {
    fn from(id: VideoFileId) -> Self {
        id.0
    }
}

impl std::fmt::Display for VideoFileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_file_id_is_deterministic() {
        let source = SourceId::new("nas");
        let a = VideoFileId::derive(&source, "/tv/Show/S01E01.mkv");
        let b = VideoFileId::derive(&source, "/tv/Show/S01E01.mkv");
        assert_eq!(a, b);
    }

    #[test]
    fn test_video_file_id_depends_on_source_and_path() {
        let nas = SourceId::new("nas");
        let local = SourceId::new("local");
        let path = "/movies/Heat.1995.mkv";

        assert_ne!(
            VideoFileId::derive(&nas, path),
            VideoFileId::derive(&local, path)
        );
        assert_ne!(
            VideoFileId::derive(&nas, path),
            VideoFileId::derive(&nas, "/movies/Heat.1995.mp4")
        );
    }

    #[test]
    fn test_catalog_ids_are_separate_types() {
        let movie = MovieId::new(42);
        let show = ShowId::new(42);
        assert_eq!(movie.get(), show.get());
        assert_eq!(movie.to_string(), "42");
    }

    #[test]
    fn test_season_key_display() {
        let key = SeasonKey::new(ShowId::new(1399), 2);
        assert_eq!(key.to_string(), "1399:2");
    }

    #[test]
    fn test_serde_transparent() {
        let id = MovieId::new(603);
        assert_eq!(serde_json::to_string(&id).unwrap(), "603");

        let source: SourceId = serde_json::from_str("\"nas\"").unwrap();
        assert_eq!(source.as_str(), "nas");
    }
}
