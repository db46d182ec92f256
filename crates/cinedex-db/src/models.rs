//! Library models.
//!
//! Movies and shows are catalog entities keyed by their catalog id. Shows own
//! an ordered set of seasons, seasons an ordered set of episodes. Video files
//! hang off movies and episodes; a file belongs to exactly one of them.

use std::collections::{BTreeMap, HashSet};

use cinedex_common::{MovieId, ShowId, SourceId, VideoFileId};
use serde::{Deserialize, Serialize};

/// A video file discovered on a source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoFile {
    pub id: VideoFileId,
    /// File name without directories.
    pub name: String,
    /// Path on the source, as listed by the backend.
    pub file_path: String,
    /// URL a player can open the file with.
    pub resolved_url: String,
    pub source_id: SourceId,
    /// Set when a user assigned this file by hand; scans never re-identify it.
    pub manually_matched: bool,
}

impl VideoFile {
    /// Create a file record for `file_path` on `source_id`.
    pub fn new(source_id: SourceId, file_path: impl Into<String>, resolved_url: impl Into<String>) -> Self {
        let file_path = file_path.into();
        Self {
            id: VideoFileId::derive(&source_id, &file_path),
            name: cinedex_common::paths::file_name(&file_path).to_string(),
            file_path,
            resolved_url: resolved_url.into(),
            source_id,
            manually_matched: false,
        }
    }
}

/// The entity a video file is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileOwner {
    Movie(MovieId),
    Episode {
        show_id: ShowId,
        season: u32,
        episode: u32,
    },
}

/// Rating imported from the external ratings dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExternalRating {
    pub rating: f64,
    pub votes: u32,
}

/// A movie and the files that contain it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub logo_path: Option<String>,
    /// Catalog community rating.
    pub rating: Option<f64>,
    pub status: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub imdb_id: Option<String>,
    pub external_rating: Option<ExternalRating>,
    pub files: Vec<VideoFile>,
}

impl Movie {
    /// Drop files not accepted by `keep`, returning how many were removed.
    pub fn retain_files(&mut self, mut keep: impl FnMut(&VideoFile) -> bool) -> usize {
        let before = self.files.len();
        self.files.retain(|f| keep(f));
        before - self.files.len()
    }
}

/// A TV show with its seasons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    pub original_title: Option<String>,
    pub first_air_year: Option<u16>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub logo_path: Option<String>,
    pub rating: Option<f64>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub imdb_id: Option<String>,
    pub external_rating: Option<ExternalRating>,
    pub seasons: BTreeMap<u32, Season>,
}

impl Show {
    /// Get or create the season with `number`.
    pub fn season_mut(&mut self, number: u32) -> &mut Season {
        self.seasons
            .entry(number)
            .or_insert_with(|| Season::new(number))
    }

    pub fn episode(&self, season: u32, episode: u32) -> Option<&Episode> {
        self.seasons.get(&season)?.episodes.get(&episode)
    }

    pub fn episode_mut(&mut self, season: u32, episode: u32) -> Option<&mut Episode> {
        self.seasons.get_mut(&season)?.episodes.get_mut(&episode)
    }

    /// Every file attached to any episode of the show.
    pub fn files(&self) -> impl Iterator<Item = &VideoFile> {
        self.seasons
            .values()
            .flat_map(|s| s.episodes.values())
            .flat_map(|e| e.files.iter())
    }

    /// Drop episode files not accepted by `keep`, returning how many were
    /// removed.
    pub fn retain_files(&mut self, mut keep: impl FnMut(&VideoFile) -> bool) -> usize {
        let mut removed = 0;
        for episode in self.seasons.values_mut().flat_map(|s| s.episodes.values_mut()) {
            let before = episode.files.len();
            episode.files.retain(|f| keep(f));
            removed += before - episode.files.len();
        }
        removed
    }

    /// Whether no episode has any file left.
    pub fn is_empty(&self) -> bool {
        self.files().next().is_none()
    }
}

/// A season of a show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Season {
    pub number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub episodes: BTreeMap<u32, Episode>,
}

impl Season {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }
}

/// An episode of a season.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Episode {
    pub number: u32,
    pub name: String,
    pub overview: Option<String>,
    pub still_path: Option<String>,
    pub air_date: Option<String>,
    pub files: Vec<VideoFile>,
}

impl Episode {
    /// An episode the catalog has no details for yet.
    pub fn placeholder(number: u32) -> Self {
        Self {
            number,
            name: format!("Episode {number}"),
            ..Default::default()
        }
    }

    /// Whether the name is the generated `Episode {n}` stand-in rather than a
    /// confirmed title.
    pub fn has_placeholder_name(&self) -> bool {
        self.name
            .strip_prefix("Episode ")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
    }
}

/// The persisted library as loaded at scan start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LibrarySnapshot {
    pub movies: BTreeMap<MovieId, Movie>,
    pub shows: BTreeMap<ShowId, Show>,
}

impl LibrarySnapshot {
    /// Ids of every file attached to a movie or episode.
    pub fn file_ids(&self) -> HashSet<VideoFileId> {
        self.movies
            .values()
            .flat_map(|m| m.files.iter())
            .chain(self.shows.values().flat_map(|s| s.files()))
            .map(|f| f.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> VideoFile {
        VideoFile::new(SourceId::new("nas"), path, path)
    }

    #[test]
    fn test_video_file_new_derives_identity() {
        let a = file("/movies/Heat.1995.mkv");
        assert_eq!(a.name, "Heat.1995.mkv");
        assert_eq!(a.id, VideoFileId::derive(&SourceId::new("nas"), "/movies/Heat.1995.mkv"));
        assert!(!a.manually_matched);
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(Episode::placeholder(7).has_placeholder_name());

        let mut named = Episode::placeholder(7);
        named.name = "Pilot".to_string();
        assert!(!named.has_placeholder_name());

        named.name = "Episode Seven".to_string();
        assert!(!named.has_placeholder_name());

        named.name = "Episode ".to_string();
        assert!(!named.has_placeholder_name());
    }

    #[test]
    fn test_show_retain_files_and_emptiness() {
        let mut show = Show {
            id: ShowId::new(1),
            title: "Show".into(),
            ..Default::default()
        };
        let mut ep = Episode::placeholder(1);
        ep.files.push(file("/tv/a.mkv"));
        ep.files.push(file("/tv/b.mkv"));
        show.season_mut(1).episodes.insert(1, ep);

        assert!(!show.is_empty());
        assert_eq!(show.retain_files(|f| f.file_path == "/tv/a.mkv"), 1);
        assert_eq!(show.files().count(), 1);
        assert_eq!(show.retain_files(|_| false), 1);
        assert!(show.is_empty());
    }

    #[test]
    fn test_snapshot_file_ids() {
        let mut movie = Movie {
            id: MovieId::new(1),
            ..Default::default()
        };
        movie.files.push(file("/m.mkv"));
        let mut snapshot = LibrarySnapshot::default();
        snapshot.movies.insert(movie.id, movie);

        assert_eq!(snapshot.file_ids().len(), 1);
    }
}
