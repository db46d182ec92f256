//! # cinedex-parser
//!
//! Turns video file names into something a catalog can be searched with.
//!
//! Two shapes come out of a file name: a movie query (cleaned title plus an
//! optional year) or an episode reference (show title, season, episode).
//! The episode shape always wins: a name that matches an episode pattern is
//! never treated as a movie.
//!
//! ## Quick Start
//!
//! ```
//! use cinedex_parser::{classify, clean_title, parse_episode, MediaGuess};
//!
//! let movie = clean_title("The.Matrix.1999.1080p.BluRay.x264.mkv");
//! assert_eq!(movie.title, "The Matrix");
//! assert_eq!(movie.year, Some(1999));
//!
//! let episode = parse_episode("Show.Name.S02E05.mkv").unwrap();
//! assert_eq!(episode.show_title, "Show Name");
//! assert_eq!((episode.season, episode.episode), (2, 5));
//!
//! assert!(matches!(classify("random_video.mp4"), MediaGuess::Movie(_)));
//! ```

mod episode;
mod title;

pub use cinedex_common::paths::is_video_file;
pub use episode::{parse_episode, ParsedEpisode};
pub use title::{clean_title, CleanedTitle};

/// What a file name looks like before any catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaGuess {
    /// The name matched an episode pattern.
    Episode(ParsedEpisode),
    /// Anything else is searched for as a movie.
    Movie(CleanedTitle),
}

/// Classify a file name as an episode or a movie.
///
/// Episode patterns take priority; everything else is a movie query.
pub fn classify(filename: &str) -> MediaGuess {
    match parse_episode(filename) {
        Some(episode) => MediaGuess::Episode(episode),
        None => MediaGuess::Movie(clean_title(filename)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_takes_priority() {
        match classify("Dark.2017.S01E01.1080p.mkv") {
            MediaGuess::Episode(ep) => {
                assert_eq!(ep.show_title, "Dark");
                assert_eq!(ep.year, Some(2017));
                assert_eq!(ep.season, 1);
                assert_eq!(ep.episode, 1);
            }
            other => panic!("expected episode, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_name_is_movie() {
        assert_eq!(
            classify("random_video.mp4"),
            MediaGuess::Movie(CleanedTitle {
                title: "random video".to_string(),
                year: None,
            })
        );
    }
}
