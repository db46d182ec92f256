//! Episode detection for TV-style file names.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::title::normalize;

/// `Show.Name.S02E05`
static SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<title>.+?)[ ._\-]+s(?P<season>\d{1,3})[ ._\-]?e(?P<episode>\d{1,4})")
        .unwrap()
});

/// `Show Name 2x05`
static CROSS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<title>.+?)[ ._\-]+(?P<season>\d{1,2})x(?P<episode>\d{1,3})\b").unwrap()
});

/// An episode reference extracted from a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEpisode {
    /// Cleaned show title.
    pub show_title: String,
    /// Year found in the title part, if any.
    pub year: Option<u16>,
    pub season: u32,
    pub episode: u32,
}

/// Parse an episode reference out of a file name.
///
/// Recognises `<title> S<season>E<episode>` and `<title> <season>x<episode>`
/// with `.`, `_`, `-` or space separators, case-insensitively. The first
/// pattern that matches wins.
///
/// ```
/// use cinedex_parser::parse_episode;
///
/// let ep = parse_episode("Show Name 2x05.avi").unwrap();
/// assert_eq!(ep.show_title, "Show Name");
/// assert_eq!((ep.season, ep.episode), (2, 5));
///
/// assert!(parse_episode("random_video.mp4").is_none());
/// ```
pub fn parse_episode(filename: &str) -> Option<ParsedEpisode> {
    let name = cinedex_common::paths::file_name(filename);
    [&*SEASON_EPISODE, &*CROSS]
        .into_iter()
        .find_map(|pattern| pattern.captures(name).and_then(|caps| from_captures(&caps)))
}

fn from_captures(caps: &Captures<'_>) -> Option<ParsedEpisode> {
    let season = caps.name("season")?.as_str().parse().ok()?;
    let episode = caps.name("episode")?.as_str().parse().ok()?;
    let cleaned = normalize(caps.name("title")?.as_str());
    if cleaned.title.is_empty() {
        return None;
    }

    Some(ParsedEpisode {
        show_title: cleaned.title,
        year: cleaned.year,
        season,
        episode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sxxexx() {
        let ep = parse_episode("Show.Name.S02E05.mkv").unwrap();
        assert_eq!(ep.show_title, "Show Name");
        assert_eq!(ep.season, 2);
        assert_eq!(ep.episode, 5);
        assert_eq!(ep.year, None);
    }

    #[test]
    fn test_cross_notation() {
        let ep = parse_episode("Show Name 2x05.avi").unwrap();
        assert_eq!(ep.show_title, "Show Name");
        assert_eq!(ep.season, 2);
        assert_eq!(ep.episode, 5);
    }

    #[test]
    fn test_lowercase_and_underscores() {
        let ep = parse_episode("the_office_s03e12_720p.mkv").unwrap();
        assert_eq!(ep.show_title, "the office");
        assert_eq!((ep.season, ep.episode), (3, 12));
    }

    #[test]
    fn test_separator_between_season_and_episode() {
        let ep = parse_episode("Lost - S01 E04 - Walkabout.mkv").unwrap();
        assert_eq!(ep.show_title, "Lost");
        assert_eq!((ep.season, ep.episode), (1, 4));
    }

    #[test]
    fn test_year_in_show_title() {
        let ep = parse_episode("Doctor.Who.2005.S01E01.Rose.mkv").unwrap();
        assert_eq!(ep.show_title, "Doctor Who");
        assert_eq!(ep.year, Some(2005));
    }

    #[test]
    fn test_no_match() {
        assert!(parse_episode("random_video.mp4").is_none());
        assert!(parse_episode("The.Matrix.1999.1080p.mkv").is_none());
        assert!(parse_episode("Movie.1920x1080.mkv").is_none());
    }

    #[test]
    fn test_requires_title() {
        assert!(parse_episode("S01E01.mkv").is_none());
    }

    #[test]
    fn test_full_path() {
        let ep = parse_episode("/tv/Show Name/Season 1/Show.Name.S01E03.mkv").unwrap();
        assert_eq!(ep.show_title, "Show Name");
        assert_eq!(ep.episode, 3);
    }
}
