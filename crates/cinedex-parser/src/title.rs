//! Title cleaning for movie-style file names.

use std::sync::LazyLock;

use regex::Regex;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[._\-]").unwrap());

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}").unwrap());

static STRAY_BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\[\](){}]").unwrap());

static RELEASE_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:2160p|1440p|1080p|1080i|720p|576p|480p|4k|uhd|hdr|hdr10|10bit|8bit|x264|x265|h264|h265|hevc|avc|xvid|divx|bluray|bdrip|brrip|web ?dl|web ?rip|hdtv|hdrip|dvdrip|dvd|remux|proper|repack|aac|ac3|eac3|dts|truehd|atmos|ddp?[257]|flac|mp3)\b",
    )
    .unwrap()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// A movie query extracted from a file name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanedTitle {
    /// Human-readable title; may be empty when nothing usable remains.
    pub title: String,
    /// Release year, when one could be found after the first word.
    pub year: Option<u16>,
}

/// Clean a file name into a searchable title and optional year.
///
/// The extension is removed, `.`, `-` and `_` become spaces, the first
/// `19xx`/`20xx` token that does not start the name becomes the year and
/// everything from it onwards is dropped. Release tags (resolution, codec,
/// audio format) and bracketed groups are removed.
///
/// ```
/// use cinedex_parser::clean_title;
///
/// let cleaned = clean_title("2001.A.Space.Odyssey.1968.mkv");
/// assert_eq!(cleaned.title, "2001 A Space Odyssey");
/// assert_eq!(cleaned.year, Some(1968));
/// ```
pub fn clean_title(filename: &str) -> CleanedTitle {
    let name = cinedex_common::paths::file_name(filename);
    normalize(strip_extension(name))
}

/// Clean an already extension-less fragment such as the title part of an
/// episode name.
pub(crate) fn normalize(raw: &str) -> CleanedTitle {
    let spaced = SEPARATORS.replace_all(raw, " ");

    let year_match = YEAR
        .captures_iter(&spaced)
        .filter_map(|caps| caps.get(1))
        .find(|m| m.start() > 0);

    let (head, year) = match year_match {
        Some(m) => (&spaced[..m.start()], m.as_str().parse::<u16>().ok()),
        None => (&spaced[..], None),
    };

    let without_groups = BRACKETED.replace_all(head, " ");

    // Everything after the first release tag is release noise (group names
    // and the like); a tag at the very start is just removed.
    let truncated = match RELEASE_TAGS.find(&without_groups) {
        Some(m) if !without_groups[..m.start()].trim().is_empty() => {
            &without_groups[..m.start()]
        }
        _ => &without_groups[..],
    };

    let without_tags = RELEASE_TAGS.replace_all(truncated, " ");
    let without_brackets = STRAY_BRACKETS.replace_all(&without_tags, " ");
    let title = WHITESPACE
        .replace_all(&without_brackets, " ")
        .trim()
        .to_string();

    CleanedTitle { title, year }
}

/// Drop a trailing `.ext` when it looks like a file extension.
fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_release_name() {
        let cleaned = clean_title("The.Matrix.1999.1080p.BluRay.x264.mkv");
        assert_eq!(cleaned.title, "The Matrix");
        assert_eq!(cleaned.year, Some(1999));
    }

    #[test]
    fn test_year_at_start_is_part_of_title() {
        let cleaned = clean_title("1917.2019.2160p.mkv");
        assert_eq!(cleaned.title, "1917");
        assert_eq!(cleaned.year, Some(2019));
    }

    #[test]
    fn test_parenthesized_year() {
        let cleaned = clean_title("Heat (1995).mkv");
        assert_eq!(cleaned.title, "Heat");
        assert_eq!(cleaned.year, Some(1995));
    }

    #[test]
    fn test_tags_without_year() {
        let cleaned = clean_title("Inception.1080p.BluRay.x264-SPARKS.mkv");
        assert_eq!(cleaned.title, "Inception");
        assert_eq!(cleaned.year, None);
    }

    #[test]
    fn test_tags_case_insensitive() {
        let cleaned = clean_title("Arrival 720P WEBRIP.mp4");
        assert_eq!(cleaned.title, "Arrival");
    }

    #[test]
    fn test_bracketed_groups_removed() {
        let cleaned = clean_title("[Group] Spirited Away [Remastered].mkv");
        assert_eq!(cleaned.title, "Spirited Away");
        assert_eq!(cleaned.year, None);
    }

    #[test]
    fn test_underscores_and_dashes() {
        let cleaned = clean_title("random_video.mp4");
        assert_eq!(cleaned.title, "random video");

        let cleaned = clean_title("No-Country-For-Old-Men-2007.avi");
        assert_eq!(cleaned.title, "No Country For Old Men");
        assert_eq!(cleaned.year, Some(2007));
    }

    #[test]
    fn test_directory_components_ignored() {
        let cleaned = clean_title("/movies/2019/Parasite.2019.mkv");
        assert_eq!(cleaned.title, "Parasite");
        assert_eq!(cleaned.year, Some(2019));
    }

    #[test]
    fn test_total_on_degenerate_input() {
        assert_eq!(clean_title(""), CleanedTitle::default());
        assert_eq!(clean_title(".mkv").title, "mkv");
        assert_eq!(clean_title("1080p.mkv").title, "");
    }

    #[test]
    fn test_four_digit_resolution_is_not_a_year() {
        let cleaned = clean_title("Dune.2160p.mkv");
        assert_eq!(cleaned.title, "Dune");
        assert_eq!(cleaned.year, None);
    }
}
