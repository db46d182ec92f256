//! Video file queries.
//!
//! Files are stored with their owner (a movie or an episode). Writes use
//! `INSERT OR REPLACE` so that saving an entity takes a file over from any
//! previous owner, keeping each file attached to exactly one entity.

use cinedex_common::{MovieId, Result, ShowId, SourceId, VideoFileId};
use rusqlite::{named_params, Connection, Row};

use crate::db_err;
use crate::models::{FileOwner, VideoFile};

use super::parse_uuid;

/// Replace every file of a movie with `files`.
pub fn replace_movie_files(conn: &Connection, movie_id: MovieId, files: &[VideoFile]) -> Result<()> {
    conn.execute(
        "DELETE FROM video_files WHERE movie_id = ?",
        [movie_id.get() as i64],
    )
    .map_err(db_err)?;

    for file in files {
        insert_file(conn, file, FileOwner::Movie(movie_id))?;
    }
    Ok(())
}

/// Remove every file attached to episodes of a show.
pub fn delete_show_files(conn: &Connection, show_id: ShowId) -> Result<()> {
    conn.execute(
        "DELETE FROM video_files WHERE show_id = ?",
        [show_id.get() as i64],
    )
    .map_err(db_err)?;
    Ok(())
}

/// Insert a file for `owner`, taking it over from any previous owner.
pub fn insert_file(conn: &Connection, file: &VideoFile, owner: FileOwner) -> Result<()> {
    let (movie_id, show_id, season, episode) = match owner {
        FileOwner::Movie(id) => (Some(id.get() as i64), None, None, None),
        FileOwner::Episode {
            show_id,
            season,
            episode,
        } => (None, Some(show_id.get() as i64), Some(season), Some(episode)),
    };

    conn.execute(
        "INSERT OR REPLACE INTO video_files
            (id, source_id, file_path, name, resolved_url, manually_matched,
             movie_id, show_id, season_number, episode_number)
         VALUES (:id, :source_id, :file_path, :name, :resolved_url, :manually_matched,
                 :movie_id, :show_id, :season, :episode)",
        named_params! {
            ":id": file.id.to_string(),
            ":source_id": file.source_id.as_str(),
            ":file_path": file.file_path,
            ":name": file.name,
            ":resolved_url": file.resolved_url,
            ":manually_matched": file.manually_matched,
            ":movie_id": movie_id,
            ":show_id": show_id,
            ":season": season,
            ":episode": episode,
        },
    )
    .map_err(db_err)?;
    Ok(())
}

/// List every attached file together with its owner.
pub fn list_files(conn: &Connection) -> Result<Vec<(FileOwner, VideoFile)>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, source_id, file_path, name, resolved_url, manually_matched,
                    movie_id, show_id, season_number, episode_number
             FROM video_files
             ORDER BY file_path",
        )
        .map_err(db_err)?;

    let files = stmt
        .query_map([], |row| {
            let file = file_from_row(row)?;
            let owner = match row.get::<_, Option<i64>>(6)? {
                Some(movie_id) => FileOwner::Movie(MovieId::new(movie_id as u64)),
                None => FileOwner::Episode {
                    show_id: ShowId::new(row.get::<_, i64>(7)? as u64),
                    season: row.get(8)?,
                    episode: row.get(9)?,
                },
            };
            Ok((owner, file))
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(files)
}

/// Map the first six columns `(id, source_id, file_path, name, resolved_url,
/// manually_matched)` of a row to a [`VideoFile`].
pub(crate) fn file_from_row(row: &Row<'_>) -> rusqlite::Result<VideoFile> {
    let id: String = row.get(0)?;
    Ok(VideoFile {
        id: VideoFileId::from(parse_uuid(0, &id)?),
        source_id: SourceId::new(row.get::<_, String>(1)?),
        file_path: row.get(2)?,
        name: row.get(3)?,
        resolved_url: row.get(4)?,
        manually_matched: row.get(5)?,
    })
}
