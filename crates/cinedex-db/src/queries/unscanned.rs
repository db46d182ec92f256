//! Queries for files that could not be matched to a catalog entity.

use cinedex_common::Result;
use rusqlite::{named_params, Connection};

use crate::db_err;
use crate::models::VideoFile;

use super::video_files::file_from_row;

/// Replace the whole unscanned list with `files`.
pub fn replace_unscanned(conn: &Connection, files: &[VideoFile]) -> Result<()> {
    clear_unscanned(conn)?;
    for file in files {
        conn.execute(
            "INSERT OR REPLACE INTO unscanned_files (id, source_id, file_path, name, resolved_url)
             VALUES (:id, :source_id, :file_path, :name, :resolved_url)",
            named_params! {
                ":id": file.id.to_string(),
                ":source_id": file.source_id.as_str(),
                ":file_path": file.file_path,
                ":name": file.name,
                ":resolved_url": file.resolved_url,
            },
        )
        .map_err(db_err)?;
    }
    Ok(())
}

/// Remove every unscanned file.
pub fn clear_unscanned(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM unscanned_files", [])
        .map_err(db_err)
}

/// List unscanned files ordered by path.
pub fn list_unscanned(conn: &Connection) -> Result<Vec<VideoFile>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, source_id, file_path, name, resolved_url, 0
             FROM unscanned_files ORDER BY source_id, file_path",
        )
        .map_err(db_err)?;

    let files = stmt
        .query_map([], file_from_row)
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(files)
}
