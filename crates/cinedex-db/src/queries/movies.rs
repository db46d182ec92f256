//! Movie queries.

use cinedex_common::{MovieId, Result};
use rusqlite::{named_params, Connection};

use crate::db_err;
use crate::models::{ExternalRating, Movie};

use super::{parse_string_list, video_files};

/// Insert or update a movie row and replace its files.
pub fn upsert_movie(conn: &Connection, movie: &Movie) -> Result<()> {
    let genres = serde_json::to_string(&movie.genres)?;

    conn.execute(
        "INSERT INTO movies
            (id, title, original_title, year, overview, poster_path, backdrop_path,
             logo_path, rating, status, runtime_minutes, genres, imdb_id,
             external_rating, external_votes)
         VALUES (:id, :title, :original_title, :year, :overview, :poster_path, :backdrop_path,
                 :logo_path, :rating, :status, :runtime_minutes, :genres, :imdb_id,
                 :external_rating, :external_votes)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            original_title = excluded.original_title,
            year = excluded.year,
            overview = excluded.overview,
            poster_path = excluded.poster_path,
            backdrop_path = excluded.backdrop_path,
            logo_path = excluded.logo_path,
            rating = excluded.rating,
            status = excluded.status,
            runtime_minutes = excluded.runtime_minutes,
            genres = excluded.genres,
            imdb_id = excluded.imdb_id,
            external_rating = excluded.external_rating,
            external_votes = excluded.external_votes,
            updated_at = datetime('now')",
        named_params! {
            ":id": movie.id.get() as i64,
            ":title": movie.title,
            ":original_title": movie.original_title,
            ":year": movie.year,
            ":overview": movie.overview,
            ":poster_path": movie.poster_path,
            ":backdrop_path": movie.backdrop_path,
            ":logo_path": movie.logo_path,
            ":rating": movie.rating,
            ":status": movie.status,
            ":runtime_minutes": movie.runtime_minutes,
            ":genres": genres,
            ":imdb_id": movie.imdb_id,
            ":external_rating": movie.external_rating.map(|r| r.rating),
            ":external_votes": movie.external_rating.map(|r| r.votes),
        },
    )
    .map_err(db_err)?;

    video_files::replace_movie_files(conn, movie.id, &movie.files)
}

/// List all movies, without their files.
pub fn list_movies(conn: &Connection) -> Result<Vec<Movie>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, original_title, year, overview, poster_path, backdrop_path,
                    logo_path, rating, status, runtime_minutes, genres, imdb_id,
                    external_rating, external_votes
             FROM movies ORDER BY title",
        )
        .map_err(db_err)?;

    let movies = stmt
        .query_map([], |row| {
            let external_rating: Option<f64> = row.get(13)?;
            let external_votes: Option<u32> = row.get(14)?;
            Ok(Movie {
                id: MovieId::new(row.get::<_, i64>(0)? as u64),
                title: row.get(1)?,
                original_title: row.get(2)?,
                year: row.get(3)?,
                overview: row.get(4)?,
                poster_path: row.get(5)?,
                backdrop_path: row.get(6)?,
                logo_path: row.get(7)?,
                rating: row.get(8)?,
                status: row.get(9)?,
                runtime_minutes: row.get(10)?,
                genres: parse_string_list(&row.get::<_, String>(11)?),
                imdb_id: row.get(12)?,
                external_rating: external_rating.zip(external_votes).map(|(rating, votes)| {
                    ExternalRating { rating, votes }
                }),
                files: Vec::new(),
            })
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(movies)
}

/// Delete every movie that has no video file left.
///
/// Returns the number of movies deleted.
pub fn delete_empty_movies(conn: &Connection) -> Result<usize> {
    conn.execute(
        "DELETE FROM movies
         WHERE NOT EXISTS (SELECT 1 FROM video_files f WHERE f.movie_id = movies.id)",
        [],
    )
    .map_err(db_err)
}
