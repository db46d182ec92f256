//! Queries for the imported external ratings table.

use cinedex_common::Result;
use rusqlite::{named_params, Connection, OptionalExtension};

use crate::db_err;
use crate::models::ExternalRating;

/// Insert or update the rating for `imdb_id`.
pub fn upsert_rating(conn: &Connection, imdb_id: &str, rating: ExternalRating) -> Result<()> {
    conn.execute(
        "INSERT INTO ratings (imdb_id, rating, votes)
         VALUES (:imdb_id, :rating, :votes)
         ON CONFLICT(imdb_id) DO UPDATE SET
            rating = excluded.rating,
            votes = excluded.votes,
            updated_at = datetime('now')",
        named_params! {
            ":imdb_id": imdb_id,
            ":rating": rating.rating,
            ":votes": rating.votes,
        },
    )
    .map_err(db_err)?;
    Ok(())
}

/// Insert or update many ratings in one transaction.
pub fn upsert_ratings(conn: &Connection, ratings: &[(String, ExternalRating)]) -> Result<usize> {
    let tx = conn.unchecked_transaction().map_err(db_err)?;
    for (imdb_id, rating) in ratings {
        upsert_rating(&tx, imdb_id, *rating)?;
    }
    tx.commit().map_err(db_err)?;
    Ok(ratings.len())
}

/// Look up the rating for `imdb_id`.
pub fn get_rating(conn: &Connection, imdb_id: &str) -> Result<Option<ExternalRating>> {
    conn.query_row(
        "SELECT rating, votes FROM ratings WHERE imdb_id = ?",
        [imdb_id],
        |row| {
            Ok(ExternalRating {
                rating: row.get(0)?,
                votes: row.get(1)?,
            })
        },
    )
    .optional()
    .map_err(db_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};

    #[test]
    fn test_upsert_and_get() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        assert!(get_rating(&conn, "tt0133093").unwrap().is_none());

        upsert_ratings(
            &conn,
            &[(
                "tt0133093".to_string(),
                ExternalRating {
                    rating: 8.7,
                    votes: 100,
                },
            )],
        )
        .unwrap();
        upsert_rating(
            &conn,
            "tt0133093",
            ExternalRating {
                rating: 8.8,
                votes: 120,
            },
        )
        .unwrap();

        let rating = get_rating(&conn, "tt0133093").unwrap().unwrap();
        assert_eq!(rating.votes, 120);
        assert!((rating.rating - 8.8).abs() < f64::EPSILON);
    }
}
