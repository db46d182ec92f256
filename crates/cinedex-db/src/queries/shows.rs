//! Show, season and episode queries.

use std::collections::BTreeMap;

use cinedex_common::{Result, ShowId};
use rusqlite::{named_params, Connection};

use crate::db_err;
use crate::models::{Episode, ExternalRating, FileOwner, Season, Show};

use super::{parse_string_list, video_files};

/// Insert or update a show and rewrite its seasons, episodes and files.
pub fn upsert_show(conn: &Connection, show: &Show) -> Result<()> {
    let genres = serde_json::to_string(&show.genres)?;
    let show_id = show.id.get() as i64;

    conn.execute(
        "INSERT INTO shows
            (id, title, original_title, first_air_year, overview, poster_path, backdrop_path,
             logo_path, rating, status, genres, imdb_id, external_rating, external_votes)
         VALUES (:id, :title, :original_title, :first_air_year, :overview, :poster_path,
                 :backdrop_path, :logo_path, :rating, :status, :genres, :imdb_id,
                 :external_rating, :external_votes)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            original_title = excluded.original_title,
            first_air_year = excluded.first_air_year,
            overview = excluded.overview,
            poster_path = excluded.poster_path,
            backdrop_path = excluded.backdrop_path,
            logo_path = excluded.logo_path,
            rating = excluded.rating,
            status = excluded.status,
            genres = excluded.genres,
            imdb_id = excluded.imdb_id,
            external_rating = excluded.external_rating,
            external_votes = excluded.external_votes,
            updated_at = datetime('now')",
        named_params! {
            ":id": show_id,
            ":title": show.title,
            ":original_title": show.original_title,
            ":first_air_year": show.first_air_year,
            ":overview": show.overview,
            ":poster_path": show.poster_path,
            ":backdrop_path": show.backdrop_path,
            ":logo_path": show.logo_path,
            ":rating": show.rating,
            ":status": show.status,
            ":genres": genres,
            ":imdb_id": show.imdb_id,
            ":external_rating": show.external_rating.map(|r| r.rating),
            ":external_votes": show.external_rating.map(|r| r.votes),
        },
    )
    .map_err(db_err)?;

    video_files::delete_show_files(conn, show.id)?;
    conn.execute("DELETE FROM episodes WHERE show_id = ?", [show_id])
        .map_err(db_err)?;
    conn.execute("DELETE FROM seasons WHERE show_id = ?", [show_id])
        .map_err(db_err)?;

    for season in show.seasons.values() {
        conn.execute(
            "INSERT INTO seasons (show_id, season_number, name, overview, poster_path)
             VALUES (:show_id, :number, :name, :overview, :poster_path)",
            named_params! {
                ":show_id": show_id,
                ":number": season.number,
                ":name": season.name,
                ":overview": season.overview,
                ":poster_path": season.poster_path,
            },
        )
        .map_err(db_err)?;

        for episode in season.episodes.values() {
            conn.execute(
                "INSERT INTO episodes
                    (show_id, season_number, episode_number, name, overview, still_path, air_date)
                 VALUES (:show_id, :season, :number, :name, :overview, :still_path, :air_date)",
                named_params! {
                    ":show_id": show_id,
                    ":season": season.number,
                    ":number": episode.number,
                    ":name": episode.name,
                    ":overview": episode.overview,
                    ":still_path": episode.still_path,
                    ":air_date": episode.air_date,
                },
            )
            .map_err(db_err)?;

            let owner = FileOwner::Episode {
                show_id: show.id,
                season: season.number,
                episode: episode.number,
            };
            for file in &episode.files {
                video_files::insert_file(conn, file, owner)?;
            }
        }
    }

    Ok(())
}

/// List all shows with their seasons and episodes, without files.
pub fn list_shows(conn: &Connection) -> Result<Vec<Show>> {
    let mut shows = load_show_rows(conn)?;

    let mut stmt = conn
        .prepare(
            "SELECT show_id, season_number, name, overview, poster_path
             FROM seasons ORDER BY show_id, season_number",
        )
        .map_err(db_err)?;
    let seasons = stmt
        .query_map([], |row| {
            Ok((
                ShowId::new(row.get::<_, i64>(0)? as u64),
                Season {
                    number: row.get(1)?,
                    name: row.get(2)?,
                    overview: row.get(3)?,
                    poster_path: row.get(4)?,
                    episodes: BTreeMap::new(),
                },
            ))
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    for (show_id, season) in seasons {
        if let Some(show) = shows.get_mut(&show_id) {
            show.seasons.insert(season.number, season);
        }
    }

    let mut stmt = conn
        .prepare(
            "SELECT show_id, season_number, episode_number, name, overview, still_path, air_date
             FROM episodes ORDER BY show_id, season_number, episode_number",
        )
        .map_err(db_err)?;
    let episodes = stmt
        .query_map([], |row| {
            Ok((
                ShowId::new(row.get::<_, i64>(0)? as u64),
                row.get::<_, u32>(1)?,
                Episode {
                    number: row.get(2)?,
                    name: row.get(3)?,
                    overview: row.get(4)?,
                    still_path: row.get(5)?,
                    air_date: row.get(6)?,
                    files: Vec::new(),
                },
            ))
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    for (show_id, season, episode) in episodes {
        if let Some(show) = shows.get_mut(&show_id) {
            show.season_mut(season)
                .episodes
                .insert(episode.number, episode);
        }
    }

    Ok(shows.into_values().collect())
}

fn load_show_rows(conn: &Connection) -> Result<BTreeMap<ShowId, Show>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, original_title, first_air_year, overview, poster_path,
                    backdrop_path, logo_path, rating, status, genres, imdb_id,
                    external_rating, external_votes
             FROM shows",
        )
        .map_err(db_err)?;

    let shows = stmt
        .query_map([], |row| {
            let external_rating: Option<f64> = row.get(12)?;
            let external_votes: Option<u32> = row.get(13)?;
            Ok(Show {
                id: ShowId::new(row.get::<_, i64>(0)? as u64),
                title: row.get(1)?,
                original_title: row.get(2)?,
                first_air_year: row.get(3)?,
                overview: row.get(4)?,
                poster_path: row.get(5)?,
                backdrop_path: row.get(6)?,
                logo_path: row.get(7)?,
                rating: row.get(8)?,
                status: row.get(9)?,
                genres: parse_string_list(&row.get::<_, String>(10)?),
                imdb_id: row.get(11)?,
                external_rating: external_rating.zip(external_votes).map(|(rating, votes)| {
                    ExternalRating { rating, votes }
                }),
                seasons: BTreeMap::new(),
            })
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(shows.into_iter().map(|s| (s.id, s)).collect())
}

/// Delete empty episodes, then seasons without episodes, then shows without
/// seasons.
///
/// Returns the number of shows deleted.
pub fn delete_empty_shows(conn: &Connection) -> Result<usize> {
    conn.execute(
        "DELETE FROM episodes
         WHERE NOT EXISTS (
            SELECT 1 FROM video_files f
            WHERE f.show_id = episodes.show_id
              AND f.season_number = episodes.season_number
              AND f.episode_number = episodes.episode_number)",
        [],
    )
    .map_err(db_err)?;

    conn.execute(
        "DELETE FROM seasons
         WHERE NOT EXISTS (
            SELECT 1 FROM episodes e
            WHERE e.show_id = seasons.show_id AND e.season_number = seasons.season_number)",
        [],
    )
    .map_err(db_err)?;

    conn.execute(
        "DELETE FROM shows
         WHERE NOT EXISTS (SELECT 1 FROM seasons s WHERE s.show_id = shows.id)",
        [],
    )
    .map_err(db_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoFile;
    use crate::pool::{get_conn, init_memory_pool};
    use cinedex_common::SourceId;

    fn show_with_episodes(id: u64, episodes: &[(u32, u32, Option<&str>)]) -> Show {
        let mut show = Show {
            id: ShowId::new(id),
            title: format!("Show {id}"),
            ..Default::default()
        };
        for (season, number, path) in episodes {
            let mut episode = Episode::placeholder(*number);
            if let Some(path) = path {
                episode
                    .files
                    .push(VideoFile::new(SourceId::new("nas"), *path, *path));
            }
            show.season_mut(*season).episodes.insert(*number, episode);
        }
        show
    }

    #[test]
    fn test_upsert_and_list_roundtrip() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let show = show_with_episodes(
            1399,
            &[(1, 1, Some("/tv/s1e1.mkv")), (1, 2, None), (2, 1, Some("/tv/s2e1.mkv"))],
        );
        upsert_show(&conn, &show).unwrap();

        let shows = list_shows(&conn).unwrap();
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].seasons.len(), 2);
        assert_eq!(shows[0].seasons[&1].episodes.len(), 2);
        assert!(shows[0].episode(2, 1).is_some());
    }

    #[test]
    fn test_delete_empty_shows_cascades() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        upsert_show(
            &conn,
            &show_with_episodes(1, &[(1, 1, Some("/tv/a.mkv")), (1, 2, None), (2, 1, None)]),
        )
        .unwrap();
        upsert_show(&conn, &show_with_episodes(2, &[(1, 1, None)])).unwrap();

        assert_eq!(delete_empty_shows(&conn).unwrap(), 1);

        let shows = list_shows(&conn).unwrap();
        assert_eq!(shows.len(), 1);
        let show = &shows[0];
        assert_eq!(show.id, ShowId::new(1));
        assert_eq!(show.seasons.len(), 1);
        assert_eq!(show.seasons[&1].episodes.len(), 1);
    }

    #[test]
    fn test_resave_replaces_structure() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        upsert_show(&conn, &show_with_episodes(5, &[(1, 1, Some("/tv/a.mkv"))])).unwrap();
        upsert_show(&conn, &show_with_episodes(5, &[(3, 4, Some("/tv/b.mkv"))])).unwrap();

        let shows = list_shows(&conn).unwrap();
        assert_eq!(shows[0].seasons.keys().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(video_files::list_files(&conn).unwrap().len(), 1);
    }
}
