//! Ratings imported from the IMDb `title.ratings.tsv.gz` dataset.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use cinedex_db::models::ExternalRating;
use cinedex_db::pool::{get_conn, DbPool};
use cinedex_db::queries::ratings;
use flate2::read::GzDecoder;
use tracing::{debug, info};

use super::{RatingsProgress, RatingsStage, RatingsStore};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// [`RatingsStore`] backed by the `ratings` table, filled from a gzipped TSV
/// dataset with `tconst`, `averageRating` and `numVotes` columns.
pub struct DatasetRatingsStore {
    client: reqwest::Client,
    dataset_url: String,
    pool: DbPool,
}

impl DatasetRatingsStore {
    pub fn new(dataset_url: String, pool: DbPool) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            dataset_url,
            pool,
        })
    }

    async fn download(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = self
            .client
            .get(&self.dataset_url)
            .send()
            .await
            .with_context(|| format!("ratings download failed: {}", self.dataset_url))?
            .error_for_status()
            .with_context(|| format!("ratings download returned error: {}", self.dataset_url))?
            .bytes()
            .await
            .context("failed to read ratings dataset")?;
        Ok(bytes.to_vec())
    }
}

/// Decompress the dataset and keep the rows whose id is in `ids`.
fn parse_dataset<R: Read>(
    reader: R,
    ids: &HashSet<String>,
) -> anyhow::Result<Vec<(String, ExternalRating)>> {
    let reader = BufReader::new(GzDecoder::new(reader));
    let mut found = Vec::new();

    for line in reader.lines() {
        let line = line.context("failed to read ratings dataset")?;
        let mut columns = line.split('\t');
        let (Some(id), Some(rating), Some(votes)) = (columns.next(), columns.next(), columns.next())
        else {
            continue;
        };
        if !ids.contains(id) {
            continue;
        }
        // The header row and malformed rows fail to parse and are skipped
        let (Ok(rating), Ok(votes)) = (rating.parse::<f64>(), votes.parse::<u32>()) else {
            continue;
        };
        found.push((id.to_string(), ExternalRating { rating, votes }));
    }

    Ok(found)
}

#[async_trait]
impl RatingsStore for DatasetRatingsStore {
    fn lookup(&self, imdb_id: &str) -> anyhow::Result<Option<ExternalRating>> {
        let conn = get_conn(&self.pool)?;
        Ok(ratings::get_rating(&conn, imdb_id)?)
    }

    async fn bulk_refresh(
        &self,
        ids: &HashSet<String>,
        on_progress: Option<&RatingsProgress<'_>>,
    ) -> anyhow::Result<usize> {
        let report = |stage: RatingsStage| {
            if let Some(on_progress) = on_progress {
                on_progress(stage);
            }
        };

        if ids.is_empty() {
            report(RatingsStage::Done);
            return Ok(0);
        }

        report(RatingsStage::Downloading);
        let data = self.download().await?;
        debug!(bytes = data.len(), "Downloaded ratings dataset");

        report(RatingsStage::Importing);
        let requested = ids.len();
        let ids = ids.clone();
        let pool = self.pool.clone();
        let stored = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let rows = parse_dataset(data.as_slice(), &ids)?;
            let conn = get_conn(&pool)?;
            Ok(ratings::upsert_ratings(&conn, &rows)?)
        })
        .await
        .context("ratings import task panicked")??;

        info!(requested, stored, "Imported external ratings");
        report(RatingsStage::Done);
        Ok(stored)
    }
}
