use crate::errors::{Error, Result};
use crate::metrics::STORE_FAILURES_TOTAL;
use crate::model::{Actuators, Analysis, Hardware, HardwareDoc, Reading, Sensors};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::info;

pub async fn make_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to store...");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(store_err)?;

    info!("Store connection established");
    Ok(pool)
}

fn store_err(err: sqlx::Error) -> Error {
    STORE_FAILURES_TOTAL.inc();
    Error::Store(err)
}

/// Row shape of the `readings` collection; document sections live in
/// nullable JSONB columns.
#[derive(sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    ts: DateTime<Utc>,
    sensors: Option<Json<Sensors>>,
    actuators: Option<Json<Actuators>>,
    analysis: Option<Json<Analysis>>,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Reading {
            id: row.id,
            timestamp: row.ts,
            sensors: row.sensors.map(|j| j.0),
            actuators: row.actuators.map(|j| j.0),
            analysis: row.analysis.map(|j| j.0),
        }
    }
}

#[derive(sqlx::FromRow)]
struct HardwareRow {
    id: i64,
    doc: Json<HardwareDoc>,
}

/// Read-only adapter over the two store collections. The dashboard never
/// inserts, mutates or migrates; readings are appended by the external
/// ingestion side.
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The reading with the maximum timestamp, or `None` on an empty store.
    pub async fn latest(&self) -> Result<Option<Reading>> {
        let row = sqlx::query_as::<_, ReadingRow>(
            "SELECT id, ts, sensors, actuators, analysis FROM readings \
             ORDER BY ts DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(Reading::from))
    }

    /// One page of most-recent-first readings plus the total count. Pages
    /// beyond the end come back empty, not as an error.
    pub async fn page(&self, page: u32, per_page: u32) -> Result<(Vec<Reading>, i64)> {
        let skip = (page.saturating_sub(1) as i64) * per_page as i64;
        let total = self.count().await?;

        let rows = sqlx::query_as::<_, ReadingRow>(
            "SELECT id, ts, sensors, actuators, analysis FROM readings \
             ORDER BY ts DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(per_page as i64)
        .bind(skip)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok((rows.into_iter().map(Reading::from).collect(), total))
    }

    /// All readings with `start <= ts <= end`, both ends inclusive. Order is
    /// unspecified; the aggregator reduces regardless.
    pub async fn range_by_time(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            "SELECT id, ts, sensors, actuators, analysis FROM readings \
             WHERE ts >= $1 AND ts <= $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(rows.into_iter().map(Reading::from).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM readings")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)
    }

    /// The full hardware collection; small and static, so no pagination.
    pub async fn hardwares(&self) -> Result<Vec<Hardware>> {
        let rows = sqlx::query_as::<_, HardwareRow>("SELECT id, doc FROM hardwares ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|row| Hardware {
                id: row.id,
                doc: row.doc.0,
            })
            .collect())
    }
}
